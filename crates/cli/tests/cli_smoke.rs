//! CLI smoke tests for rmake.
//!
//! These tests run the binary against small makefiles in temp directories
//! and verify exit codes, echo behavior, and diagnostics.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the rmake binary.
fn rmake_cmd() -> Command {
  cargo_bin_cmd!("rmake")
}

/// Create a temp directory with a Makefile.
fn temp_makefile(content: &str) -> TempDir {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("Makefile"), content).unwrap();
  temp
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  rmake_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  rmake_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("rmake"));
}

// =============================================================================
// Building
// =============================================================================

#[test]
#[cfg(unix)]
fn builds_default_target_from_cwd_makefile() {
  let temp = temp_makefile("all:\n\t/usr/bin/touch built\n");

  rmake_cmd()
    .current_dir(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("Targets executed: 1"));

  assert!(temp.path().join("built").exists());
}

#[test]
#[cfg(unix)]
fn builds_named_target() {
  let temp = temp_makefile("all:\n\t/bin/false\nother:\n\t/usr/bin/touch other-built\n");

  rmake_cmd().current_dir(temp.path()).arg("other").assert().success();

  assert!(temp.path().join("other-built").exists());
}

#[test]
#[cfg(unix)]
fn file_flag_selects_makefile() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("build.mk"), "all:\n\t/usr/bin/touch from-mk\n").unwrap();

  rmake_cmd()
    .current_dir(temp.path())
    .args(["-f", "build.mk"])
    .assert()
    .success();

  assert!(temp.path().join("from-mk").exists());
}

#[test]
#[cfg(unix)]
fn jobs_flag_is_accepted() {
  let temp = temp_makefile("all: a b\na:\n\t/usr/bin/touch a-done\nb:\n\t/usr/bin/touch b-done\n");

  rmake_cmd()
    .current_dir(temp.path())
    .args(["--jobs", "1"])
    .assert()
    .success();

  assert!(temp.path().join("a-done").exists());
  assert!(temp.path().join("b-done").exists());
}

// =============================================================================
// Echo
// =============================================================================

#[test]
#[cfg(unix)]
fn commands_are_echoed() {
  let temp = temp_makefile("all:\n\t/usr/bin/touch loud\n");

  rmake_cmd()
    .current_dir(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("/usr/bin/touch loud"));
}

#[test]
#[cfg(unix)]
fn silent_commands_are_not_echoed() {
  let temp = temp_makefile("all:\n\t@/usr/bin/touch quiet\n");

  rmake_cmd()
    .current_dir(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("touch").not());

  assert!(temp.path().join("quiet").exists());
}

// =============================================================================
// Error Handling
// =============================================================================

#[test]
fn missing_makefile_fails() {
  let temp = TempDir::new().unwrap();

  rmake_cmd()
    .current_dir(temp.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn unknown_target_fails() {
  let temp = temp_makefile("all:\n");

  rmake_cmd()
    .current_dir(temp.path())
    .arg("nonexistent")
    .assert()
    .failure()
    .stderr(predicate::str::contains("no rule to make target 'nonexistent'"));
}

#[test]
#[cfg(unix)]
fn failing_command_sets_exit_code() {
  let temp = temp_makefile("all:\n\t/bin/false\n");

  rmake_cmd()
    .current_dir(temp.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("/bin/false"));
}

#[test]
fn dependency_cycle_fails() {
  let temp = temp_makefile("a: b\nb: a\n");

  rmake_cmd()
    .current_dir(temp.path())
    .arg("a")
    .assert()
    .failure()
    .stderr(predicate::str::contains("circular dependency"));
}

#[test]
fn parse_error_reports_line_number() {
  let temp = temp_makefile("all:\n\techo ok\nnot a rule\n");

  rmake_cmd()
    .current_dir(temp.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("line 3"));
}
