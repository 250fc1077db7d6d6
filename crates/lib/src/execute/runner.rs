//! Command execution.
//!
//! Commands are split on whitespace and run directly, without a shell. The
//! child inherits stdin/stdout/stderr, so command output passes through
//! unmodified. Unless marked silent, the command text is echoed to stdout
//! before the process starts.

use std::io::{self, Write};

use tokio::process;
use tracing::debug;

use crate::execute::types::ExecuteError;
use crate::makefile::Command;

/// Run a single command to completion.
///
/// A command whose text splits into no tokens is a successful no-op. A spawn
/// failure and a non-zero exit status are distinct errors, both naming the
/// command.
pub async fn run_command(command: &Command) -> Result<(), ExecuteError> {
  let mut parts = command.text.split_whitespace();
  let Some(program) = parts.next() else {
    return Ok(());
  };

  if !command.silent {
    // A closed stdout (e.g. piped into a pager that exited) must not abort
    // the build, so the echo result is ignored.
    let mut stdout = io::stdout();
    let _ = writeln!(stdout, "{}", command.text);
  }

  debug!(cmd = %command.text, "spawning command");

  let status = process::Command::new(program)
    .args(parts)
    .status()
    .await
    .map_err(|source| ExecuteError::CommandSpawn {
      cmd: command.text.clone(),
      source,
    })?;

  if !status.success() {
    return Err(ExecuteError::CommandFailed {
      cmd: command.text.clone(),
      code: status.code(),
    });
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn cmd(text: impl Into<String>) -> Command {
    Command {
      text: text.into(),
      silent: false,
    }
  }

  #[tokio::test]
  async fn empty_command_is_a_noop() {
    run_command(&cmd("")).await.unwrap();
    run_command(&cmd("   ")).await.unwrap();
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn successful_command_creates_file() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("marker");

    run_command(&cmd(format!("/usr/bin/touch {}", marker.display())))
      .await
      .unwrap();

    assert!(marker.exists());
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn nonzero_exit_reports_code() {
    let result = run_command(&cmd("/bin/false")).await;

    assert!(matches!(
      result,
      Err(ExecuteError::CommandFailed { code: Some(1), .. })
    ));
  }

  #[tokio::test]
  async fn missing_program_is_spawn_error() {
    let result = run_command(&cmd("/nonexistent/program --flag")).await;

    match result {
      Err(ExecuteError::CommandSpawn { cmd, .. }) => {
        assert!(cmd.contains("/nonexistent/program"));
      }
      other => panic!("expected CommandSpawn, got {other:?}"),
    }
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn silent_command_still_runs() {
    let temp = TempDir::new().unwrap();
    let marker = temp.path().join("quiet");

    let command = Command {
      text: format!("/usr/bin/touch {}", marker.display()),
      silent: true,
    };
    run_command(&command).await.unwrap();

    assert!(marker.exists());
  }
}
