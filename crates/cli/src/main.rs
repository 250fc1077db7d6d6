//! rmake: a concurrent make-style build runner.
//!
//! Reads a makefile, resolves the requested target through its dependency
//! graph, and runs each target's commands at most once, with independent
//! dependencies executed in parallel. There is no timestamp checking: a
//! ruleless name that exists on disk is simply considered done.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rmake_lib::execute::{ExecuteConfig, execute};
use rmake_lib::parse::parse_file;

#[derive(Parser)]
#[command(name = "rmake", version, about = "A concurrent make-style build runner")]
struct Cli {
  /// Target to build
  #[arg(default_value = "all")]
  target: String,

  /// Path to the makefile
  #[arg(short = 'f', long = "file", default_value = "Makefile")]
  file: PathBuf,

  /// Maximum number of commands run in parallel (defaults to the CPU count)
  #[arg(short = 'j', long = "jobs")]
  jobs: Option<usize>,
}

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();

  match run(&cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      eprintln!("{} {err:#}", "error:".red().bold());
      ExitCode::FAILURE
    }
  }
}

fn run(cli: &Cli) -> Result<()> {
  let makefile = parse_file(&cli.file)?;
  debug!(file = %cli.file.display(), targets = makefile.len(), "makefile parsed");

  let mut config = ExecuteConfig::default();
  if let Some(jobs) = cli.jobs {
    config.parallelism = jobs.max(1);
  }

  let rt = tokio::runtime::Runtime::new().context("failed to create async runtime")?;
  let report = rt.block_on(execute(makefile, &cli.target, &config))?;

  println!();
  println!("Build complete!");
  println!("  Targets executed: {}", report.targets_executed);
  println!("  Commands run: {}", report.commands_run);

  Ok(())
}
