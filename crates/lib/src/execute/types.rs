//! Types for target execution.
//!
//! This module defines the error type, the report returned by a successful
//! run, and the execution configuration.

use thiserror::Error;

/// Errors that can occur while executing a target graph.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// The name has no target, no matching pattern rule, and no file on disk.
  #[error("no rule to make target '{0}'")]
  TargetNotFound(String),

  /// The target depends on itself through the given resolution path.
  #[error("circular dependency detected for '{name}' ({path})")]
  CircularDependency { name: String, path: String },

  /// A dependency of this target failed.
  #[error("dependency '{name}' failed: {source}")]
  DependencyFailed {
    name: String,
    #[source]
    source: Box<ExecuteError>,
  },

  /// The target failed earlier in this run; reported to concurrent
  /// requesters that did not observe the original error.
  #[error("target '{0}' failed")]
  TargetFailed(String),

  /// A command exited with a non-zero status.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CommandFailed { cmd: String, code: Option<i32> },

  /// A command's process could not be spawned.
  #[error("failed to spawn '{cmd}': {source}")]
  CommandSpawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  /// A dependency task panicked or was cancelled.
  #[error("dependency task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

/// Configuration for target execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of commands to run in parallel.
  pub parallelism: usize,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}

/// Counters from a completed run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecuteReport {
  /// Targets whose rule was executed (artifact shortcuts are not counted).
  pub targets_executed: usize,

  /// Commands that ran to completion.
  pub commands_run: usize,
}
