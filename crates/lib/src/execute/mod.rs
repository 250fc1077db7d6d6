//! Target execution.
//!
//! This module executes a parsed `Makefile`: the requested target is
//! resolved through explicit targets, pattern rules, and files on disk, its
//! dependency graph is walked concurrently, and each target's commands run
//! strictly in order, at most once per run.

mod engine;
mod runner;
mod types;

pub use types::{ExecuteConfig, ExecuteError, ExecuteReport};

use crate::makefile::Makefile;

/// Execute `target` and everything it depends on.
///
/// Dependencies of a target run concurrently, bounded by
/// `config.parallelism` command processes. A target shared by several
/// dependents executes exactly once; later requesters wait for the first
/// execution instead of repeating it. Returns counters for the run, or the
/// first error encountered.
pub async fn execute(makefile: Makefile, target: &str, config: &ExecuteConfig) -> Result<ExecuteReport, ExecuteError> {
  let engine = engine::Engine::new(makefile, config);
  engine.run(target).await
}
