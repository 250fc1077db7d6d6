//! The dependency-resolving execution engine.
//!
//! Each requested name is resolved to a target identity (explicit target,
//! first matching pattern rule, or the name itself for a file on disk) and
//! admitted against a shared state map so every identity executes at most
//! once per run. Requesters that find the identity already in progress wait
//! on its completion channel; the in-progress state is never treated as a
//! cycle. True cycles are caught two ways: the chain of identities on the
//! current resolution path catches a target reaching itself through its own
//! dependencies, and a wait-for graph maintained under the state lock
//! catches a cycle whose halves are owned by different tasks (two sibling
//! branches each owning one side of `x -> y -> x` would otherwise wait on
//! each other forever).
//!
//! Parallelism is bounded by a semaphore around command processes only.
//! Admission and dependency waits hold no permit, so a parent blocked on its
//! dependencies can never starve them.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::execute::runner::run_command;
use crate::execute::types::{ExecuteConfig, ExecuteError, ExecuteReport};
use crate::makefile::{Makefile, Target};

/// Lifecycle of one target identity within a run.
enum TargetState {
  /// Owned by some task; the receiver wakes once the owner finishes.
  InProgress(watch::Receiver<()>),
  Done,
  Failed,
}

/// Shared run state, updated only under the engine's mutex.
#[derive(Default)]
struct EngineState {
  targets: HashMap<String, TargetState>,

  /// Active wait-for edges. When a task with resolution path `a -> b` blocks
  /// on in-progress identity `w`, both `a` and `b` are stuck until `w`
  /// completes, so edges `a -> w` and `b -> w` are recorded for as long as
  /// the wait lasts.
  waits: HashMap<String, Vec<String>>,
}

impl EngineState {
  /// Returns true if a wait on `awaited` by a task whose resolution path is
  /// `ancestors` would close a cycle in the wait-for graph: everything on
  /// the path is blocked until `awaited` completes, so `awaited` must not
  /// itself be stuck behind any identity on the path.
  fn wait_would_deadlock(&self, awaited: &str, ancestors: &[String]) -> bool {
    let mut stack = vec![awaited];
    let mut seen = HashSet::new();
    while let Some(current) = stack.pop() {
      if ancestors.iter().any(|a| a == current) {
        return true;
      }
      if !seen.insert(current) {
        continue;
      }
      if let Some(next) = self.waits.get(current) {
        stack.extend(next.iter().map(String::as_str));
      }
    }
    false
  }

  fn add_waits(&mut self, awaited: &str, ancestors: &[String]) {
    for ancestor in ancestors {
      self.waits.entry(ancestor.clone()).or_default().push(awaited.to_string());
    }
  }

  fn remove_waits(&mut self, awaited: &str, ancestors: &[String]) {
    for ancestor in ancestors {
      if let Some(edges) = self.waits.get_mut(ancestor) {
        if let Some(pos) = edges.iter().position(|e| e == awaited) {
          edges.swap_remove(pos);
        }
        if edges.is_empty() {
          self.waits.remove(ancestor);
        }
      }
    }
  }
}

pub(crate) struct Engine {
  makefile: Makefile,
  state: Mutex<EngineState>,
  permits: Arc<Semaphore>,
  targets_executed: AtomicUsize,
  commands_run: AtomicUsize,
}

impl Engine {
  pub(crate) fn new(makefile: Makefile, config: &ExecuteConfig) -> Arc<Self> {
    Arc::new(Engine {
      makefile,
      state: Mutex::new(EngineState::default()),
      permits: Arc::new(Semaphore::new(config.parallelism.max(1))),
      targets_executed: AtomicUsize::new(0),
      commands_run: AtomicUsize::new(0),
    })
  }

  pub(crate) async fn run(self: &Arc<Self>, target: &str) -> Result<ExecuteReport, ExecuteError> {
    self.execute_target(target.to_string(), Arc::new(Vec::new())).await?;
    Ok(ExecuteReport {
      targets_executed: self.targets_executed.load(Ordering::Relaxed),
      commands_run: self.commands_run.load(Ordering::Relaxed),
    })
  }

  /// Boxed recursion point; dependency tasks call back into this.
  fn execute_target(
    self: &Arc<Self>,
    name: String,
    ancestors: Arc<Vec<String>>,
  ) -> Pin<Box<dyn Future<Output = Result<(), ExecuteError>> + Send>> {
    let engine = Arc::clone(self);
    Box::pin(async move { engine.execute_inner(name, ancestors).await })
  }

  async fn execute_inner(self: Arc<Self>, name: String, ancestors: Arc<Vec<String>>) -> Result<(), ExecuteError> {
    // Resolve before admission so every literal matched by one pattern rule
    // shares that rule's memoization key. The literal-to-pattern mapping
    // itself is recomputed on each request.
    let target = match self.makefile.get(&name) {
      Some(t) => Some(t),
      None => {
        let matched = self.makefile.match_pattern(&name);
        if let Some(rule) = matched {
          debug!(target = %name, rule = %rule.name, "pattern rule matched");
        }
        matched
      }
    };
    let identity = target.map(|t| t.name.clone()).unwrap_or_else(|| name.clone());

    if ancestors.contains(&identity) {
      let path = format!("{} -> {}", ancestors.join(" -> "), identity);
      return Err(ExecuteError::CircularDependency { name: identity, path });
    }

    // Admission: exactly one requester becomes the owner and holds the
    // sender; everyone else waits on the receiver and re-checks the state.
    // Before blocking, the wait is checked against (and recorded in) the
    // wait-for graph so a cycle split across concurrent owners fails instead
    // of waiting forever.
    let sender = loop {
      let mut rx = {
        let mut state = self.state.lock().unwrap();
        match state.targets.get(&identity) {
          Some(TargetState::Done) => {
            debug!(target = %identity, "already done");
            return Ok(());
          }
          Some(TargetState::Failed) => return Err(ExecuteError::TargetFailed(identity)),
          Some(TargetState::InProgress(rx)) => {
            if state.wait_would_deadlock(&identity, &ancestors) {
              let path = format!("{} -> {}", ancestors.join(" -> "), identity);
              return Err(ExecuteError::CircularDependency { name: identity, path });
            }
            let rx = rx.clone();
            state.add_waits(&identity, &ancestors);
            rx
          }
          None => {
            let (tx, rx) = watch::channel(());
            state.targets.insert(identity.clone(), TargetState::InProgress(rx));
            break tx;
          }
        }
      };
      debug!(target = %identity, "waiting for in-progress target");
      // The owner drops its sender only after updating the state, so this
      // wakeup always observes done or failed on the next pass.
      let _ = rx.changed().await;
      self.state.lock().unwrap().remove_waits(&identity, &ancestors);
    };

    let result = match target {
      Some(target) => self.build_target(target, &identity, ancestors).await,
      None if Path::new(&name).exists() => {
        debug!(target = %name, "file exists on disk, nothing to do");
        Ok(())
      }
      None => Err(ExecuteError::TargetNotFound(name.clone())),
    };

    {
      let mut state = self.state.lock().unwrap();
      let done = if result.is_ok() { TargetState::Done } else { TargetState::Failed };
      state.targets.insert(identity.clone(), done);
    }
    drop(sender);

    if result.is_ok() {
      debug!(target = %identity, "target complete");
    }
    result
  }

  async fn build_target(
    self: &Arc<Self>,
    target: &Target,
    identity: &str,
    ancestors: Arc<Vec<String>>,
  ) -> Result<(), ExecuteError> {
    if !target.dependencies.is_empty() {
      let mut path = (*ancestors).clone();
      path.push(identity.to_string());
      let path = Arc::new(path);

      let mut deps = JoinSet::new();
      for dep in &target.dependencies {
        let engine = Arc::clone(self);
        let dep = dep.clone();
        let path = Arc::clone(&path);
        deps.spawn(async move {
          let result = engine.execute_target(dep.clone(), path).await;
          (dep, result)
        });
      }

      // Let every dependency run to completion, then report the first
      // failure observed. Siblings are not cancelled.
      let mut failed: Option<ExecuteError> = None;
      while let Some(joined) = deps.join_next().await {
        match joined {
          Ok((_, Ok(()))) => {}
          Ok((dep, Err(e))) => {
            if failed.is_none() {
              failed = Some(ExecuteError::DependencyFailed {
                name: dep,
                source: Box::new(e),
              });
            }
          }
          Err(e) => {
            if failed.is_none() {
              failed = Some(ExecuteError::Join(e));
            }
          }
        }
      }
      if let Some(e) = failed {
        return Err(e);
      }
    }

    if !target.commands.is_empty() {
      info!(target = %identity, commands = target.commands.len(), "executing target");
    }
    for command in &target.commands {
      let _permit = self.permits.acquire().await.unwrap();
      run_command(command).await?;
      self.commands_run.fetch_add(1, Ordering::Relaxed);
    }

    self.targets_executed.fetch_add(1, Ordering::Relaxed);
    Ok(())
  }
}
