//! Build description model.
//!
//! A `Makefile` is the parsed form of a build description: a set of named
//! targets, each with dependencies and shell commands, plus the variables
//! that were defined in the file. Targets whose name contains a single `%`
//! are pattern rules; they are matched against requested names that have no
//! explicit target, in definition order.

use std::collections::HashMap;

/// A single shell command attached to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
  /// The command text, after variable substitution.
  pub text: String,

  /// Whether the command was prefixed with `@` (do not echo before running).
  pub silent: bool,
}

/// The two literal halves around the `%` of a pattern rule's name.
///
/// `lib%.a` has prefix `lib` and suffix `.a`. The `%` matches any stem,
/// including the empty one, but prefix and suffix may not overlap in the
/// candidate name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
  pub prefix: String,
  pub suffix: String,
}

impl Pattern {
  /// Returns true if `name` starts with the prefix and ends with the suffix,
  /// with enough room for both.
  pub fn matches(&self, name: &str) -> bool {
    name.len() >= self.prefix.len() + self.suffix.len()
      && name.starts_with(&self.prefix)
      && name.ends_with(&self.suffix)
  }
}

/// A build target: a name, the targets it depends on, and the commands that
/// produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
  pub name: String,

  /// Names of targets that must complete before this one's commands run.
  pub dependencies: Vec<String>,

  /// Commands executed strictly in order once all dependencies are done.
  pub commands: Vec<Command>,

  /// Set when the name contains a `%`; such targets are matched, never
  /// requested directly by the names they satisfy.
  pub pattern: Option<Pattern>,
}

impl Target {
  pub fn new(name: impl Into<String>) -> Self {
    Target {
      name: name.into(),
      dependencies: Vec::new(),
      commands: Vec::new(),
      pattern: None,
    }
  }
}

/// A parsed build description.
#[derive(Debug, Clone, Default)]
pub struct Makefile {
  targets: HashMap<String, Target>,

  /// Names of pattern targets in definition order. Matching walks this list
  /// so "first matching rule" is deterministic.
  pattern_order: Vec<String>,

  /// Variables defined in the file. Substitution happens at parse time; this
  /// map is kept for introspection and tests.
  pub variables: HashMap<String, String>,
}

impl Makefile {
  pub fn new() -> Self {
    Self::default()
  }

  /// Look up an explicitly defined target by its exact name.
  pub fn get(&self, name: &str) -> Option<&Target> {
    self.targets.get(name)
  }

  /// Insert a target. A duplicate name replaces the earlier definition; a
  /// redefined pattern target keeps its original position in the match order.
  pub fn insert(&mut self, target: Target) {
    if target.pattern.is_some() && !self.pattern_order.contains(&target.name) {
      self.pattern_order.push(target.name.clone());
    }
    self.targets.insert(target.name.clone(), target);
  }

  /// Find the first pattern target (in definition order) whose pattern
  /// matches `name`. The mapping is recomputed on every call; only the
  /// matched target itself is memoized by the engine.
  pub fn match_pattern(&self, name: &str) -> Option<&Target> {
    for pattern_name in &self.pattern_order {
      let target = &self.targets[pattern_name];
      if let Some(pattern) = &target.pattern
        && pattern.matches(name)
      {
        return Some(target);
      }
    }
    None
  }

  /// Number of defined targets (explicit and pattern).
  pub fn len(&self) -> usize {
    self.targets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.targets.is_empty()
  }
}
