//! Makefile text format parser.
//!
//! The format is line-oriented:
//! - `name: dep1 dep2` defines a target; a `%` in the name makes it a
//!   pattern rule (exactly one `%` allowed)
//! - lines starting with a TAB are commands for the most recent target;
//!   a leading `@` marks the command silent
//! - `NAME = value` defines a variable; `$(NAME)` and `${NAME}` in command
//!   lines are substituted at parse time, in definition order, and unknown
//!   or unterminated references are left verbatim
//! - blank lines and `#` comments are skipped
//!
//! A line containing both `:` and `=` is a target when the first `:` comes
//! first, so `install: PREFIX=/usr` is a target and `CC = gcc` a variable.
//! All errors carry the 1-based line number they were found on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::makefile::{Command, Makefile, Pattern, Target};

/// Errors produced while reading or parsing a makefile.
#[derive(Debug, Error)]
pub enum ParseError {
  /// The makefile could not be read.
  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A command line (TAB-indented) appeared before any target.
  #[error("line {line}: command before any target")]
  CommandOutsideTarget { line: usize },

  /// A pattern target name contained more than one `%`.
  #[error("line {line}: pattern target '{name}' must contain exactly one '%'")]
  InvalidPattern { line: usize, name: String },

  /// A line that is neither a target, a variable, a command, nor a comment.
  #[error("line {line}: expected a target, variable assignment, or command")]
  UnexpectedLine { line: usize },
}

/// Parse a makefile from a string.
pub fn parse(source: &str) -> Result<Makefile, ParseError> {
  let mut makefile = Makefile::new();
  let mut current: Option<Target> = None;

  for (idx, raw) in source.lines().enumerate() {
    let line = idx + 1;
    let trimmed = raw.trim();

    if trimmed.is_empty() || trimmed.starts_with('#') {
      continue;
    }

    if let Some(rest) = raw.strip_prefix('\t') {
      let Some(target) = current.as_mut() else {
        return Err(ParseError::CommandOutsideTarget { line });
      };
      target.commands.push(parse_command(rest, &makefile.variables));
      continue;
    }

    let colon = trimmed.find(':');
    let equals = trimmed.find('=');

    match (colon, equals) {
      (Some(c), e) if e.is_none_or(|e| c < e) => {
        if let Some(done) = current.take() {
          makefile.insert(done);
        }
        current = Some(parse_target(trimmed, c, line)?);
      }
      (_, Some(e)) => {
        let name = trimmed[..e].trim();
        if name.is_empty() {
          return Err(ParseError::UnexpectedLine { line });
        }
        let value = trimmed[e + 1..].trim();
        makefile.variables.insert(name.to_string(), value.to_string());
      }
      _ => return Err(ParseError::UnexpectedLine { line }),
    }
  }

  if let Some(done) = current.take() {
    makefile.insert(done);
  }

  Ok(makefile)
}

/// Parse a makefile from a file on disk.
pub fn parse_file(path: &Path) -> Result<Makefile, ParseError> {
  let source = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
    path: path.to_path_buf(),
    source,
  })?;
  parse(&source)
}

fn parse_target(trimmed: &str, colon: usize, line: usize) -> Result<Target, ParseError> {
  let name = trimmed[..colon].trim();
  if name.is_empty() {
    return Err(ParseError::UnexpectedLine { line });
  }

  let pattern = match name.matches('%').count() {
    0 => None,
    1 => {
      let percent = name.find('%').unwrap();
      Some(Pattern {
        prefix: name[..percent].to_string(),
        suffix: name[percent + 1..].to_string(),
      })
    }
    _ => {
      return Err(ParseError::InvalidPattern {
        line,
        name: name.to_string(),
      });
    }
  };

  Ok(Target {
    name: name.to_string(),
    dependencies: trimmed[colon + 1..].split_whitespace().map(str::to_string).collect(),
    commands: Vec::new(),
    pattern,
  })
}

fn parse_command(rest: &str, variables: &HashMap<String, String>) -> Command {
  let mut text = rest.trim();
  let silent = text.starts_with('@');
  if silent {
    text = text[1..].trim();
  }
  Command {
    text: substitute(text, variables),
    silent,
  }
}

/// Replace `$(NAME)` and `${NAME}` with the variable's value. Unknown
/// references and unterminated ones stay verbatim; a `$` not followed by
/// `(` or `{` is literal.
fn substitute(text: &str, variables: &HashMap<String, String>) -> String {
  let mut out = String::with_capacity(text.len());
  let mut rest = text;

  while let Some(dollar) = rest.find('$') {
    out.push_str(&rest[..dollar]);
    let after = &rest[dollar + 1..];

    let close = match after.chars().next() {
      Some('(') => ')',
      Some('{') => '}',
      _ => {
        out.push('$');
        rest = after;
        continue;
      }
    };

    let Some(end) = after[1..].find(close) else {
      // Unterminated reference, keep the rest of the line as-is.
      out.push_str(&rest[dollar..]);
      return out;
    };

    let name = &after[1..1 + end];
    match variables.get(name) {
      Some(value) => out.push_str(value),
      None => out.push_str(&rest[dollar..dollar + name.len() + 3]),
    }
    rest = &after[end + 2..];
  }

  out.push_str(rest);
  out
}
