//! rmake-lib: Core types and logic for rmake
//!
//! This crate provides everything behind the `rmake` binary:
//! - `makefile`: the build description model (targets, commands, pattern rules)
//! - `parse`: the makefile text format parser
//! - `execute`: the concurrent dependency-resolving execution engine

pub mod execute;
pub mod makefile;
pub mod parse;

pub use execute::{ExecuteConfig, ExecuteError, ExecuteReport, execute};
pub use makefile::{Command, Makefile, Pattern, Target};
pub use parse::{ParseError, parse, parse_file};
