//! Command-line interface
//!
//! Argument definitions for the `powledger` binary.

pub mod commands;

pub use commands::{Command, Opt};
