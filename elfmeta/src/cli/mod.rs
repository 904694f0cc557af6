//! Command-line interface for elfmeta
//!
//! This module contains CLI argument parsing and the command implementations

pub mod args;
pub mod commands;

pub use args::{Args, Command};
pub use commands::execute;
