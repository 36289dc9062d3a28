//! CLI Adapter
//!
//! Command-line interface for the shadowfolio binary.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{CliApp, Command, KeygenCmd, PlanCmd, RunCmd, StatusCmd};
