//! Command-line entry point: config loading, serve, offline availability
//!
//! This crate provides the `caldave` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use config::FileConfig;
pub use error::{CliError, CliResult};
