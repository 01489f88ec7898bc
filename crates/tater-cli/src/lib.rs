//! Tater CLI - bundle a directory of HTML pages into single-file documents.
//!
//! This crate is the command-line front end of [`tater_core`]. It parses
//! arguments, layers configuration from a JSON file and the environment,
//! sets up logging and reports the outcome of a run.
//!
//! - [`cli`] - Argument definitions
//! - [`config`] - Layered configuration loading
//! - [`commands`] - The bundle command
//! - [`error`] - Error types and diagnostic rendering
//! - [`logger`] - `tracing` subscriber setup
//! - [`ui`] - Status messages and the run summary

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, ConfigError, Result};
