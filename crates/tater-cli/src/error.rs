//! Error handling for the Tater CLI.
//!
//! Bundle failures keep their [`tater_core::Error`] so the diagnostic code and
//! help text survive into the rendered report; everything else is a
//! [`CliError`] variant with a hint in its message.

use miette::Report;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The bundle run failed
    #[error(transparent)]
    Bundle(#[from] tater_core::Error),
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `--config` points at a missing file
    #[error("Config file not found: {}\n\nHint: Check the path passed with --config", .0.display())]
    NotFound(PathBuf),

    /// The merged configuration does not fit the expected shape
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },
}

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Convert a CLI error into a report for rendering.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Bundle(e) => Report::new(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
    }
}
