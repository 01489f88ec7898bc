//! # tater-core
//!
//! Bundles a directory of HTML entry points into single-file documents.
//!
//! Every stylesheet and script an entry point references is inlined, CSS
//! class names are replaced by short generated tokens consistently across
//! markup, stylesheets and scripts, referenced images and fonts are renamed to
//! content-hash prefixes, and `#lang#KEY#` placeholders are localized.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tater_core::{BundleConfig, Bundler};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BundleConfig::new("./site", "./dist").assets_dir("static");
//! let report = Bundler::new(config).bundle().await?;
//! for entry in &report.entries {
//!     println!("{} ({} bytes css)", entry.output.display(), entry.css_bytes);
//! }
//! # Ok(()) }
//! ```

pub mod asset_map;
pub mod bundler;
pub mod class_map;
pub mod config;
pub mod context;
pub mod css;
pub mod extract;
pub mod html;
pub mod js_rewrite;
pub mod localize;
pub mod runtime;
pub mod toolchain;

pub use asset_map::{AssetRecord, AssetRenameTable};
pub use bundler::{BundleReport, Bundler, EntryReport};
pub use class_map::{ClassSubstitutionTable, UsageKind};
pub use config::{BundleConfig, ConfigError, JsClassScope};
pub use context::RewriteContext;
pub use localize::Localizer;
pub use runtime::{CachedRuntime, NativeRuntime, Runtime, RuntimeError};
pub use toolchain::{
    CompileDiagnostics, CssMinifier, JsCompiler, LightningMinifier, OxcCompiler, Passthrough,
};

/// Error types for tater-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration, reported before any bundling starts.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A script or stylesheet points outside the source tree.
    #[error("Unsupported reference in <{tag} {attribute}>: {url}")]
    UnsupportedReference {
        tag: String,
        attribute: String,
        url: String,
    },

    /// Localization placeholders without a dictionary entry.
    #[error("Missing localization keys: {}", .keys.join(", "))]
    MissingLocalization { keys: Vec<String> },

    /// The JS compiler or CSS minifier rejected its input.
    #[error("{tool} failed: {diagnostics}")]
    Compile {
        tool: &'static str,
        diagnostics: CompileDiagnostics,
    },

    /// A stylesheet could not be parsed or printed.
    #[error("Failed to parse CSS in {source_name}: {message}")]
    CssParse {
        source_name: String,
        message: String,
    },

    /// Filesystem access failed.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tater-core operations.
pub type Result<T> = std::result::Result<T, Error>;

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Config(_) => "INVALID_CONFIG",
            Error::UnsupportedReference { .. } => "UNSUPPORTED_REFERENCE",
            Error::MissingLocalization { .. } => "MISSING_LOCALIZATION",
            Error::Compile { .. } => "COMPILE_FAILED",
            Error::CssParse { .. } => "CSS_PARSE_ERROR",
            Error::Runtime(_) => "FILESYSTEM_ERROR",
            Error::Io(_) => "IO_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Config(err) => Some(Box::new(err.hint())),
            Error::UnsupportedReference { url, .. } => Some(Box::new(format!(
                "Only files inside the source directory can be inlined.\nDownload '{}' into the source tree and reference it by relative path.",
                url
            ))),
            Error::MissingLocalization { keys } => Some(Box::new(format!(
                "Add {} to the localization file passed with --lang.",
                if keys.len() == 1 { "this key" } else { "these keys" }
            ))),
            Error::Compile { tool, .. } => Some(Box::new(format!(
                "Fix the reported {} errors in the inlined sources.",
                tool
            ))),
            Error::CssParse { source_name, .. } => Some(Box::new(format!(
                "Check '{}' for syntax errors.",
                source_name
            ))),
            Error::Runtime(_) | Error::Io(_) => Some(Box::new(
                "Check that the path exists and that you have permission to access it.",
            )),
        }
    }
}
