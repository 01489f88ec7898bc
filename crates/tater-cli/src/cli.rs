//! Command-line interface definition.
//!
//! `tater` has a single job, so there are no subcommands: every flag
//! configures one bundle run.

use clap::Parser;
use std::path::PathBuf;

/// Tater - bundle HTML pages into single self-contained documents
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tater",
    version,
    about = "Bundle HTML pages into single self-contained documents",
    long_about = "Tater inlines every stylesheet and script an HTML page references,\n\
                  replaces CSS class names with short generated tokens across markup,\n\
                  styles and scripts, renames referenced assets to content-hash prefixes\n\
                  and substitutes #lang#KEY# placeholders from a localization file."
)]
pub struct Cli {
    /// Directory holding the HTML entry points
    #[arg(long, value_name = "DIR", visible_alias = "in", alias = "from")]
    pub src: PathBuf,

    /// Output directory; mirrors the entry point file names
    #[arg(long, value_name = "DIR", visible_alias = "out", alias = "to")]
    pub dst: PathBuf,

    /// Delete an existing destination directory before writing
    #[arg(long)]
    pub force_delete_dst: bool,

    /// Flat JSON object used to replace #lang#KEY# placeholders
    #[arg(long, value_name = "FILE")]
    pub lang: Option<PathBuf>,

    /// Directory under the destination that receives renamed assets
    #[arg(long, value_name = "DIR")]
    pub assets_dir: Option<PathBuf>,

    /// Only rewrite CSS_* class constants in scripts loaded from this file
    #[arg(long, value_name = "NAME", value_parser = parse_file_name)]
    pub js_class_file: Option<String>,

    /// Inline the rewritten CSS and JS without minifying them
    #[arg(long)]
    pub no_minify: bool,

    /// JSON configuration file, layered under environment and flags
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// A bare file name such as `classes.js`.
pub fn parse_file_name(value: &str) -> Result<String, String> {
    if value.is_empty() {
        return Err("file name cannot be empty".to_string());
    }
    if value.contains(['/', '\\']) {
        return Err(format!(
            "'{}' must be a file name, not a path (e.g. 'classes.js')",
            value
        ));
    }
    Ok(value.to_string())
}
