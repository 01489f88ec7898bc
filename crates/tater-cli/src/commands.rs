//! The bundle command.

use crate::cli::Cli;
use crate::config::TaterConfig;
use crate::error::Result;
use crate::ui;
use std::time::Instant;
use tater_core::{BundleReport, Bundler};

/// Load configuration, run the bundle and report the outcome.
///
/// # Errors
///
/// Returns errors for invalid configuration and for any failure during the
/// run; nothing is reported as success unless every entry point was written.
pub async fn execute(args: &Cli) -> Result<BundleReport> {
    let start_time = Instant::now();

    let config = TaterConfig::load(args)?;
    tracing::debug!(?config, "loaded configuration");
    ui::info(&format!(
        "Bundling {} -> {}",
        config.src.display(),
        config.dst.display()
    ));

    let report = Bundler::new(config.to_bundle_config()).bundle().await?;

    for class in &report.orphan_classes {
        ui::warning(&format!(
            "Class '{}' is styled but never used in markup or scripts",
            class
        ));
    }
    for constant in &report.unused_js_constants {
        ui::warning(&format!("Class constant {} is never used", constant));
    }

    let duration = start_time.elapsed();
    if !args.quiet {
        ui::print_summary(&report, duration);
    }
    ui::success(&format!(
        "Bundled {} entry point{} in {}",
        report.entries.len(),
        if report.entries.len() == 1 { "" } else { "s" },
        ui::format_duration(duration)
    ));
    Ok(report)
}
