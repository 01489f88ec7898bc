//! Formatting utilities for sizes, durations and the run summary.

use console::Term;
use owo_colors::OwoColorize;
use std::time::Duration;
use tater_core::BundleReport;

/// Format a size in bytes with the most appropriate unit.
///
/// ```
/// use tater_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;
    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Format a duration as `ms`, seconds or `Xm Ys`.
///
/// ```
/// use std::time::Duration;
/// use tater_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print one line per written document plus totals to stderr.
pub fn print_summary(report: &BundleReport, duration: Duration) {
    let width = (Term::stderr().size().1 as usize).clamp(40, 80);
    let colored = console::colors_enabled_stderr();

    if colored {
        eprintln!("\n{}", "Bundle Summary".bold().underline());
    } else {
        eprintln!("\nBundle Summary");
    }
    eprintln!("{}", "─".repeat(width));

    for entry in &report.entries {
        let name = entry
            .output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.output.display().to_string());
        let sizes = format!(
            "css {:>10}  js {:>10}",
            format_size(entry.css_bytes as u64),
            format_size(entry.js_bytes as u64)
        );
        if colored {
            eprintln!("  {:<30} {}", name.cyan(), sizes.dimmed());
        } else {
            eprintln!("  {:<30} {}", name, sizes);
        }
    }

    eprintln!("{}", "─".repeat(width));
    eprintln!(
        "  {} entry points, {} assets copied in {}",
        report.entries.len(),
        report.assets_copied,
        format_duration(duration)
    );
}
