//! Terminal output: status messages and the run summary.
//!
//! ```no_run
//! use tater_cli::ui;
//!
//! ui::init_colors(false);
//! ui::info("Bundling site -> dist");
//! ui::success("Bundled 2 entry points");
//! ```

mod format;
mod messages;

pub use format::{format_duration, format_size, print_summary};
pub use messages::{error, info, success, warning};

/// Check if color output should be enabled.
///
/// Respects NO_COLOR and FORCE_COLOR, falls back to terminal detection.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    console::user_attended_stderr()
}

/// Initialize color support from `--no-color` and the environment.
///
/// owo-colors styles unconditionally, so color is switched off globally
/// through `console` and the message functions check it.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && should_use_color();
    console::set_colors_enabled(enabled);
    console::set_colors_enabled_stderr(enabled);
}
