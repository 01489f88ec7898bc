//! Logging setup for the Tater CLI.
//!
//! The level is chosen in this order:
//! 1. `--verbose`: DEBUG for tater crates
//! 2. `--quiet`: ERROR only
//! 3. `RUST_LOG`: custom filter
//! 4. Default: INFO for tater crates
//!
//! ```rust,no_run
//! use tater_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("bundling");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "tater=debug,tater_core=debug,tater_cli=debug";
const QUIET_FILTER: &str = "tater=error,tater_core=error,tater_cli=error";
const DEFAULT_FILTER: &str = "tater=info,tater_core=info,tater_cli=info";

/// Filter for the given verbosity flags.
pub fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install the global subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Install the global subscriber with a custom filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    // The subscriber is global, so only filter construction is tested here.

    #[test]
    fn test_filters_parse() {
        assert!(filter_for(true, false).to_string().contains("tater_core=debug"));
        assert!(filter_for(false, true).to_string().contains("tater_core=error"));
    }
}
