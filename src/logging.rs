//! Logging setup for the provider.
//!
//! Logs go to **stderr** through a `tracing` subscriber filtered by
//! `RUST_LOG`. When `RUST_LOG` is not set the level follows the provider's
//! `debug` setting.
//!
//! ```bash
//! # Trace every suppression decision
//! RUST_LOG=kibana_provider=debug terraform plan
//!
//! # Only warnings and errors
//! RUST_LOG=warn terraform apply
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::ProviderConfig;

/// Default level for the provider's `debug` setting.
pub fn level_for(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn try_init_with(default_level: &str) -> bool {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}

/// Initialize logging at `info` unless `RUST_LOG` says otherwise.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default(level_for(false));
}

/// Initialize logging with a custom default level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    assert!(
        try_init_with(default_level),
        "a global tracing subscriber is already set"
    );
}

/// Try to initialize logging, returning false if already initialized.
pub fn try_init_logging() -> bool {
    try_init_with(level_for(false))
}

/// Try to initialize logging at the level the provider block asks for.
pub fn try_init_for_config(config: &ProviderConfig) -> bool {
    try_init_with(level_for(config.debug))
}

#[cfg(test)]
mod tests {
    // The global subscriber can only be set once per process, so
    // initialization itself is exercised only through try_init.

    use super::*;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(true), "debug");
        assert_eq!(level_for(false), "info");
    }

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new(level_for(true)).is_ok());
        assert!(EnvFilter::try_new("kibana_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,kibana_provider=debug").is_ok());
    }

    #[test]
    fn test_try_init_is_idempotent() {
        try_init_logging();
        assert!(!try_init_logging());
    }
}
