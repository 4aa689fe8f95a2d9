//! Subscriber setup for applications built on the SDK
//!
//! The library crates only emit `tracing` events; installing a subscriber is
//! left to the application, which can call [`init_tracing`] early in `main`.

use tracing_subscriber::{fmt, EnvFilter};

/// Fallback variable read when `RUST_LOG` is not set
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

const DEFAULT_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Install a `fmt` subscriber filtered by `RUST_LOG`, then `LOG_LEVEL`, then `info`
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing() -> Result<(), LoggingError> {
    let filter = create_env_filter(
        std::env::var("RUST_LOG").ok(),
        std::env::var(LOG_LEVEL_ENV).ok(),
    );

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| LoggingError::TracingInit(e.to_string()))
}

/// Check if a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

fn create_env_filter(rust_log: Option<String>, log_level: Option<String>) -> EnvFilter {
    let directives = rust_log
        .or(log_level)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}
