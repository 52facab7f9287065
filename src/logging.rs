//! # Structured Logging Module
//!
//! Environment-aware structured logging for debugging asynchronous task
//! delivery. Console output honors `RUST_LOG`; setting `RELAY_LOG_FORMAT=json`
//! switches to JSON lines for log shippers.

use std::env;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let json_output = env::var("RELAY_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let init_result = if json_output {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_ansi(false)
                        .json(),
                )
                .try_init()
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true).with_level(true))
                .try_init()
        };

        // A global subscriber may already be set by the embedding application.
        // This is not an error - continue with the existing subscriber.
        if init_result.is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing");
        }
    });
}
