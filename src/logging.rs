//! # Structured Logging
//!
//! Once-per-process tracing initialization. The filter comes from the
//! `TESTDOCK_LOG` environment variable and falls back to `info`.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "TESTDOCK_LOG";

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging for the harness.
///
/// Safe to call from every lifecycle hook; only the first call has an
/// effect. If the host process already installed a global subscriber the
/// existing one is kept.
pub fn init() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level()));

        let subscriber = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_filter(filter));

        // try_init to avoid a panic when the test runner already set one
        if subscriber.try_init().is_err() {
            tracing::debug!("global tracing subscriber already initialized");
        }
    });
}

fn default_level() -> &'static str {
    "info"
}
