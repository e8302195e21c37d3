//! # Harness Lifecycle Facade
//!
//! The two entry points a test driver wires into its suite lifecycle:
//! [`setup`] before the suite, [`teardown`] after it. Setup reads and
//! validates the configuration, starts everything, and publishes the
//! globals; teardown stops whatever setup registered.

use tracing::{debug, info};

use crate::config;
use crate::error::Result;
use crate::logging;
use crate::orchestration;
use crate::publisher;
use crate::registry;
use crate::teardown::{teardown_all, TeardownOptions, WATCH_ENV};

/// Controls setup behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetupOptions {
    /// The invoking test run is in watch mode: containers provisioned by
    /// an earlier iteration are kept and setup becomes a no-op.
    pub watch: bool,
}

impl SetupOptions {
    /// Derive options from the process environment (`TESTDOCK_WATCH`).
    pub fn from_env() -> Self {
        Self {
            watch: crate::teardown::env_flag(WATCH_ENV),
        }
    }
}

/// Provision every configured container and publish their coordinates.
///
/// Under watch mode with containers already registered this is a no-op,
/// so re-runs reuse the live containers.
pub async fn setup(options: &SetupOptions) -> Result<()> {
    logging::init();

    if options.watch && !registry::is_empty() {
        debug!(
            handles = registry::len(),
            "watch mode re-entry, reusing running containers"
        );
        return Ok(());
    }

    let config = config::read_config()?;
    let started = orchestration::start_all_containers(&config).await?;
    let globals = publisher::publish(started)?;

    info!(globals = globals.len(), "container harness ready");
    Ok(())
}

/// Setup with options derived from the environment.
pub async fn setup_from_env() -> Result<()> {
    setup(&SetupOptions::from_env()).await
}

/// Stop every container provisioned by [`setup`], honoring the
/// watch-mode skip and its override.
pub async fn teardown(options: &TeardownOptions) -> Result<()> {
    logging::init();
    teardown_all(options).await
}

/// Teardown with options derived from the environment.
pub async fn teardown_from_env() -> Result<()> {
    teardown(&TeardownOptions::from_env()).await
}
