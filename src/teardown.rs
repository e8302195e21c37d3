//! # Teardown
//!
//! Stops every handle retained by the publisher, concurrently, waiting
//! for all to finish or any to fail. Under watch mode teardown is
//! skipped so containers survive the next iteration, unless explicitly
//! overridden.

use futures::future;
use std::env;
use tracing::{debug, info};

use crate::error::Result;
use crate::registry;

/// Environment variable signalling that the invoking run is in watch
/// mode (any non-empty value other than `0`/`false`).
pub const WATCH_ENV: &str = "TESTDOCK_WATCH";

/// Environment variable forcing teardown even under watch mode.
pub const TEARDOWN_ON_WATCH_ENV: &str = "TESTDOCK_TEARDOWN_ON_WATCH";

/// Controls whether teardown runs.
///
/// The harness historically both always skipped teardown under watch
/// mode and, in later revisions, respected an override. Both behaviors
/// are available: `watch` alone skips, while `force` (or the
/// `TESTDOCK_TEARDOWN_ON_WATCH` environment variable) tears down anyway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownOptions {
    /// The invoking test run is in watch mode.
    pub watch: bool,
    /// Tear down even under watch mode.
    pub force: bool,
}

impl TeardownOptions {
    /// Derive options from the process environment.
    pub fn from_env() -> Self {
        Self {
            watch: env_flag(WATCH_ENV),
            force: env_flag(TEARDOWN_ON_WATCH_ENV),
        }
    }

    fn should_skip(&self) -> bool {
        self.watch && !self.force
    }
}

/// Stop every registered handle.
///
/// A no-op under watch mode without an override; in that case the
/// registry keeps its handles for the next iteration. Any stop failure
/// fails the call; the remaining stops still run to completion first.
pub async fn teardown_all(options: &TeardownOptions) -> Result<()> {
    if options.should_skip() {
        debug!(
            handles = registry::len(),
            "watch mode active, skipping container teardown"
        );
        return Ok(());
    }

    let handles = registry::drain();
    if handles.is_empty() {
        debug!("no containers registered, nothing to tear down");
        return Ok(());
    }

    let count = handles.len();
    let stops = handles.iter().map(|handle| handle.stop());
    let results = future::join_all(stops).await;

    info!(containers = count, "containers stopped");

    results.into_iter().collect()
}

pub(crate) fn env_flag(name: &str) -> bool {
    match env::var(name) {
        Ok(value) => !value.is_empty() && value != "0" && value.to_lowercase() != "false",
        Err(_) => false,
    }
}
