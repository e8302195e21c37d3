//! Harness Lifecycle Tests
//!
//! Teardown semantics against the process-wide registry: every handle
//! stopped exactly once, the watch-mode skip and its overrides, and the
//! setup re-entry guard. The registry is process-global, so these tests
//! serialize on a lock.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use testdock::harness::{setup, SetupOptions};
use testdock::registry;
use testdock::{teardown_all, Result, Stoppable, TeardownOptions, TestdockError};

static REGISTRY_LOCK: Mutex<()> = Mutex::new(());

struct CountingHandle {
    stops: Arc<AtomicUsize>,
}

#[async_trait]
impl Stoppable for CountingHandle {
    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingHandle;

#[async_trait]
impl Stoppable for FailingHandle {
    async fn stop(&self) -> Result<()> {
        Err(TestdockError::teardown("container refused to stop"))
    }
}

fn register_counting_handles(count: usize) -> Vec<Arc<AtomicUsize>> {
    let counters: Vec<Arc<AtomicUsize>> = (0..count)
        .map(|_| Arc::new(AtomicUsize::new(0)))
        .collect();
    registry::register_all(counters.iter().map(|stops| {
        Box::new(CountingHandle {
            stops: stops.clone(),
        }) as Box<dyn Stoppable>
    }));
    counters
}

#[tokio::test]
async fn teardown_stops_every_registered_handle_exactly_once() {
    let _guard = REGISTRY_LOCK.lock();
    let _ = registry::drain();

    let counters = register_counting_handles(5);

    teardown_all(&TeardownOptions::default())
        .await
        .expect("teardown should succeed");

    for counter in &counters {
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
    assert!(registry::is_empty());
}

#[tokio::test]
async fn teardown_is_skipped_in_watch_mode() {
    let _guard = REGISTRY_LOCK.lock();
    let _ = registry::drain();

    let counters = register_counting_handles(5);

    teardown_all(&TeardownOptions {
        watch: true,
        force: false,
    })
    .await
    .expect("skip is not an error");

    for counter in &counters {
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
    // handles survive for the next watch iteration
    assert_eq!(registry::len(), 5);
    let _ = registry::drain();
}

#[tokio::test]
async fn force_overrides_the_watch_mode_skip() {
    let _guard = REGISTRY_LOCK.lock();
    let _ = registry::drain();

    let counters = register_counting_handles(3);

    teardown_all(&TeardownOptions {
        watch: true,
        force: true,
    })
    .await
    .expect("forced teardown should succeed");

    for counter in &counters {
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
    assert!(registry::is_empty());
}

#[tokio::test]
async fn teardown_on_watch_env_sets_force() {
    let _guard = REGISTRY_LOCK.lock();

    std::env::set_var("TESTDOCK_TEARDOWN_ON_WATCH", "1");
    std::env::set_var("TESTDOCK_WATCH", "1");
    let options = TeardownOptions::from_env();
    std::env::remove_var("TESTDOCK_TEARDOWN_ON_WATCH");
    std::env::remove_var("TESTDOCK_WATCH");

    assert_eq!(
        options,
        TeardownOptions {
            watch: true,
            force: true,
        }
    );
}

#[tokio::test]
async fn one_failing_stop_fails_teardown_but_stops_the_rest() {
    let _guard = REGISTRY_LOCK.lock();
    let _ = registry::drain();

    let counters = register_counting_handles(2);
    registry::register_all([Box::new(FailingHandle) as Box<dyn Stoppable>]);

    let err = teardown_all(&TeardownOptions::default())
        .await
        .expect_err("failing handle must surface");
    assert!(matches!(err, TestdockError::Teardown { .. }));

    for counter in &counters {
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn setup_reenters_as_noop_in_watch_mode() {
    let _guard = REGISTRY_LOCK.lock();
    let _ = registry::drain();

    // a previous watch iteration left a live handle behind
    let counters = register_counting_handles(1);

    // no config file exists here, so setup would fail if it tried to
    // provision again
    setup(&SetupOptions { watch: true })
        .await
        .expect("watch re-entry must not reprovision");

    assert_eq!(counters[0].load(Ordering::SeqCst), 0);
    assert_eq!(registry::len(), 1);
    let _ = registry::drain();
}

#[tokio::test]
async fn setup_without_config_file_fails_with_path_context() {
    let _guard = REGISTRY_LOCK.lock();
    let _ = registry::drain();

    std::env::set_var("TESTDOCK_CONFIG_PATH", "/definitely/not/here.json");
    let err = setup(&SetupOptions::default()).await.unwrap_err();
    std::env::remove_var("TESTDOCK_CONFIG_PATH");

    assert!(matches!(err, TestdockError::Configuration { .. }));
    assert!(err.to_string().contains("/definitely/not/here.json"));
}
