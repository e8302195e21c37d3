//! # Live Handle Registry
//!
//! Process-wide list of live container handles bridging the otherwise
//! stateless setup/teardown boundary. Single writer (the publisher, once
//! per run), single reader (teardown, which drains). Handles are keyed by
//! insertion order only, never by label.

use parking_lot::Mutex;
use std::sync::OnceLock;

use crate::containers::Stoppable;

static HANDLES: OnceLock<Mutex<Vec<Box<dyn Stoppable>>>> = OnceLock::new();

fn handles() -> &'static Mutex<Vec<Box<dyn Stoppable>>> {
    HANDLES.get_or_init(|| Mutex::new(Vec::new()))
}

/// Append handles to the registry, preserving order.
pub fn register_all(new_handles: impl IntoIterator<Item = Box<dyn Stoppable>>) {
    handles().lock().extend(new_handles);
}

/// Take every registered handle out of the registry.
pub fn drain() -> Vec<Box<dyn Stoppable>> {
    std::mem::take(&mut *handles().lock())
}

/// Number of currently registered handles.
pub fn len() -> usize {
    handles().lock().len()
}

/// Whether no handle is registered.
pub fn is_empty() -> bool {
    handles().lock().is_empty()
}
