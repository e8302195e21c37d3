//! # Global Publisher
//!
//! Serializes orchestration metadata into flat key/value globals named
//! `__TESTCONTAINERS_{LABEL}_{FIELD}__`, persists them to a transient
//! JSON file for cross-process handoff, injects them into the process
//! environment, and hands the live container handles to the registry.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

use crate::containers::StartedSet;
use crate::error::{Result, TestdockError};
use crate::registry;

/// File name of the transient globals handoff file, written under the
/// system temp directory.
pub const GLOBAL_VARS_FILE: &str = "testdock.global-vars.json";

/// Synthetic global name for one field of one labeled container.
pub fn global_var_name(label: &str, field: &str) -> String {
    format!(
        "__TESTCONTAINERS_{}_{}__",
        label.to_uppercase(),
        field.to_uppercase()
    )
}

/// Flatten started-container metadata into the published global map:
/// `IP`, `NAME`, and one `PORT_{originalPort}` entry per mapped port.
pub fn global_variables(set: &StartedSet) -> BTreeMap<String, Value> {
    let mut globals = BTreeMap::new();
    for (label, started) in set {
        globals.insert(
            global_var_name(label, "IP"),
            Value::from(started.info.ip.clone()),
        );
        globals.insert(
            global_var_name(label, "NAME"),
            Value::from(started.info.name.clone()),
        );
        for (original_port, bound_port) in &started.info.port_mappings {
            globals.insert(
                global_var_name(label, &format!("PORT_{original_port}")),
                Value::from(*bound_port),
            );
        }
    }
    globals
}

/// Path of the transient globals file.
pub fn global_vars_path() -> PathBuf {
    std::env::temp_dir().join(GLOBAL_VARS_FILE)
}

/// Publish orchestration results: write the globals file, inject the
/// globals into the process environment, and register the live handles
/// for teardown. Returns the published map.
pub fn publish(set: StartedSet) -> Result<BTreeMap<String, Value>> {
    let globals = global_variables(&set);

    let path = global_vars_path();
    let payload = serde_json::to_string(&globals)?;
    std::fs::write(&path, payload).map_err(|e| TestdockError::io(path.display().to_string(), e))?;

    for (key, value) in &globals {
        std::env::set_var(key, render(value));
    }

    registry::register_all(set.into_values().map(|started| started.handle));

    info!(
        globals = globals.len(),
        handles = registry::len(),
        path = %path.display(),
        "published container globals"
    );

    Ok(globals)
}

/// Read the globals file back, for a test process separate from the one
/// that provisioned the containers.
pub fn load_published_globals() -> Result<BTreeMap<String, Value>> {
    let path = global_vars_path();
    let contents = std::fs::read_to_string(&path)
        .map_err(|e| TestdockError::io(path.display().to_string(), e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Load the globals file and inject every entry into the process
/// environment.
pub fn import_published_globals() -> Result<BTreeMap<String, Value>> {
    let globals = load_published_globals()?;
    for (key, value) in &globals {
        std::env::set_var(key, render(value));
    }
    Ok(globals)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
