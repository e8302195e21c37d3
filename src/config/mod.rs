//! # Harness Configuration
//!
//! Typed configuration model and validation for the container harness.
//!
//! A configuration maps user-chosen container labels to container
//! descriptors, or holds a single `dockerCompose` descriptor. The two
//! shapes are mutually exclusive. Labels are reused later to name the
//! published globals, so they are preserved verbatim.
//!
//! Validation walks the raw deserialized JSON explicitly instead of
//! relying on derive-only parsing: the rules are ordered, presence-keyed,
//! and every rejection names the offending field and value. Unrecognized
//! fields are dropped.

pub mod loader;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{Result, TestdockError};

pub use loader::{read_config, CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE};

/// Top-level key selecting the docker-compose variant.
pub const DOCKER_COMPOSE_KEY: &str = "dockerCompose";

/// A validated harness configuration: either a set of labeled containers
/// or a single docker-compose stack.
#[derive(Debug, Clone, PartialEq)]
pub enum TestdockConfig {
    /// Per-container provisioning, keyed by user-chosen label.
    Containers(BTreeMap<String, ContainerConfig>),
    /// A docker-compose stack.
    DockerCompose(DockerComposeConfig),
}

/// Descriptor for a single container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerConfig {
    /// Image name, always present and non-blank.
    pub image: String,
    /// Image tag; `latest` when absent.
    pub tag: Option<String>,
    /// Container ports to expose and map to host ports.
    pub ports: Option<Vec<u16>>,
    /// Container name override.
    pub name: Option<String>,
    /// Environment variables.
    pub env: Option<BTreeMap<String, String>>,
    /// Readiness policy.
    pub wait: Option<WaitConfig>,
    /// Host-path to container-path volume mappings.
    pub bind_mounts: Option<Vec<BindMount>>,
}

/// Readiness policy for a started container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WaitConfig {
    /// Wait for exposed ports, bounded by a startup timeout in seconds.
    Ports { timeout: u64 },
    /// Wait for a matching log line.
    Text { text: String },
}

/// A host-path to container-path volume mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindMount {
    pub source: String,
    pub target: String,
    pub mode: BindMode,
}

/// Access mode of a bind mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindMode {
    #[serde(rename = "ro")]
    ReadOnly,
    #[serde(rename = "rw")]
    ReadWrite,
}

/// Descriptor for a docker-compose stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerComposeConfig {
    /// Directory holding the compose file.
    pub compose_file_path: String,
    /// Compose file name within that directory.
    pub compose_file: String,
    /// Stack startup timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_timeout: Option<u64>,
}

/// Validate a raw deserialized configuration value.
///
/// Rules, in order: the top-level object must be non-empty; a
/// `dockerCompose` key forbids any sibling key; otherwise every entry is
/// validated as a [`ContainerConfig`].
pub fn parse_config(raw: &Value) -> Result<TestdockConfig> {
    let entries = match raw {
        Value::Object(map) if !map.is_empty() => map,
        _ => {
            return Err(TestdockError::configuration(
                "config",
                "testcontainers config can not be empty",
            ))
        }
    };

    if let Some(compose) = entries.get(DOCKER_COMPOSE_KEY) {
        if entries.len() > 1 {
            return Err(TestdockError::configuration(
                DOCKER_COMPOSE_KEY,
                "dockerCompose can not be combined with other images",
            ));
        }
        return parse_docker_compose_config(compose).map(TestdockConfig::DockerCompose);
    }

    let mut containers = BTreeMap::new();
    for (label, value) in entries {
        containers.insert(label.clone(), parse_container_config(label, value)?);
    }
    Ok(TestdockConfig::Containers(containers))
}

fn parse_docker_compose_config(value: &Value) -> Result<DockerComposeConfig> {
    serde_json::from_value(value.clone()).map_err(|e| {
        TestdockError::configuration(DOCKER_COMPOSE_KEY, format!("invalid shape: {e}"))
    })
}

fn parse_container_config(label: &str, value: &Value) -> Result<ContainerConfig> {
    let entry = value.as_object().ok_or_else(|| {
        TestdockError::configuration(label, format!("container entry should be an object: {value}"))
    })?;

    let image = parse_image(label, entry.get("image"))?;
    let tag = parse_optional_text(label, "tag", entry.get("tag"), "tag is optional but should be a non-blank string")?;
    let ports = parse_ports(label, entry.get("ports"))?;
    let name = parse_optional_text(label, "name", entry.get("name"), "name is optional but should be a non-blank string")?;
    let env = parse_env(label, entry.get("env"))?;
    let wait = parse_wait(label, entry.get("wait"))?;
    let bind_mounts = parse_bind_mounts(label, entry.get("bindMounts"))?;

    Ok(ContainerConfig {
        image,
        tag,
        ports,
        name,
        env,
        wait,
        bind_mounts,
    })
}

fn parse_image(label: &str, value: Option<&Value>) -> Result<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(TestdockError::configuration(
            format!("{label}.image"),
            "an image should be presented",
        )),
    }
}

fn parse_optional_text(
    label: &str,
    field: &str,
    value: Option<&Value>,
    message: &str,
) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.clone())),
        Some(other) => Err(TestdockError::configuration(
            format!("{label}.{field}"),
            format!("{message}, got: {other}"),
        )),
    }
}

fn parse_ports(label: &str, value: Option<&Value>) -> Result<Option<Vec<u16>>> {
    let field = format!("{label}.ports");
    match value {
        None => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .filter(|p| *p <= u64::from(u16::MAX))
                    .map(|p| p as u16)
                    .ok_or_else(|| {
                        TestdockError::configuration(
                            field.clone(),
                            format!("ports should be a list of integers, got element: {item}"),
                        )
                    })
            })
            .collect::<Result<Vec<u16>>>()
            .map(Some),
        Some(other) => Err(TestdockError::configuration(
            field,
            format!("ports should be a list of integers, got: {other}"),
        )),
    }
}

fn parse_env(label: &str, value: Option<&Value>) -> Result<Option<BTreeMap<String, String>>> {
    let field = format!("{label}.env");
    match value {
        None => Ok(None),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(key, val)| match val {
                Value::String(s) => Ok((key.clone(), s.clone())),
                other => Err(TestdockError::configuration(
                    format!("{field}.{key}"),
                    format!("env should be an object of env key to value, got: {other}"),
                )),
            })
            .collect::<Result<BTreeMap<String, String>>>()
            .map(Some),
        Some(other) => Err(TestdockError::configuration(
            field,
            format!("env should be an object of env key to value, got: {other}"),
        )),
    }
}

fn parse_wait(label: &str, value: Option<&Value>) -> Result<Option<WaitConfig>> {
    let field = format!("{label}.wait");
    let entry = match value {
        None => return Ok(None),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(TestdockError::configuration(
                field,
                format!("wait can be ports or text, got: {other}"),
            ))
        }
    };

    match entry.get("type").and_then(Value::as_str) {
        Some("ports") => {
            let timeout = entry.get("timeout").and_then(Value::as_u64).ok_or_else(|| {
                TestdockError::configuration(
                    format!("{field}.timeout"),
                    "wait type ports requires timeout field as integer",
                )
            })?;
            Ok(Some(WaitConfig::Ports { timeout }))
        }
        Some("text") => {
            let text = entry
                .get("text")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    TestdockError::configuration(
                        format!("{field}.text"),
                        "wait type text requires a text to wait for",
                    )
                })?;
            Ok(Some(WaitConfig::Text {
                text: text.to_string(),
            }))
        }
        _ => Err(TestdockError::configuration(
            format!("{field}.type"),
            "wait can be ports or text",
        )),
    }
}

fn parse_bind_mounts(label: &str, value: Option<&Value>) -> Result<Option<Vec<BindMount>>> {
    let field = format!("{label}.bindMounts");
    match value {
        None => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| parse_bind_mount(&format!("{field}[{idx}]"), item))
            .collect::<Result<Vec<BindMount>>>()
            .map(Some),
        Some(other) => Err(TestdockError::configuration(
            field,
            format!("bindMounts should be a list of source/target/mode objects, got: {other}"),
        )),
    }
}

fn parse_bind_mount(field: &str, value: &Value) -> Result<BindMount> {
    let entry = value.as_object().ok_or_else(|| {
        TestdockError::configuration(
            field,
            format!("bind mount should be a source/target/mode object, got: {value}"),
        )
    })?;

    let path_field = |name: &str| -> Result<String> {
        entry
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                TestdockError::configuration(
                    format!("{field}.{name}"),
                    format!("bind mount requires a non-empty {name}"),
                )
            })
    };

    let source = path_field("source")?;
    let target = path_field("target")?;
    let mode = match entry.get("mode").and_then(Value::as_str) {
        Some("ro") => BindMode::ReadOnly,
        Some("rw") => BindMode::ReadWrite,
        other => {
            return Err(TestdockError::configuration(
                format!("{field}.mode"),
                format!("bind mount mode should be ro or rw, got: {other:?}"),
            ))
        }
    };

    Ok(BindMount {
        source,
        target,
        mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wait_config_tagged_serde() {
        let ports: WaitConfig = serde_json::from_value(json!({"type": "ports", "timeout": 42}))
            .expect("ports wait should deserialize");
        assert_eq!(ports, WaitConfig::Ports { timeout: 42 });

        let text: WaitConfig = serde_json::from_value(json!({"type": "text", "text": "ready"}))
            .expect("text wait should deserialize");
        assert_eq!(
            text,
            WaitConfig::Text {
                text: "ready".to_string()
            }
        );
    }

    #[test]
    fn test_bind_mode_rename() {
        assert_eq!(serde_json::to_value(BindMode::ReadOnly).unwrap(), json!("ro"));
        assert_eq!(serde_json::to_value(BindMode::ReadWrite).unwrap(), json!("rw"));
    }

    #[test]
    fn test_unrecognized_fields_are_dropped() {
        let raw = json!({
            "cache": { "image": "redis", "entrypoint": "/bin/sh", "privileged": true }
        });
        let parsed = parse_config(&raw).expect("valid entry should parse");
        let TestdockConfig::Containers(containers) = parsed else {
            panic!("expected container variant");
        };
        assert_eq!(containers["cache"].image, "redis");
        assert!(containers["cache"].tag.is_none());
    }

    #[test]
    fn test_port_out_of_u16_range_fails() {
        let raw = json!({ "cache": { "image": "redis", "ports": [70000] } });
        let err = parse_config(&raw).unwrap_err();
        assert!(matches!(err, TestdockError::Configuration { .. }));
    }
}
