//! # Configuration Loader
//!
//! Config file discovery and safe reading. The file is
//! `testdock.config.json` in the working directory unless
//! `TESTDOCK_CONFIG_PATH` points elsewhere; relative overrides resolve
//! against the working directory.

use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{parse_config, TestdockConfig};
use crate::error::{Result, TestdockError};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "testdock.config.json";

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "TESTDOCK_CONFIG_PATH";

const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Read, parse, and validate the harness configuration.
pub fn read_config() -> Result<TestdockConfig> {
    let override_path = env::var(CONFIG_PATH_ENV).ok();
    read_config_from(override_path.as_deref())
}

/// Read the configuration, resolving `env_value` the way the
/// `TESTDOCK_CONFIG_PATH` override is resolved.
pub fn read_config_from(env_value: Option<&str>) -> Result<TestdockConfig> {
    let path = config_path(env_value);
    if !path.exists() {
        return Err(TestdockError::configuration(
            "config",
            format!("config file could not be found at: {}", path.display()),
        ));
    }

    debug!(path = %path.display(), "loading harness configuration");

    let contents = read_config_file_safely(&path)?;
    let raw: Value = serde_json::from_str(&contents).map_err(|e| {
        TestdockError::configuration(
            "config",
            format!("could not read file {} as json: {e}", path.display()),
        )
    })?;

    parse_config(&raw)
}

/// Resolve the config file path from an optional override value.
/// Relative values (and the default name) resolve against the working
/// directory.
pub fn config_path(env_value: Option<&str>) -> PathBuf {
    let candidate = match env_value {
        None | Some("") => PathBuf::from(DEFAULT_CONFIG_FILE),
        Some(value) => PathBuf::from(value),
    };

    if candidate.is_absolute() {
        candidate
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(&candidate))
            .unwrap_or(candidate)
    }
}

/// Read a configuration file after checking it is a reasonably-sized
/// regular file.
fn read_config_file_safely(path: &Path) -> Result<String> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| TestdockError::io(path.display().to_string(), e))?;

    if !metadata.is_file() {
        return Err(TestdockError::configuration(
            "config",
            format!("config path must point to a regular file: {}", path.display()),
        ));
    }

    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(TestdockError::configuration(
            "config",
            format!(
                "config file too large ({} bytes > {} byte limit): {}",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE,
                path.display()
            ),
        ));
    }

    std::fs::read_to_string(path).map_err(|e| TestdockError::io(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_path_default() {
        let cwd = env::current_dir().expect("cwd");
        assert_eq!(config_path(None), cwd.join(DEFAULT_CONFIG_FILE));
        assert_eq!(config_path(Some("")), cwd.join(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_config_path_absolute_override() {
        assert_eq!(
            config_path(Some("/etc/testdock.json")),
            PathBuf::from("/etc/testdock.json")
        );
    }

    #[test]
    fn test_config_path_relative_override() {
        let cwd = env::current_dir().expect("cwd");
        assert_eq!(
            config_path(Some("ci/containers.json")),
            cwd.join("ci/containers.json")
        );
    }

    #[test]
    fn test_missing_file_error_names_path() {
        let err = read_config_from(Some("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn test_reads_and_validates_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "cache": {{ "image": "redis" }} }}"#).expect("write config");

        let config = read_config_from(Some(file.path().to_str().unwrap()))
            .expect("config should load");
        let TestdockConfig::Containers(containers) = config else {
            panic!("expected container variant");
        };
        assert_eq!(containers["cache"].image, "redis");
    }

    #[test]
    fn test_invalid_json_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json at all").expect("write config");

        let err = read_config_from(Some(file.path().to_str().unwrap())).unwrap_err();
        assert!(matches!(err, TestdockError::Configuration { .. }));
        assert!(err.to_string().contains("as json"));
    }
}
