//! # Docker Compose Environment
//!
//! Drives a docker-compose stack through the `docker compose` CLI. Each
//! environment is bound to a randomized project name so concurrent runs
//! on the same host cannot collide.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

use super::Stoppable;
use crate::config::DockerComposeConfig;
use crate::error::{Result, TestdockError};

/// A compose stack ready to bring up.
#[derive(Debug, Clone)]
pub struct ComposeEnvironment {
    compose_file: PathBuf,
    project_name: String,
    startup_timeout: Option<Duration>,
}

impl ComposeEnvironment {
    /// Bind a validated compose descriptor to a fresh project name.
    pub fn new(config: &DockerComposeConfig) -> Self {
        let project_name = format!("testdock-{}", Uuid::new_v4().simple());
        let compose_file = Path::new(&config.compose_file_path).join(&config.compose_file);

        Self {
            compose_file,
            project_name,
            startup_timeout: config.startup_timeout.map(Duration::from_millis),
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn compose_file(&self) -> &Path {
        &self.compose_file
    }

    /// Bring the stack up detached, waiting for services to be running.
    ///
    /// When a startup timeout is configured the whole `up` is bounded by
    /// it and a timeout surfaces as a startup error.
    pub async fn up(self) -> Result<ComposeStack> {
        info!(
            project = %self.project_name,
            compose_file = %self.compose_file.display(),
            "bringing compose stack up"
        );

        let up = run_compose(&self.project_name, &self.compose_file, &["up", "-d", "--wait"]);
        match self.startup_timeout {
            Some(limit) => tokio::time::timeout(limit, up)
                .await
                .map_err(|_| {
                    TestdockError::startup(format!(
                        "compose stack {} did not start within {}ms",
                        self.project_name,
                        limit.as_millis()
                    ))
                })?
                .map_err(TestdockError::startup)?,
            None => up.await.map_err(TestdockError::startup)?,
        };

        info!(project = %self.project_name, "compose stack started");

        Ok(ComposeStack {
            inner: Arc::new(StackInner {
                project_name: self.project_name,
                compose_file: self.compose_file,
                stopped: AtomicBool::new(false),
            }),
        })
    }
}

/// A running compose stack. Clones share the stack; the underlying
/// `down` runs at most once no matter how many clones are stopped.
#[derive(Debug, Clone)]
pub struct ComposeStack {
    inner: Arc<StackInner>,
}

#[derive(Debug)]
struct StackInner {
    project_name: String,
    compose_file: PathBuf,
    stopped: AtomicBool,
}

impl ComposeStack {
    pub fn project_name(&self) -> &str {
        &self.inner.project_name
    }

    /// Introspect the started services and their published ports.
    pub async fn ps(&self) -> Result<Vec<ComposeService>> {
        let stdout = run_compose(
            &self.inner.project_name,
            &self.inner.compose_file,
            &["ps", "--format", "json"],
        )
        .await
        .map_err(TestdockError::startup)?;

        parse_ps_output(&stdout)
    }

    /// Stop and remove the stack and its volumes.
    pub async fn down(&self) -> Result<()> {
        debug!(project = %self.inner.project_name, "taking compose stack down");
        run_compose(
            &self.inner.project_name,
            &self.inner.compose_file,
            &["down", "-v"],
        )
        .await
        .map_err(TestdockError::teardown)?;
        Ok(())
    }
}

#[async_trait]
impl Stoppable for ComposeStack {
    async fn stop(&self) -> Result<()> {
        // Every service shares this handle; only the first stop tears the
        // stack down.
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.down().await
    }
}

/// One started service of a compose stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeService {
    /// Service name from the compose file.
    pub service: String,
    /// Assigned container name.
    pub container_name: String,
    /// Container-internal port to host-bound port, for every published
    /// port of the service.
    pub port_mappings: BTreeMap<u16, u16>,
}

async fn run_compose(
    project: &str,
    compose_file: &Path,
    args: &[&str],
) -> std::result::Result<String, String> {
    let output = Command::new("docker")
        .arg("compose")
        .arg("-p")
        .arg(project)
        .arg("-f")
        .arg(compose_file)
        .args(args)
        .output()
        .await
        .map_err(|e| format!("failed to invoke docker compose: {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "docker compose {} exited with {}: {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

// `docker compose ps --format json` emits one JSON object per line on
// current releases and a single JSON array on older ones.
fn parse_ps_output(stdout: &str) -> Result<Vec<ComposeService>> {
    let trimmed = stdout.trim();

    let entries: Vec<PsEntry> = if trimmed.is_empty() {
        Vec::new()
    } else if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<serde_json::Result<Vec<PsEntry>>>()?
    };

    Ok(entries.into_iter().map(ComposeService::from).collect())
}

#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "Publishers", default)]
    publishers: Option<Vec<PsPublisher>>,
}

#[derive(Debug, Deserialize)]
struct PsPublisher {
    #[serde(rename = "TargetPort")]
    target_port: u16,
    #[serde(rename = "PublishedPort", default)]
    published_port: u16,
}

impl From<PsEntry> for ComposeService {
    fn from(entry: PsEntry) -> Self {
        let port_mappings = entry
            .publishers
            .unwrap_or_default()
            .into_iter()
            .filter(|publisher| publisher.published_port != 0)
            .map(|publisher| (publisher.target_port, publisher.published_port))
            .collect();

        ComposeService {
            service: entry.service,
            container_name: entry.name,
            port_mappings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compose_config() -> DockerComposeConfig {
        DockerComposeConfig {
            compose_file_path: ".".to_string(),
            compose_file: "docker-compose.yml".to_string(),
            startup_timeout: Some(1000),
        }
    }

    #[test]
    fn test_project_names_are_unique_per_environment() {
        let config = compose_config();
        let first = ComposeEnvironment::new(&config);
        let second = ComposeEnvironment::new(&config);

        assert!(first.project_name().starts_with("testdock-"));
        assert_ne!(first.project_name(), second.project_name());
    }

    #[test]
    fn test_compose_file_joins_path_and_name() {
        let environment = ComposeEnvironment::new(&compose_config());
        assert_eq!(
            environment.compose_file(),
            Path::new("./docker-compose.yml")
        );
    }

    #[test]
    fn test_parse_ps_output_ndjson() {
        let stdout = format!(
            "{}\n{}\n",
            json!({
                "Name": "proj-redis-1",
                "Service": "redis",
                "Publishers": [
                    {"URL": "0.0.0.0", "TargetPort": 6379, "PublishedPort": 49153, "Protocol": "tcp"}
                ]
            }),
            json!({"Name": "proj-worker-1", "Service": "worker"})
        );

        let services = parse_ps_output(&stdout).expect("ndjson should parse");
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].service, "redis");
        assert_eq!(services[0].container_name, "proj-redis-1");
        assert_eq!(services[0].port_mappings[&6379], 49153);
        assert!(services[1].port_mappings.is_empty());
    }

    #[test]
    fn test_parse_ps_output_array() {
        let stdout = json!([
            {
                "Name": "proj-db-1",
                "Service": "db",
                "Publishers": [
                    {"TargetPort": 5432, "PublishedPort": 49200},
                    {"TargetPort": 5433, "PublishedPort": 0}
                ]
            }
        ])
        .to_string();

        let services = parse_ps_output(&stdout).expect("array should parse");
        assert_eq!(services.len(), 1);
        // unpublished ports are omitted
        assert_eq!(services[0].port_mappings.len(), 1);
        assert_eq!(services[0].port_mappings[&5432], 49200);
    }

    #[test]
    fn test_parse_ps_output_empty() {
        assert!(parse_ps_output("").expect("empty output is fine").is_empty());
    }

    #[tokio::test]
    async fn test_stack_stop_runs_down_once() {
        let stack = ComposeStack {
            inner: Arc::new(StackInner {
                project_name: "testdock-test".to_string(),
                compose_file: PathBuf::from("missing.yml"),
                stopped: AtomicBool::new(true),
            }),
        };

        // already stopped: no CLI call, immediate success
        stack.stop().await.expect("second stop is a no-op");
        stack.clone().stop().await.expect("clones share the guard");
    }
}
