//! # Container Handles and Metadata
//!
//! Shared types for started containers: the metadata extracted after a
//! start, the `Stoppable` handle abstraction consumed by teardown, and
//! the per-container metadata extractor.

pub mod builder;
pub mod compose;

use async_trait::async_trait;
use std::collections::BTreeMap;
use testcontainers::core::ContainerPort;
use testcontainers::{ContainerAsync, GenericImage};

use crate::error::{Result, TestdockError};

pub use builder::build_container_request;
pub use compose::{ComposeEnvironment, ComposeService, ComposeStack};

/// Network coordinates of a started container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Assigned container name.
    pub name: String,
    /// Resolved host the container is reachable at.
    pub ip: String,
    /// Container-internal port to host-bound port. Order irrelevant.
    pub port_mappings: BTreeMap<u16, u16>,
}

/// A live handle that can be stopped exactly once by teardown.
#[async_trait]
pub trait Stoppable: Send + Sync {
    async fn stop(&self) -> Result<()>;
}

#[async_trait]
impl Stoppable for ContainerAsync<GenericImage> {
    async fn stop(&self) -> Result<()> {
        ContainerAsync::stop(self)
            .await
            .map_err(|e| TestdockError::teardown(format!("failed to stop container: {e}")))
    }
}

/// A started container: its metadata plus the live handle. The handle is
/// owned exclusively by teardown once orchestration completes.
pub struct StartedContainer {
    pub info: ContainerInfo,
    pub handle: Box<dyn Stoppable>,
}

impl std::fmt::Debug for StartedContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartedContainer")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// All started containers, keyed by the user-chosen config label.
pub type StartedSet = BTreeMap<String, StartedContainer>;

/// Derive the metadata of a started container.
///
/// The mapping table contains only the explicitly requested ports; a port
/// the library cannot resolve is omitted, not an error. When no name was
/// configured the container id stands in for the assigned name.
pub async fn container_metadata(
    container: &ContainerAsync<GenericImage>,
    configured_name: Option<&str>,
    ports: &[u16],
) -> Result<ContainerInfo> {
    let host = container.get_host().await?;

    let mut port_mappings = BTreeMap::new();
    for port in ports {
        if let Ok(host_port) = container.get_host_port_ipv4(ContainerPort::Tcp(*port)).await {
            port_mappings.insert(*port, host_port);
        }
    }

    let name = match configured_name {
        Some(name) => name.to_string(),
        None => container.id().to_string(),
    };

    Ok(ContainerInfo {
        name,
        ip: host.to_string(),
        port_mappings,
    })
}
