//! # Container Orchestration
//!
//! Starts the configured containers (or the compose stack) and derives
//! their network metadata. All container starts within a batch are issued
//! concurrently and the batch resolves only once every start has settled;
//! any single failure fails the whole batch. Already-started siblings are
//! not rolled back here.

use futures::future;
use std::collections::BTreeMap;
use std::future::Future;
use testcontainers::runners::AsyncRunner;
use tracing::info;

use crate::config::{ContainerConfig, DockerComposeConfig, TestdockConfig};
use crate::containers::builder::image_reference;
use crate::containers::{
    build_container_request, container_metadata, ComposeEnvironment, ContainerInfo,
    StartedContainer, StartedSet,
};
use crate::error::Result;

/// Build and start exactly one container, then derive its metadata.
///
/// The port-mapping table holds only the explicitly requested ports; a
/// port the library cannot resolve after start is omitted.
pub async fn start_container(config: ContainerConfig) -> Result<StartedContainer> {
    info!(image = %image_reference(&config), "starting container");

    let request = build_container_request(&config);
    let container = request.start().await?;

    let requested_ports = config.ports.as_deref().unwrap_or(&[]);
    let info = container_metadata(&container, config.name.as_deref(), requested_ports).await?;

    info!(
        name = %info.name,
        ip = %info.ip,
        ports = info.port_mappings.len(),
        "container started"
    );

    Ok(StartedContainer {
        info,
        handle: Box::new(container),
    })
}

/// Bring up the compose stack and derive metadata per started service.
///
/// No port list is requested explicitly; every actually-bound port of a
/// service is reported. All services share the single stack handle.
pub async fn start_docker_compose_containers(config: &DockerComposeConfig) -> Result<StartedSet> {
    let environment = ComposeEnvironment::new(config);
    let stack = environment.up().await?;
    let services = stack.ps().await?;

    let mut started = StartedSet::new();
    for service in services {
        info!(
            service = %service.service,
            container = %service.container_name,
            "compose service started"
        );
        started.insert(
            service.service.clone(),
            StartedContainer {
                info: ContainerInfo {
                    name: service.container_name,
                    ip: "localhost".to_string(),
                    port_mappings: service.port_mappings,
                },
                handle: Box::new(stack.clone()),
            },
        );
    }

    Ok(started)
}

/// Start everything the configuration describes.
///
/// A compose config delegates entirely to the compose path; otherwise all
/// configured containers start concurrently and the result is keyed by
/// the original user-chosen labels.
pub async fn start_all_containers(config: &TestdockConfig) -> Result<StartedSet> {
    start_all_containers_with(config, start_container, |compose| async move {
        start_docker_compose_containers(&compose).await
    })
    .await
}

/// [`start_all_containers`] with injectable start functions, the seam the
/// orchestration tests drive without a Docker daemon.
pub async fn start_all_containers_with<F, Fut, G, GFut>(
    config: &TestdockConfig,
    starter: F,
    compose_starter: G,
) -> Result<StartedSet>
where
    F: Fn(ContainerConfig) -> Fut,
    Fut: Future<Output = Result<StartedContainer>>,
    G: Fn(DockerComposeConfig) -> GFut,
    GFut: Future<Output = Result<StartedSet>>,
{
    match config {
        TestdockConfig::DockerCompose(compose) => compose_starter(compose.clone()).await,
        TestdockConfig::Containers(containers) => {
            start_containers_concurrently(containers, starter).await
        }
    }
}

async fn start_containers_concurrently<F, Fut>(
    containers: &BTreeMap<String, ContainerConfig>,
    starter: F,
) -> Result<StartedSet>
where
    F: Fn(ContainerConfig) -> Fut,
    Fut: Future<Output = Result<StartedContainer>>,
{
    let starts = containers.iter().map(|(label, config)| {
        let start = starter(config.clone());
        async move { start.await.map(|started| (label.clone(), started)) }
    });

    let started = future::try_join_all(starts).await?;
    Ok(started.into_iter().collect())
}
