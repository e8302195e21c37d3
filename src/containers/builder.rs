//! # Container Request Builder
//!
//! Translates one validated [`ContainerConfig`] into a ready-to-start
//! `ContainerRequest<GenericImage>`.

use std::time::Duration;
use testcontainers::core::{AccessMode, ContainerPort, Mount, WaitFor};
use testcontainers::{ContainerRequest, GenericImage, ImageExt};

use crate::config::{BindMode, ContainerConfig, WaitConfig};

/// Tag applied when the config omits one.
pub const DEFAULT_TAG: &str = "latest";

/// Startup timeout applied when no `ports` wait is configured.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Full image reference, `{image}:{tag-or-latest}`.
pub fn image_reference(config: &ContainerConfig) -> String {
    format!(
        "{}:{}",
        config.image,
        config.tag.as_deref().unwrap_or(DEFAULT_TAG)
    )
}

/// Build a container request from a validated descriptor.
///
/// Image reference is `{image}:{tag-or-latest}`. Exposed ports and the
/// log-message wait apply at the image level; the name override (first),
/// environment variables, bind mounts, and the startup timeout apply to
/// the request. A `ports` wait sets the startup timeout to
/// `timeout * 1000` ms; without it the 60s default holds.
pub fn build_container_request(config: &ContainerConfig) -> ContainerRequest<GenericImage> {
    let tag = config.tag.as_deref().unwrap_or(DEFAULT_TAG);
    let mut image = GenericImage::new(config.image.clone(), tag.to_string());

    for port in config.ports.iter().flatten() {
        image = image.with_exposed_port(ContainerPort::Tcp(*port));
    }

    if let Some(WaitConfig::Text { text }) = &config.wait {
        image = image.with_wait_for(WaitFor::message_on_stdout(text.clone()));
    }

    let request: ContainerRequest<GenericImage> = match &config.name {
        Some(name) => image.with_container_name(name.as_str()),
        None => image.into(),
    };

    let request = config
        .env
        .iter()
        .flatten()
        .fold(request, |request, (key, value)| {
            request.with_env_var(key.as_str(), value.as_str())
        });

    let request = config
        .bind_mounts
        .iter()
        .flatten()
        .fold(request, |request, mount| {
            request.with_mount(
                Mount::bind_mount(mount.source.clone(), mount.target.clone())
                    .with_access_mode(access_mode(mount.mode)),
            )
        });

    request.with_startup_timeout(startup_timeout(config.wait.as_ref()))
}

fn access_mode(mode: BindMode) -> AccessMode {
    match mode {
        BindMode::ReadOnly => AccessMode::ReadOnly,
        BindMode::ReadWrite => AccessMode::ReadWrite,
    }
}

fn startup_timeout(wait: Option<&WaitConfig>) -> Duration {
    match wait {
        Some(WaitConfig::Ports { timeout }) => Duration::from_millis(timeout * 1000),
        _ => DEFAULT_STARTUP_TIMEOUT,
    }
}
