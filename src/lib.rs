#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Testdock
//!
//! Declarative Docker container provisioning for Rust integration test
//! suites.
//!
//! ## Overview
//!
//! Testdock reads a small JSON configuration describing the containers a
//! test suite needs (or a docker-compose stack), starts them all
//! concurrently before the suite runs, publishes each container's host,
//! name, and port mappings as `__TESTCONTAINERS_{LABEL}_{FIELD}__`
//! globals, and tears everything down afterward. The container lifecycle
//! itself is delegated to the `testcontainers` crate and the
//! `docker compose` CLI; this crate configures and sequences them.
//!
//! ## Module Organization
//!
//! - [`config`] - Configuration model, validation, and file loading
//! - [`containers`] - Container request builder, compose environment, handles
//! - [`orchestration`] - Concurrent start of containers and compose stacks
//! - [`publisher`] - Global variable naming, handoff file, handle registration
//! - [`registry`] - Process-wide live handle registry
//! - [`teardown`] - Concurrent stop with watch-mode skip
//! - [`harness`] - `setup`/`teardown` lifecycle facade
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use testdock::harness;
//!
//! # async fn example() -> testdock::Result<()> {
//! // before the suite: reads testdock.config.json, starts containers,
//! // publishes __TESTCONTAINERS_*__ globals
//! harness::setup_from_env().await?;
//!
//! // ... run tests against the published coordinates ...
//! let port = std::env::var("__TESTCONTAINERS_REDIS_PORT_6379__").unwrap();
//!
//! // after the suite
//! harness::teardown_from_env().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod containers;
pub mod error;
pub mod harness;
pub mod logging;
pub mod orchestration;
pub mod publisher;
pub mod registry;
pub mod teardown;

pub use config::{
    BindMode, BindMount, ContainerConfig, DockerComposeConfig, TestdockConfig, WaitConfig,
};
pub use containers::{ContainerInfo, StartedContainer, StartedSet, Stoppable};
pub use error::{Result, TestdockError};
pub use harness::{setup, setup_from_env, SetupOptions};
pub use teardown::{teardown_all, TeardownOptions};
