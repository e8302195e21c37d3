//! # Error Types
//!
//! Structured error handling for the harness using thiserror. Every fatal
//! error carries enough context (field name, offending value, command
//! output) to diagnose a bad configuration without reading source.

use thiserror::Error;

/// Errors raised across the container harness lifecycle.
#[derive(Error, Debug)]
pub enum TestdockError {
    /// Malformed or missing configuration field. Raised synchronously
    /// during validation and always fatal to the run.
    #[error("Configuration error: {field}: {message}")]
    Configuration { field: String, message: String },

    /// Structurally invalid builder input that validation could not
    /// express. Fatal.
    #[error("Construction error: {message}")]
    Construction { message: String },

    /// Propagated from the container library or the compose CLI (image
    /// pull failure, port conflict, wait-strategy timeout). Fatal to the
    /// whole batch, never retried.
    #[error("Startup error: {message}")]
    Startup { message: String },

    /// A container or compose stack failed to stop.
    #[error("Teardown error: {message}")]
    Teardown { message: String },

    /// File access failure while reading configuration or writing the
    /// globals handoff file.
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failure.
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl TestdockError {
    /// Create a configuration error for a specific field
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a construction error
    pub fn construction(message: impl Into<String>) -> Self {
        Self::Construction {
            message: message.into(),
        }
    }

    /// Create a startup error
    pub fn startup(message: impl Into<String>) -> Self {
        Self::Startup {
            message: message.into(),
        }
    }

    /// Create a teardown error
    pub fn teardown(message: impl Into<String>) -> Self {
        Self::Teardown {
            message: message.into(),
        }
    }

    /// Create an I/O error with the path or operation as context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<testcontainers::TestcontainersError> for TestdockError {
    fn from(err: testcontainers::TestcontainersError) -> Self {
        TestdockError::startup(err.to_string())
    }
}

impl From<serde_json::Error> for TestdockError {
    fn from(err: serde_json::Error) -> Self {
        TestdockError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, TestdockError>;
