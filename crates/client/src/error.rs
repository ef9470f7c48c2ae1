//! Client error types

use syslane_config::ConfigError;
use syslane_protocol::RegistryError;
use syslane_transform::TransformError;
use syslane_transport::TransportError;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by senders and multis
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration problem, never retried
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unknown or duplicate instance name
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Modifier chain failed
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Transport failure that is not retried (pool exhausted, setup)
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Every write attempt failed
    #[error("delivery via {instance} failed after {attempts} attempts: {source}")]
    Delivery {
        instance: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// One or more targets of a multi failed
    #[error("multi {instance} failed for: {}", failed.join(", "))]
    Multi {
        instance: String,
        failed: Vec<String>,
    },

    /// Instance already shut down
    #[error("{0} is shut down")]
    Closed(String),
}

impl ClientError {
    /// Create a delivery error
    pub fn delivery(instance: impl Into<String>, attempts: u32, source: TransportError) -> Self {
        Self::Delivery {
            instance: instance.into(),
            attempts,
            source,
        }
    }

    /// Configuration errors bypass throw-on-write-failure and error
    /// suppression
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Transform(TransformError::Config(_)))
    }

    /// Whether this is a self-referencing delegation
    pub fn is_self_delegation(&self) -> bool {
        matches!(self, Self::Config(ConfigError::SelfDelegation { .. }))
    }
}
