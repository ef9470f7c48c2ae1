//! Server error types

use std::io;

use syslane_config::ConfigError;
use syslane_protocol::RegistryError;
use syslane_transport::TransportError;
use thiserror::Error;

use crate::ServerState;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors from starting, running or stopping a server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid server configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unknown or duplicate server name
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// TLS acceptor could not be built
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Listen address could not be bound
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operation not allowed in the current state
    #[error("server {name} is {state}")]
    InvalidState { name: String, state: ServerState },
}

impl ServerError {
    /// Create a bind error
    pub fn bind(address: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            address: address.into(),
            source,
        }
    }

    /// Create a state error
    pub fn invalid_state(name: impl Into<String>, state: ServerState) -> Self {
        Self::InvalidState {
            name: name.into(),
            state,
        }
    }
}

/// Failure reported by an [`EventHandler`](crate::EventHandler)
///
/// Handler failures are logged and counted; they never stop a session.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(msg: impl ToString) -> Self {
        Self(msg.to_string())
    }
}
