//! Configuration error types

use std::io;

use syslane_protocol::{ProtocolError, RegistryError};
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading, validating or editing configuration
///
/// All of these are surfaced immediately and never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Registry binding failed (duplicate or blank name)
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Bad facility, severity or charset value
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Insert or remove at an index past the end of an ordered list
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// List being edited (e.g., "modifier", "backlog handler")
        what: &'static str,
        /// Requested index
        index: usize,
        /// Current list length
        len: usize,
    },

    /// Validation error - invalid value
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: String,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },

    /// Validation error - required field missing
    #[error("{component} '{name}' is missing required field '{field}'")]
    MissingField {
        /// Component type
        component: &'static str,
        /// Name of the component
        name: String,
        /// Missing field name
        field: &'static str,
    },

    /// A delegating backlog handler targets its own instance
    #[error("backlog handler of '{name}' delegates to itself")]
    SelfDelegation {
        /// Instance name
        name: String,
    },

    /// Setting cannot be changed on this kind of instance
    #[error("{setting} cannot be set on {instance}")]
    NotSettable {
        /// Rejected setting
        setting: &'static str,
        /// Instance kind that rejected it
        instance: &'static str,
    },

    /// Unrecognized socket type string
    #[error("invalid socket type '{0}' (expected SOCK_STREAM or SOCK_DGRAM)")]
    InvalidSocketType(String),

    /// Unrecognized socket family string
    #[error("invalid socket family '{0}' (expected AF_UNIX)")]
    InvalidSocketFamily(String),

    /// Same name used by two instances sharing one registry
    #[error("instance '{name}' is defined more than once")]
    DuplicateInstance {
        /// Conflicting name
        name: String,
    },
}

impl ConfigError {
    /// Create an IndexOutOfRange error
    pub fn index_out_of_range(what: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { what, index, len }
    }

    /// Create a MissingField error
    pub fn missing_field(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
    ) -> Self {
        Self::MissingField {
            component,
            name: name.into(),
            field,
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }

    /// Create a SelfDelegation error
    pub fn self_delegation(name: impl Into<String>) -> Self {
        Self::SelfDelegation { name: name.into() }
    }

    /// Create a NotSettable error
    pub fn not_settable(setting: &'static str, instance: &'static str) -> Self {
        Self::NotSettable { setting, instance }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_out_of_range_error() {
        let err = ConfigError::index_out_of_range("modifier", 5, 2);
        assert!(err.to_string().contains("modifier index 5"));
        assert!(err.to_string().contains("len 2"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("sender", "udp", "max_message_length", "too small");
        assert!(err.to_string().contains("udp"));
        assert!(err.to_string().contains("max_message_length"));
    }

    #[test]
    fn test_self_delegation_error() {
        let err = ConfigError::self_delegation("udp");
        assert!(err.to_string().contains("'udp' delegates to itself"));
    }

    #[test]
    fn test_not_settable_error() {
        let err = ConfigError::not_settable("host", "multi");
        assert_eq!(err.to_string(), "host cannot be set on multi");
    }

    #[test]
    fn test_registry_error_is_transparent() {
        let err: ConfigError = RegistryError::Duplicate { name: "tcp".into() }.into();
        assert!(err.to_string().contains("\"tcp\" already defined"));
    }
}
