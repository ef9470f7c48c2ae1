//! Protocol error types
//!
//! Errors that can occur when building messages or using a registry.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Facility code or name is not one of the 24 syslog facilities
    #[error("invalid facility: {0}")]
    InvalidFacility(String),

    /// Severity code or name is not one of the 8 syslog severities
    #[error("invalid severity: {0}")]
    InvalidSeverity(String),

    /// Charset name is not supported
    #[error("unsupported charset: {0}")]
    UnsupportedCharset(String),
}

impl ProtocolError {
    /// Create an invalid facility error
    #[inline]
    pub fn invalid_facility(value: impl Into<String>) -> Self {
        Self::InvalidFacility(value.into())
    }

    /// Create an invalid severity error
    #[inline]
    pub fn invalid_severity(value: impl Into<String>) -> Self {
        Self::InvalidSeverity(value.into())
    }
}

/// Errors raised by [`Registry`](crate::Registry) operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Instance name is empty or whitespace
    #[error("instance name cannot be empty")]
    EmptyName,

    /// An instance is already bound to this name
    #[error("instance \"{name}\" already defined")]
    Duplicate { name: String },

    /// No instance is bound to this name
    #[error("instance \"{name}\" not defined")]
    Unknown { name: String },
}
