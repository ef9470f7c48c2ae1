//! Configuration validation
//!
//! Validates config consistency:
//! - Pool invariants hold
//! - Split markers leave room for payload in each fragment
//! - Unix instances have a path, TLS servers a certificate
//! - Modifier values serde cannot check
//! - Senders and multis do not share a name (they share one registry)
//!
//! Multi targets are deliberately not resolved here; unknown or
//! self-referencing targets fail when a message is sent.

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::sender::SenderConfig;
use crate::server::ServerConfig;
use crate::transport::TransportKind;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    for (name, sender) in &config.senders {
        validate_sender(name, sender)?;
    }
    for (name, server) in &config.servers {
        validate_server(name, server)?;
    }
    validate_names(config)?;
    Ok(())
}

/// Validate one sender
pub fn validate_sender(name: &str, sender: &SenderConfig) -> Result<()> {
    let transport = &sender.transport;

    match transport.kind {
        TransportKind::Unix => {
            if transport.path.as_os_str().is_empty() {
                return Err(ConfigError::missing_field("sender", name, "path"));
            }
        }
        _ => {
            if transport.host.trim().is_empty() {
                return Err(ConfigError::missing_field("sender", name, "host"));
            }
        }
    }

    if transport.kind == TransportKind::Udp && !transport.truncate_message {
        let overhead = transport.split_begin.len() + transport.split_end.len();
        if transport.max_message_length <= overhead {
            return Err(ConfigError::invalid_value(
                "sender",
                name,
                "max_message_length",
                format!(
                    "{} leaves no room for payload between split markers ({overhead} bytes)",
                    transport.max_message_length
                ),
            ));
        }
    }

    if transport.kind.is_connection_oriented() && transport.delimiter.is_empty() {
        return Err(ConfigError::invalid_value(
            "sender",
            name,
            "delimiter",
            "stream transports need a non-empty delimiter",
        ));
    }

    if let Some(pool) = &sender.pool {
        pool.validate(name)?;
    }

    for modifier in &sender.modifiers {
        modifier.validate(name)?;
    }

    Ok(())
}

/// Validate one server
pub fn validate_server(name: &str, server: &ServerConfig) -> Result<()> {
    if server.max_frame_size == 0 {
        return Err(ConfigError::invalid_value(
            "server",
            name,
            "max_frame_size",
            "must be greater than 0",
        ));
    }

    match server.kind {
        TransportKind::Unix if server.path.as_os_str().is_empty() => {
            Err(ConfigError::missing_field("server", name, "path"))
        }
        TransportKind::Tls if server.tls.is_none() => {
            Err(ConfigError::missing_field("server", name, "tls"))
        }
        TransportKind::Tcp | TransportKind::Tls if server.delimiter.is_empty() => {
            Err(ConfigError::invalid_value(
                "server",
                name,
                "delimiter",
                "stream transports need a non-empty delimiter",
            ))
        }
        _ => Ok(()),
    }
}

/// Senders and multis are looked up through the same registry
fn validate_names(config: &Config) -> Result<()> {
    for name in config.multi.keys() {
        if config
            .senders
            .keys()
            .any(|sender| sender.eq_ignore_ascii_case(name))
        {
            return Err(ConfigError::DuplicateInstance { name: name.clone() });
        }
    }
    Ok(())
}
