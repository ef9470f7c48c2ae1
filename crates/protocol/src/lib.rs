//! Syslane Protocol - Core syslog types shared by senders and servers
//!
//! This crate provides the foundational types that flow through the engine:
//! - `SyslogMessage` - Immutable outbound syslog event
//! - `Facility` / `Severity` - The two halves of a PRI value
//! - `StructuredEvent` - Decoded inbound message
//! - `StructuredMessageParser` - Total parser from raw bytes to `StructuredEvent`
//! - `Charset` - Wire encoding of message text
//! - `Registry` - Name → instance map for senders and servers
//!
//! # Design Principles
//!
//! - **Immutable messages**: modifiers produce new messages, never mutate in place
//! - **Total parsing**: malformed input degrades to a raw event, it never fails
//! - **Explicit registry**: no process-wide state, callers own and inject registries

mod charset;
mod error;
mod event;
mod message;
mod parser;
mod registry;

pub use charset::Charset;
pub use error::{ProtocolError, RegistryError};
pub use event::StructuredEvent;
pub use message::{Facility, MessageFormat, Severity, StructuredData, SyslogMessage, split_pri};
pub use parser::{StructuredMessageParser, parse};
pub use registry::Registry;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Default syslog port
pub const DEFAULT_PORT: u16 = 514;

/// Highest valid PRI value (facility 23, severity 7)
pub const MAX_PRI: u8 = 191;

/// Platform line terminator used as the default stream delimiter
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";

/// Platform line terminator used as the default stream delimiter
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

#[cfg(test)]
mod parser_test;
