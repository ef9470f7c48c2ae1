//! Sender (client instance) configuration

use std::time::Duration;

use serde::Deserialize;
use syslane_protocol::{Facility, MessageFormat};

use crate::backlog::BacklogConfig;
use crate::modifiers::ModifierConfig;
use crate::pool::PoolConfig;
use crate::transport::TransportConfig;

/// One named sender
///
/// Transport settings are flattened into the sender table.
///
/// # Example
///
/// ```toml
/// [senders.tcp]
/// kind = "tcp"
/// host = "logs.internal"
/// facility = "local0"
/// ident = "billing"
/// throw_on_write_failure = false
///
/// [senders.tcp.pool]
/// max_active = 4
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Where and how to write
    #[serde(flatten)]
    pub transport: TransportConfig,

    /// Facility for messages built by the sender's helpers
    /// Default: user
    pub facility: Facility,

    /// Tag/app name stamped on messages without one
    pub ident: Option<String>,

    /// Host name stamped on messages without one
    /// Default: this machine's host name
    pub local_name: Option<String>,

    /// Stamp messages with the local host name
    /// Default: true
    pub send_local_name: bool,

    /// Stamp messages with the current time
    /// Default: true
    pub send_local_timestamp: bool,

    /// Wire rendering
    /// Default: bsd
    pub format: MessageFormat,

    /// Return an error to the caller once retries are exhausted
    /// Default: true
    pub throw_on_write_failure: bool,

    /// How long shutdown waits for in-flight writes
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub max_shutdown_wait: Duration,

    /// Pool stream connections (tcp/tls only). Default: one persistent connection
    pub pool: Option<PoolConfig>,

    /// Pipeline steps, in order
    pub modifiers: Vec<ModifierConfig>,

    /// Backlog handlers, in order (empty = default tracing handler)
    pub backlog: Vec<BacklogConfig>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            facility: Facility::User,
            ident: None,
            local_name: None,
            send_local_name: true,
            send_local_timestamp: true,
            format: MessageFormat::Bsd,
            throw_on_write_failure: true,
            max_shutdown_wait: Duration::from_secs(5),
            pool: None,
            modifiers: Vec::new(),
            backlog: Vec::new(),
        }
    }
}

impl SenderConfig {
    /// Sender over the given transport with default options
    pub fn new(transport: TransportConfig) -> Self {
        Self {
            transport,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_facility(mut self, facility: Facility) -> Self {
        self.facility = facility;
        self
    }

    #[must_use]
    pub fn with_ident(mut self, ident: impl Into<String>) -> Self {
        self.ident = Some(ident.into());
        self
    }

    #[must_use]
    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: MessageFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_throw_on_write_failure(mut self, throw: bool) -> Self {
        self.throw_on_write_failure = throw;
        self
    }

    #[must_use]
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = Some(pool);
        self
    }

    #[must_use]
    pub fn with_modifier(mut self, modifier: ModifierConfig) -> Self {
        self.modifiers.push(modifier);
        self
    }

    #[must_use]
    pub fn with_backlog(mut self, handler: BacklogConfig) -> Self {
        self.backlog.push(handler);
        self
    }

    #[must_use]
    pub fn with_local_stamps(mut self, name: bool, timestamp: bool) -> Self {
        self.send_local_name = name;
        self.send_local_timestamp = timestamp;
        self
    }
}
