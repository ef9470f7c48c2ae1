//! Syslane Client
//!
//! Named log targets that deliver [`SyslogMessage`]s.
//!
//! - [`Sender`] - one configured protocol instance: modifier chain, transport
//!   with retry, backlog fallback
//! - [`MultiDispatcher`] - fans a message out to several named targets
//! - [`BacklogChain`] - handlers told when a sender goes down or comes back,
//!   and given the messages it could not deliver
//!
//! Targets live in a [`TargetRegistry`] under case-insensitive names. The
//! registry is built from configuration with [`build_registry`] and torn
//! down with [`shutdown_registry`].
//!
//! # Example
//!
//! ```ignore
//! let config = Config::from_file("syslane.toml")?;
//! let registry = syslane_client::build_registry(&config).await?;
//!
//! let udp = registry.lookup("udp")?;
//! udp.send(SyslogMessage::new(Facility::User, Severity::Info, "hello")).await?;
//!
//! syslane_client::shutdown_registry(&registry).await;
//! ```

pub mod backlog;
mod error;
mod factory;
mod multi;
mod sender;

use std::fmt;

use async_trait::async_trait;
use syslane_protocol::{Registry, SyslogMessage};

pub use backlog::{
    BacklogChain, BacklogHandler, DelegatingBacklogHandler, NullBacklogHandler,
    TracingBacklogHandler,
};
pub use error::{ClientError, Result};
pub use factory::{build_registry, create_sender, shutdown_registry};
pub use multi::MultiDispatcher;
pub use sender::{Sender, SenderMetrics, SenderMetricsSnapshot};

/// Registry of every named sender and multi
pub type TargetRegistry = Registry<dyn LogTarget>;

/// Anything a message can be sent to by name
#[async_trait]
pub trait LogTarget: Send + Sync {
    /// Registered name
    fn name(&self) -> &str;

    /// Deliver a message
    async fn send(&self, message: SyslogMessage) -> Result<()> {
        self.send_routed(message, &Route::default()).await
    }

    /// Deliver a message that reached this target through `route`
    ///
    /// Delegating backlog handlers and multis pass the route along so that a
    /// cycle back to an instance already on it is refused instead of looping.
    async fn send_routed(&self, message: SyslogMessage, route: &Route) -> Result<()>;

    /// Close transports; later sends fail
    async fn shutdown(&self);
}

/// Instances a message has passed through, in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route(Vec<String>);

impl Route {
    /// Whether `name` is already on the route (case-insensitive)
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|hop| hop.eq_ignore_ascii_case(name))
    }

    /// This route extended by one hop
    #[must_use]
    pub fn then(&self, name: &str) -> Self {
        let mut hops = self.0.clone();
        hops.push(name.to_string());
        Self(hops)
    }

    pub fn hops(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" -> "))
    }
}
