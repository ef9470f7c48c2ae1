//! Backlog handling
//!
//! When a sender runs out of write attempts it tells every backlog handler
//! that it is down, then hands each of them the undelivered message. The
//! first successful write afterwards tells every handler it is up again.
//! Handlers are always called in configured order.
//!
//! | Handler | down / up | log |
//! |---------|-----------|-----|
//! | [`TracingBacklogHandler`] | `warn!` / `info!` | `warn!` with the message |
//! | [`NullBacklogHandler`] | nothing | dropped |
//! | [`DelegatingBacklogHandler`] | nothing | resent through another named target |

mod chain;
mod delegate;
mod handlers;

use async_trait::async_trait;
use syslane_protocol::SyslogMessage;

use crate::{Result, Route};

pub use chain::BacklogChain;
pub use delegate::DelegatingBacklogHandler;
pub use handlers::{NullBacklogHandler, TracingBacklogHandler};

/// Told about delivery failures of the instances it monitors
#[async_trait]
pub trait BacklogHandler: Send + Sync {
    /// Handler type name
    fn name(&self) -> &'static str;

    /// `instance` exhausted its write attempts
    async fn down(&self, instance: &str, cause: &str);

    /// `instance` delivered again after being down
    async fn up(&self, instance: &str);

    /// Take a message `instance` could not deliver
    ///
    /// `route` ends with `instance`.
    async fn log(
        &self,
        instance: &str,
        message: &SyslogMessage,
        reason: &str,
        route: &Route,
    ) -> Result<()>;
}
