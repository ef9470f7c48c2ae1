//! Built-in terminal handlers

use async_trait::async_trait;
use syslane_protocol::{MessageFormat, SyslogMessage};

use super::BacklogHandler;
use crate::{Result, Route};

/// Reports through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingBacklogHandler;

#[async_trait]
impl BacklogHandler for TracingBacklogHandler {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn down(&self, instance: &str, cause: &str) {
        tracing::warn!(sender = %instance, cause = %cause, "sender down");
    }

    async fn up(&self, instance: &str) {
        tracing::info!(sender = %instance, "sender up");
    }

    async fn log(
        &self,
        instance: &str,
        message: &SyslogMessage,
        reason: &str,
        _route: &Route,
    ) -> Result<()> {
        tracing::warn!(
            sender = %instance,
            reason = %reason,
            severity = %message.severity(),
            message = %message.render(MessageFormat::Bsd),
            "undelivered syslog message"
        );
        Ok(())
    }
}

/// Drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBacklogHandler;

#[async_trait]
impl BacklogHandler for NullBacklogHandler {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn down(&self, _instance: &str, _cause: &str) {}

    async fn up(&self, _instance: &str) {}

    async fn log(
        &self,
        _instance: &str,
        _message: &SyslogMessage,
        _reason: &str,
        _route: &Route,
    ) -> Result<()> {
        Ok(())
    }
}
