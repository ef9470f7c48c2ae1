//! Reroute undelivered messages to another named target

use std::sync::Weak;

use async_trait::async_trait;
use syslane_config::ConfigError;
use syslane_protocol::SyslogMessage;

use super::BacklogHandler;
use crate::{ClientError, Result, Route, TargetRegistry};

/// Resends failed messages through another registered target
///
/// The target is looked up when a message arrives, not when the handler is
/// built, so it may be registered later. A target that is already on the
/// message's route (the failing instance itself, or anything that delegated
/// to it) fails with [`ConfigError::SelfDelegation`].
pub struct DelegatingBacklogHandler {
    target: String,
    append_reason: bool,
    registry: Weak<TargetRegistry>,
}

impl DelegatingBacklogHandler {
    pub fn new(target: impl Into<String>, registry: Weak<TargetRegistry>) -> Self {
        Self {
            target: target.into(),
            append_reason: false,
            registry,
        }
    }

    /// Append `[reason]` to the body of rerouted messages
    #[must_use]
    pub fn with_append_reason(mut self, append: bool) -> Self {
        self.append_reason = append;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait]
impl BacklogHandler for DelegatingBacklogHandler {
    fn name(&self) -> &'static str {
        "delegate"
    }

    async fn down(&self, _instance: &str, _cause: &str) {}

    async fn up(&self, _instance: &str) {}

    async fn log(
        &self,
        instance: &str,
        message: &SyslogMessage,
        reason: &str,
        route: &Route,
    ) -> Result<()> {
        if self.target.trim().eq_ignore_ascii_case(instance) || route.contains(self.target.trim()) {
            return Err(ConfigError::self_delegation(self.target.trim()).into());
        }

        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| ClientError::Closed(self.target.clone()))?;
        let target = registry.lookup(&self.target)?;

        let message = if self.append_reason {
            let body = format!("{} [{reason}]", message.body());
            message.clone().with_body(body)
        } else {
            message.clone()
        };

        tracing::debug!(
            sender = %instance,
            target = %self.target,
            "delegating undelivered message"
        );
        target.send_routed(message, route).await
    }
}

impl std::fmt::Debug for DelegatingBacklogHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelegatingBacklogHandler")
            .field("target", &self.target)
            .field("append_reason", &self.append_reason)
            .finish()
    }
}
