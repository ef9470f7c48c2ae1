//! Multi - broadcast one message to several named targets

use std::sync::Weak;

use async_trait::async_trait;
use syslane_config::{ConfigError, MultiConfig};
use syslane_protocol::SyslogMessage;

use crate::{ClientError, LogTarget, Result, Route, TargetRegistry};

#[cfg(test)]
#[path = "multi_test.rs"]
mod tests;

/// Sends every message to each configured protocol, in order
///
/// A failing target does not stop the rest. Failures are reported together
/// as [`ClientError::Multi`] unless the registry suppresses errors.
/// A target already on the route (including the multi itself) is a
/// configuration error and is always reported.
pub struct MultiDispatcher {
    name: String,
    config: MultiConfig,
    registry: Weak<TargetRegistry>,
}

impl MultiDispatcher {
    pub fn new(name: impl Into<String>, config: MultiConfig, registry: Weak<TargetRegistry>) -> Self {
        Self {
            name: name.into(),
            config,
            registry,
        }
    }

    pub fn protocols(&self) -> &[String] {
        self.config.protocols()
    }
}

#[async_trait]
impl LogTarget for MultiDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_routed(&self, message: SyslogMessage, route: &Route) -> Result<()> {
        if route.contains(&self.name) {
            return Err(ConfigError::self_delegation(&self.name).into());
        }

        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| ClientError::Closed(self.name.clone()))?;
        let route = route.then(&self.name);

        let mut failed = Vec::new();
        let mut config_error = None;

        for protocol in self.config.protocols() {
            let result: Result<()> = if route.contains(protocol) {
                Err(ConfigError::self_delegation(protocol.as_str()).into())
            } else {
                match registry.lookup(protocol) {
                    Ok(target) => target.send_routed(message.clone(), &route).await,
                    Err(e) => Err(e.into()),
                }
            };

            if let Err(e) = result {
                tracing::debug!(
                    multi = %self.name,
                    target = %protocol,
                    error = %e,
                    "multi target failed"
                );
                if e.is_config() && config_error.is_none() {
                    config_error = Some(e);
                }
                failed.push(protocol.clone());
            }
        }

        if let Some(e) = config_error {
            return Err(e);
        }

        if failed.is_empty() || registry.suppress_errors() {
            Ok(())
        } else {
            Err(ClientError::Multi {
                instance: self.name.clone(),
                failed,
            })
        }
    }

    async fn shutdown(&self) {}
}

impl std::fmt::Debug for MultiDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiDispatcher")
            .field("name", &self.name)
            .field("protocols", &self.config.protocols())
            .finish()
    }
}
