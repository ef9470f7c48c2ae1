//! Ordered backlog handlers with per-instance up/down state

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use syslane_config::{BacklogConfig, ConfigError};
use syslane_protocol::SyslogMessage;

use super::{BacklogHandler, DelegatingBacklogHandler, NullBacklogHandler, TracingBacklogHandler};
use crate::{Result, Route, TargetRegistry};

#[cfg(test)]
#[path = "chain_test.rs"]
mod tests;

/// Ordered list of backlog handlers
///
/// Tracks which monitored instances are down so that `up` is only sent on
/// the first success after a failure.
pub struct BacklogChain {
    handlers: Vec<Arc<dyn BacklogHandler>>,
    down: Mutex<HashSet<String>>,
}

impl BacklogChain {
    pub fn new(handlers: Vec<Arc<dyn BacklogHandler>>) -> Self {
        Self {
            handlers,
            down: Mutex::new(HashSet::new()),
        }
    }

    /// Chain with only the tracing handler, used when none is configured
    pub fn with_default() -> Self {
        Self::new(vec![Arc::new(TracingBacklogHandler)])
    }

    /// Build from configuration; an empty list gets the default handler
    pub fn from_configs(configs: &[BacklogConfig], registry: &Weak<TargetRegistry>) -> Self {
        if configs.is_empty() {
            return Self::with_default();
        }

        let handlers = configs
            .iter()
            .map(|config| -> Arc<dyn BacklogHandler> {
                match config {
                    BacklogConfig::Tracing => Arc::new(TracingBacklogHandler),
                    BacklogConfig::Null => Arc::new(NullBacklogHandler),
                    BacklogConfig::Delegate {
                        target,
                        append_reason,
                    } => Arc::new(
                        DelegatingBacklogHandler::new(target.clone(), registry.clone())
                            .with_append_reason(*append_reason),
                    ),
                }
            })
            .collect();

        Self::new(handlers)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Handler type names in order
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn BacklogHandler>> {
        self.handlers.get(index)
    }

    pub fn push(&mut self, handler: Arc<dyn BacklogHandler>) {
        self.handlers.push(handler);
    }

    /// Insert at `index` (`index == len` appends)
    pub fn insert(&mut self, index: usize, handler: Arc<dyn BacklogHandler>) -> Result<()> {
        if index > self.handlers.len() {
            return Err(
                ConfigError::index_out_of_range("backlog handler", index, self.handlers.len()).into(),
            );
        }
        self.handlers.insert(index, handler);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Arc<dyn BacklogHandler>> {
        if index >= self.handlers.len() {
            return Err(
                ConfigError::index_out_of_range("backlog handler", index, self.handlers.len()).into(),
            );
        }
        Ok(self.handlers.remove(index))
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    /// Whether `instance` is currently marked down
    pub fn is_down(&self, instance: &str) -> bool {
        self.down.lock().contains(instance)
    }

    /// Mark `instance` down and notify every handler in order
    pub async fn down(&self, instance: &str, cause: &str) {
        self.down.lock().insert(instance.to_string());
        for handler in &self.handlers {
            handler.down(instance, cause).await;
        }
    }

    /// Notify every handler that `instance` is up, if it was down
    ///
    /// Returns whether a notification went out.
    pub async fn up(&self, instance: &str) -> bool {
        if !self.down.lock().remove(instance) {
            return false;
        }
        for handler in &self.handlers {
            handler.up(instance).await;
        }
        true
    }

    /// Give an undelivered message to every handler in order
    ///
    /// A handler failure does not stop the others. The first configuration
    /// error (e.g. self-delegation) is returned; other failures are logged.
    pub async fn log(
        &self,
        instance: &str,
        message: &SyslogMessage,
        reason: &str,
        route: &Route,
    ) -> Result<()> {
        let mut first_config_error = None;

        for handler in &self.handlers {
            if let Err(e) = handler.log(instance, message, reason, route).await {
                if e.is_config() {
                    if first_config_error.is_none() {
                        first_config_error = Some(e);
                    }
                } else {
                    tracing::warn!(
                        sender = %instance,
                        handler = handler.name(),
                        error = %e,
                        "backlog handler failed"
                    );
                }
            }
        }

        match first_config_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for BacklogChain {
    fn default() -> Self {
        Self::with_default()
    }
}

impl std::fmt::Debug for BacklogChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BacklogChain")
            .field("handlers", &self.names())
            .finish()
    }
}
