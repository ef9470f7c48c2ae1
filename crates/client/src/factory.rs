//! Building targets from configuration
//!
//! The transport behind each sender is picked by its `kind` (see
//! `syslane_transport::open`); multis are registered after every sender.

use std::sync::Arc;

use syslane_config::{Config, SenderConfig};

use crate::{MultiDispatcher, Result, Sender, TargetRegistry};

/// Open a sender and register it under `name`
///
/// # Errors
///
/// Invalid configuration, a transport that cannot be opened, or a name that
/// is already registered.
pub async fn create_sender(
    name: &str,
    config: &SenderConfig,
    registry: &Arc<TargetRegistry>,
) -> Result<Arc<Sender>> {
    if registry.exists(name) {
        return Err(syslane_protocol::RegistryError::Duplicate {
            name: name.trim().to_lowercase(),
        }
        .into());
    }

    let sender = Arc::new(Sender::open(name, config.clone(), &Arc::downgrade(registry)).await?);
    registry.register(name, sender.clone())?;
    Ok(sender)
}

/// Build a registry holding every sender and multi in `config`
pub async fn build_registry(config: &Config) -> Result<Arc<TargetRegistry>> {
    let registry = Arc::new(TargetRegistry::new());
    registry.set_suppress_errors(config.suppress_errors);

    for (name, sender) in &config.senders {
        if let Err(e) = create_sender(name, sender, &registry).await {
            shutdown_registry(&registry).await;
            return Err(e);
        }
    }

    for (name, multi) in &config.multi {
        let dispatcher = MultiDispatcher::new(name, multi.clone(), Arc::downgrade(&registry));
        if let Err(e) = registry.register(name, Arc::new(dispatcher)) {
            shutdown_registry(&registry).await;
            return Err(e.into());
        }
    }

    tracing::info!(targets = ?registry.names(), "client targets registered");
    Ok(registry)
}

/// Unregister and shut down every target
pub async fn shutdown_registry(registry: &TargetRegistry) {
    for (name, target) in registry.drain() {
        tracing::debug!(target_name = %name, "shutting down target");
        target.shutdown().await;
    }
}
