//! Building servers from configuration

use std::sync::Arc;

use syslane_config::{Config, ServerConfig};
use syslane_protocol::Registry;

use crate::{EventHandler, Result, ServerDispatcher};

/// Registry of named servers
pub type ServerRegistry = Registry<ServerDispatcher>;

/// Create a stopped server and register it under `name`
pub fn create_server(
    name: &str,
    config: &ServerConfig,
    registry: &ServerRegistry,
) -> Result<Arc<ServerDispatcher>> {
    let server = Arc::new(ServerDispatcher::new(name, config.clone())?);
    registry.register(name, Arc::clone(&server))?;
    Ok(server)
}

/// Register every configured server, each with `handlers` in order
pub fn build_servers(
    config: &Config,
    handlers: &[Arc<dyn EventHandler>],
) -> Result<Arc<ServerRegistry>> {
    let registry = Arc::new(ServerRegistry::new());

    for (name, server) in &config.servers {
        let server = create_server(name, server, &registry)?;
        for handler in handlers {
            server.add_handler(Arc::clone(handler));
        }
    }

    Ok(registry)
}

/// Start every registered server
///
/// On failure the servers already started are shut down again.
pub async fn start_all(registry: &ServerRegistry) -> Result<()> {
    let mut started: Vec<Arc<ServerDispatcher>> = Vec::new();

    for name in registry.names() {
        let Some(server) = registry.get(&name) else {
            continue;
        };
        if let Err(e) = server.start().await {
            tracing::error!(server = %name, error = %e, "server failed to start");
            for server in started {
                server.shutdown().await;
            }
            return Err(e);
        }
        started.push(server);
    }

    Ok(())
}

/// Unregister and shut down every server
pub async fn shutdown_all(registry: &ServerRegistry) {
    for (_, server) in registry.drain() {
        server.shutdown().await;
    }
}
