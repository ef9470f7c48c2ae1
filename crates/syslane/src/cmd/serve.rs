//! Serve command - run the configured syslog servers
//!
//! Every `[servers.*]` entry is started with the tracing event handler, which
//! logs each received message. Ctrl+C or SIGTERM stops them all.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use syslane_config::Config;
use syslane_server::{EventHandler, TracingEventHandler, build_servers, shutdown_all, start_all};
use tokio::signal;
use tracing::info;

/// Serve command arguments
#[derive(Args, Debug)]
pub struct ServeArgs {}

/// Run the serve command
pub async fn run(_args: ServeArgs, config: Option<Config>) -> Result<()> {
    let config = config.context("serve needs --config with at least one [servers.*] entry")?;
    if config.servers.is_empty() {
        anyhow::bail!("no servers configured");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        servers = config.servers.len(),
        "syslane starting"
    );

    let handlers: Vec<Arc<dyn EventHandler>> = vec![Arc::new(TracingEventHandler)];
    let servers = build_servers(&config, &handlers).context("failed to create servers")?;
    start_all(&servers).await.context("failed to start servers")?;

    for name in servers.names() {
        if let Some(server) = servers.get(&name) {
            let address = server
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|| server.config().bind_address());
            info!(server = %name, kind = %server.config().kind, address = %address, "listening");
        }
    }

    wait_for_shutdown().await?;
    info!("shutdown signal received, stopping servers");

    shutdown_all(&servers).await;
    info!("syslane shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?;
        tokio::select! {
            result = signal::ctrl_c() => result.context("failed to install Ctrl+C handler")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    signal::ctrl_c()
        .await
        .context("failed to install Ctrl+C handler")?;

    Ok(())
}
