//! syslane - syslog delivery and reception engine
//!
//! # Usage
//!
//! ```bash
//! # Run the configured servers until Ctrl+C
//! syslane serve --config syslane.toml
//!
//! # Send one message through a configured sender or multi
//! syslane send --config syslane.toml --target all "disk almost full"
//!
//! # Send one message without a config file
//! syslane send --protocol tcp --host 10.0.0.5 --port 1514 --severity warning "hello"
//! ```

mod cmd;
mod logging;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use syslane_config::Config;

/// syslane - syslog delivery and reception engine
#[derive(Parser, Debug)]
#[command(name = "syslane")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the configured syslog servers
    Serve(cmd::serve::ServeArgs),

    /// Send one message and exit
    Send(cmd::send::SendArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let log = config.as_ref().map(|c| c.log.clone()).unwrap_or_default();
    logging::init(&log, cli.log_level.as_deref())?;

    match cli.command {
        Command::Serve(args) => cmd::serve::run(args, config).await,
        Command::Send(args) => cmd::send::run(args, config).await,
    }
}

/// Load the configuration file if one was given
///
/// An explicit path that does not exist is an error.
fn load_config(path: Option<&Path>) -> Result<Option<Config>> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.exists() {
        anyhow::bail!("config file not found: {}", path.display());
    }
    let config = Config::from_file(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    Ok(Some(config))
}
