//! Tracing subscriber setup
//!
//! Level comes from `--log-level`, then the `[log]` table, then `info`.
//! `RUST_LOG`-style directives are accepted in either place.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use syslane_config::{LogConfig, LogFormat, LogOutput};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber
pub fn init(config: &LogConfig, cli_level: Option<&str>) -> Result<()> {
    let filter = build_filter(config, cli_level)?;

    let layer = match &config.output {
        LogOutput::Stdout => format_layer(config.format, std::io::stdout),
        LogOutput::Stderr => format_layer(config.format, std::io::stderr),
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {path}"))?;
            format_layer(config.format, Mutex::new(file))
        }
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(())
}

/// CLI flag > config file > "info"
fn build_filter(config: &LogConfig, cli_level: Option<&str>) -> Result<EnvFilter> {
    let level = cli_level.unwrap_or(config.level.as_str());
    EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {e}"))
}

fn format_layer<W>(format: LogFormat, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Console => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(writer)
            .boxed(),
    }
}
