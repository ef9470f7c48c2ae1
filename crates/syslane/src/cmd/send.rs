//! Send command - deliver one message and exit
//!
//! With `--config` and `--target`, the message goes through a configured
//! sender or multi (modifiers and backlog handlers included). Without a
//! config, a one-off sender is built from the command-line options.
//!
//! # Usage
//!
//! ```bash
//! syslane send --protocol udp --port 514 "hello"
//! syslane send --config syslane.toml --target tcp --severity err "disk full"
//! ```

use std::path::PathBuf;
use std::sync::Weak;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use syslane_client::{LogTarget, Sender, build_registry, shutdown_registry};
use syslane_config::{Config, InstanceSettings, SenderConfig, SocketType, TransportConfig};
use syslane_protocol::{Facility, MessageFormat, Severity, SyslogMessage};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 514;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Protocol {
    Udp,
    Tcp,
    Tls,
    Unix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Bsd,
    Rfc5424,
}

impl From<Format> for MessageFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Bsd => Self::Bsd,
            Format::Rfc5424 => Self::Rfc5424,
        }
    }
}

/// Per-instance overrides, applied on top of the configured sender
#[derive(Args, Debug)]
pub struct InstanceArgs {
    /// Destination host
    #[arg(long)]
    pub host: Option<String>,

    /// Destination port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Facility name or code (user, local0, 16, ...)
    #[arg(short, long)]
    pub facility: Option<Facility>,

    /// Ident (BSD tag, RFC 5424 APP-NAME)
    #[arg(short, long)]
    pub ident: Option<String>,
}

impl InstanceArgs {
    /// Apply every given override; kinds that cannot take one reject it
    fn apply<T: InstanceSettings>(&self, settings: &mut T) -> syslane_config::Result<()> {
        if let Some(host) = &self.host {
            settings.set_host(host)?;
        }
        if let Some(port) = self.port {
            settings.set_port(port)?;
        }
        if let Some(facility) = self.facility {
            settings.set_facility(facility)?;
        }
        if let Some(ident) = &self.ident {
            settings.set_ident(ident)?;
        }
        Ok(())
    }
}

/// Send command arguments
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Configured sender or multi to send through (requires --config)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Transport for a one-off sender
    #[arg(long, value_enum, default_value_t = Protocol::Udp)]
    pub protocol: Protocol,

    /// Socket path for --protocol unix
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Unix socket type (stream or dgram)
    #[arg(long, default_value = "dgram")]
    pub socket_type: SocketType,

    /// Severity name or code
    #[arg(short, long, default_value = "info")]
    pub severity: Severity,

    /// Wire format
    #[arg(long, value_enum)]
    pub format: Option<Format>,

    #[command(flatten)]
    pub instance: InstanceArgs,

    /// Message text (words are joined with spaces)
    #[arg(required = true, num_args = 1..)]
    pub message: Vec<String>,
}

/// Run the send command
pub async fn run(args: SendArgs, config: Option<Config>) -> Result<()> {
    let text = args.message.join(" ");

    match (args.target.as_deref(), config) {
        (Some(target), Some(config)) => send_configured(&args, config, target, text).await,
        (Some(_), None) => anyhow::bail!("--target needs --config"),
        (None, _) => send_adhoc(&args, text).await,
    }
}

async fn send_configured(args: &SendArgs, mut config: Config, target: &str, text: String) -> Result<()> {
    let mut facility = Facility::User;

    if let Some(sender) = find_mut(&mut config.senders, target) {
        args.instance.apply(sender)?;
        if let Some(format) = args.format {
            sender.format = format.into();
        }
        facility = sender.facility;
    } else if let Some(multi) = find_mut(&mut config.multi, target) {
        args.instance.apply(multi)?;
    }
    config.validate().context("invalid overrides")?;

    let registry = build_registry(&config).await?;
    let result = match registry.lookup(target) {
        Ok(instance) => instance
            .send(SyslogMessage::new(facility, args.severity, text))
            .await
            .with_context(|| format!("send through {target} failed")),
        Err(e) => Err(e.into()),
    };
    shutdown_registry(&registry).await;
    result
}

async fn send_adhoc(args: &SendArgs, text: String) -> Result<()> {
    let config = adhoc_config(args)?;
    let facility = config.facility;
    let sender = Sender::open("send", config, &Weak::new()).await?;

    let result = sender
        .send(SyslogMessage::new(facility, args.severity, text))
        .await
        .context("send failed");
    sender.shutdown().await;
    result
}

/// One-off sender from the command line
fn adhoc_config(args: &SendArgs) -> Result<SenderConfig> {
    let host = || args.instance.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = args.instance.port.unwrap_or(DEFAULT_PORT);

    let transport = match args.protocol {
        Protocol::Udp => TransportConfig::udp(host(), port),
        Protocol::Tcp => TransportConfig::tcp(host(), port),
        Protocol::Tls => TransportConfig::tls(host(), port),
        Protocol::Unix => {
            if args.instance.host.is_some() || args.instance.port.is_some() {
                anyhow::bail!("--host and --port do not apply to unix sockets");
            }
            let path = args.path.clone().context("--protocol unix needs --path")?;
            TransportConfig::unix(path, args.socket_type)
        }
    };

    let mut config = SenderConfig::new(transport)
        .with_format(args.format.map(Into::into).unwrap_or_default());
    if let Some(facility) = args.instance.facility {
        config.set_facility(facility)?;
    }
    if let Some(ident) = &args.instance.ident {
        config.set_ident(ident)?;
    }
    Ok(config)
}

/// Case-insensitive lookup, matching how the registry binds names
fn find_mut<'a, T>(
    entries: &'a mut std::collections::BTreeMap<String, T>,
    name: &str,
) -> Option<&'a mut T> {
    let wanted = name.trim().to_lowercase();
    entries
        .iter_mut()
        .find(|(key, _)| key.trim().to_lowercase() == wanted)
        .map(|(_, value)| value)
}

#[cfg(test)]
#[path = "send_test.rs"]
mod tests;
