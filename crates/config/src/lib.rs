//! Syslane Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use syslane_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[senders.udp]\nkind = \"udp\"").unwrap();
//! assert!(config.senders.contains_key("udp"));
//! ```
//!
//! # Example Config
//!
//! ```toml
//! suppress_errors = false
//!
//! [log]
//! level = "info"
//!
//! [senders.udp]
//! kind = "udp"
//! host = "127.0.0.1"
//! modifiers = [{ type = "sequential", first = 1, last = 9999 }]
//!
//! [senders.tcp]
//! kind = "tcp"
//! backlog = [{ type = "delegate", target = "udp" }]
//!
//! [servers.tcp]
//! kind = "tcp"
//! port = 1514
//! max_active_sessions = 100
//! overflow = "reject"
//!
//! [multi.all]
//! protocols = ["tcp", "udp"]
//! ```

mod backlog;
mod error;
mod logging;
mod modifiers;
mod multi;
mod pool;
mod sender;
mod server;
mod settings;
mod transport;
mod validation;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use backlog::BacklogConfig;
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use modifiers::{
    HashAlgorithm, HashConfig, MacAlgorithm, MacConfig, MacKey, ModifierConfig, SequentialConfig,
    TextCase, TextCaseConfig,
};
pub use multi::MultiConfig;
pub use pool::PoolConfig;
pub use sender::SenderConfig;
pub use server::{OverflowPolicy, ServerConfig, TlsServerConfig};
pub use settings::InstanceSettings;
pub use transport::{
    DEFAULT_MAX_MESSAGE_LENGTH, DEFAULT_SPLIT_MARKER, DEFAULT_UNIX_PATH, SocketFamily, SocketType,
    TlsClientConfig, TransportConfig, TransportKind,
};
pub use validation::{validate_sender, validate_server};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Swallow aggregate delivery errors from multis
    /// Default: false
    pub suppress_errors: bool,

    /// Named senders
    pub senders: BTreeMap<String, SenderConfig>,

    /// Named servers
    pub servers: BTreeMap<String, ServerConfig>,

    /// Named broadcast groups over senders
    pub multi: BTreeMap<String, MultiConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Sender and multi names, sorted
    pub fn client_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .senders
            .keys()
            .chain(self.multi.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.log.level, LogLevel::Info);
        assert!(!config.suppress_errors);
        assert!(config.senders.is_empty());
        assert!(config.servers.is_empty());
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
suppress_errors = true

[log]
level = "debug"
format = "json"

[senders.udp]
kind = "udp"
host = "127.0.0.1"
port = 5514
modifiers = [{ type = "sequential", first = 1, last = 9999 }]
backlog = [{ type = "tracing" }, { type = "delegate", target = "tcp" }]

[senders.tcp]
kind = "tcp"
port = 1514

[senders.tcp.pool]
max_active = 2
max_wait = "250ms"

[servers.tcp]
kind = "tcp"
port = 1514
max_active_sessions = 100
overflow = "reject"

[multi.all]
protocols = ["tcp", "udp"]
"#;
        let config = Config::from_str(toml).unwrap();

        assert!(config.suppress_errors);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.senders["udp"].transport.port, 5514);
        assert_eq!(config.senders["udp"].modifiers.len(), 1);
        assert_eq!(config.senders["udp"].backlog.len(), 2);
        let pool = config.senders["tcp"].pool.as_ref().unwrap();
        assert_eq!(pool.max_wait, Duration::from_millis(250));
        assert_eq!(config.servers["tcp"].overflow, OverflowPolicy::Reject);
        assert_eq!(config.multi["all"].protocols(), ["tcp", "udp"]);
        assert_eq!(config.client_names(), vec!["all", "tcp", "udp"]);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_str("[senders.udp\nkind ="),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(Config::from_str("[senders.x]\nkind = \"carrier-pigeon\"").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[servers.udp]\nkind = \"udp\"\nport = 5514").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.servers["udp"].port, 5514);
    }

    #[test]
    fn test_from_missing_file() {
        let err = Config::from_file("/nonexistent/syslane.toml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
    }
}
