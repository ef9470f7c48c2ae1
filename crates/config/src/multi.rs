//! Multi (broadcast) instance configuration

use serde::Deserialize;

use crate::{ConfigError, Result};

/// Ordered list of instance names one message is fanned out to
///
/// # Example
///
/// ```toml
/// [multi.all]
/// protocols = ["tcp", "udp"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MultiConfig {
    /// Target instance names, attempted in this order
    pub protocols: Vec<String>,
}

impl MultiConfig {
    pub fn new<I, S>(protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            protocols: protocols.into_iter().map(Into::into).collect(),
        }
    }

    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }

    /// Append a target
    pub fn add_protocol(&mut self, name: impl Into<String>) {
        self.protocols.push(name.into());
    }

    /// Insert a target at `index` (≤ len)
    pub fn insert_protocol(&mut self, index: usize, name: impl Into<String>) -> Result<()> {
        if index > self.protocols.len() {
            return Err(ConfigError::index_out_of_range(
                "protocol",
                index,
                self.protocols.len(),
            ));
        }
        self.protocols.insert(index, name.into());
        Ok(())
    }

    /// Remove every occurrence of `name`; returns whether any was present
    pub fn remove_protocol(&mut self, name: &str) -> bool {
        let before = self.protocols.len();
        self.protocols.retain(|p| !p.eq_ignore_ascii_case(name));
        self.protocols.len() != before
    }

    pub fn clear_protocols(&mut self) {
        self.protocols.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_by_default() {
        assert!(MultiConfig::default().protocols().is_empty());
    }

    #[test]
    fn test_remove_and_reinsert_keeps_order() {
        let mut config = MultiConfig::new(["tcp", "udp", "unix"]);

        assert!(config.remove_protocol("udp"));
        assert_eq!(config.protocols(), ["tcp", "unix"]);

        config.insert_protocol(0, "udp").unwrap();
        assert_eq!(config.protocols(), ["udp", "tcp", "unix"]);
    }

    #[test]
    fn test_insert_out_of_range() {
        let mut config = MultiConfig::new(["tcp"]);
        assert!(matches!(
            config.insert_protocol(5, "udp"),
            Err(ConfigError::IndexOutOfRange { index: 5, len: 1, .. })
        ));
        config.insert_protocol(1, "udp").unwrap();
        assert_eq!(config.protocols(), ["tcp", "udp"]);
    }

    #[test]
    fn test_clear_and_add() {
        let mut config = MultiConfig::new(["tcp", "udp"]);
        config.clear_protocols();
        config.add_protocol("unix");
        assert_eq!(config.protocols(), ["unix"]);
    }
}
