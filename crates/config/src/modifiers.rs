//! Message modifier configuration
//!
//! Each entry in a sender's `modifiers` list is one step of the pipeline,
//! applied in the order written.
//!
//! # Example
//!
//! ```toml
//! [[senders.tcp.modifiers]]
//! type = "sequential"
//! first = 1
//! last = 999
//!
//! [[senders.tcp.modifiers]]
//! type = "mac"
//! algorithm = "hmac-sha256"
//! key = "00112233445566778899aabbccddeeff"
//! ```

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::{ConfigError, Result};

/// One configured pipeline step
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModifierConfig {
    /// Append a wrapping sequence number
    Sequential(SequentialConfig),
    /// Append a digest of the message
    Hash(HashConfig),
    /// Append a keyed MAC of the message
    Mac(MacConfig),
    /// Upper- or lower-case the message text
    TextCase(TextCaseConfig),
}

impl ModifierConfig {
    /// Modifier type name as written in config
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Sequential(_) => "sequential",
            Self::Hash(_) => "hash",
            Self::Mac(_) => "mac",
            Self::TextCase(_) => "text_case",
        }
    }

    /// Check values serde cannot
    pub fn validate(&self, owner: &str) -> Result<()> {
        match self {
            Self::Sequential(seq) if seq.first > seq.last => Err(ConfigError::invalid_value(
                "modifier",
                owner,
                "first",
                format!("first ({}) exceeds last ({})", seq.first, seq.last),
            )),
            Self::Mac(mac) if mac.key.is_empty() => {
                Err(ConfigError::missing_field("modifier", owner, "key"))
            }
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Sequential
// =============================================================================

/// Bounded counter appended to each message
///
/// `first ≤ last` always holds: [`set_first`](Self::set_first) and
/// [`set_last`](Self::set_last) ignore values that would break it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SequentialConfig {
    /// First value, and the value after wrapping
    /// Default: 0
    pub first: u64,

    /// Last value before wrapping
    /// Default: 9999
    pub last: u64,

    /// Pad to the width of `last`
    /// Default: true
    pub use_padding: bool,

    /// Padding character
    /// Default: '0'
    pub pad_char: char,
}

impl Default for SequentialConfig {
    fn default() -> Self {
        Self {
            first: 0,
            last: 9999,
            use_padding: true,
            pad_char: '0',
        }
    }
}

impl SequentialConfig {
    /// Set the lower bound; returns false (and changes nothing) if it would
    /// exceed `last`
    pub fn set_first(&mut self, first: u64) -> bool {
        if first > self.last {
            return false;
        }
        self.first = first;
        true
    }

    /// Set the upper bound; returns false (and changes nothing) if it would
    /// fall below `first`
    pub fn set_last(&mut self, last: u64) -> bool {
        if last < self.first {
            return false;
        }
        self.last = last;
        true
    }
}

// =============================================================================
// Hash
// =============================================================================

/// Digest algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum HashAlgorithm {
    /// SHA-1, 160-bit (default)
    #[default]
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "sha1" | "sha" | "sha160" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(ConfigError::invalid_value(
                "modifier",
                "hash",
                "algorithm",
                format!("unsupported digest '{s}'"),
            )),
        }
    }
}

impl TryFrom<String> for HashAlgorithm {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Digest modifier settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    /// Digest algorithm
    /// Default: SHA1
    pub algorithm: HashAlgorithm,

    /// Hash the ident together with the text
    /// Default: true
    pub include_ident: bool,

    /// Text placed before the encoded digest
    /// Default: " {"
    pub prefix: String,

    /// Text placed after the encoded digest
    /// Default: "}"
    pub suffix: String,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Sha1,
            include_ident: true,
            prefix: " {".into(),
            suffix: "}".into(),
        }
    }
}

// =============================================================================
// MAC
// =============================================================================

/// Keyed MAC algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum MacAlgorithm {
    HmacSha1,
    /// HMAC-SHA256 (default)
    #[default]
    HmacSha256,
    HmacSha512,
}

impl MacAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HmacSha1 => "HmacSHA1",
            Self::HmacSha256 => "HmacSHA256",
            Self::HmacSha512 => "HmacSHA512",
        }
    }
}

impl FromStr for MacAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "hmacsha1" => Ok(Self::HmacSha1),
            "hmacsha256" => Ok(Self::HmacSha256),
            "hmacsha512" => Ok(Self::HmacSha512),
            _ => Err(ConfigError::invalid_value(
                "modifier",
                "mac",
                "algorithm",
                format!("unsupported MAC '{s}'"),
            )),
        }
    }
}

impl TryFrom<String> for MacAlgorithm {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Opaque MAC key material, given as hex in config
///
/// Never printed.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct MacKey(Vec<u8>);

impl MacKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<String> for MacKey {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self> {
        hex::decode(value.trim())
            .map(Self)
            .map_err(|e| ConfigError::invalid_value("modifier", "mac", "key", e.to_string()))
    }
}

impl fmt::Debug for MacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacKey([redacted; {} bytes])", self.0.len())
    }
}

/// Keyed MAC modifier settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MacConfig {
    /// MAC algorithm
    /// Default: HmacSHA256
    pub algorithm: MacAlgorithm,

    /// Shared secret (hex)
    pub key: MacKey,

    /// MAC the ident together with the text
    /// Default: true
    pub include_ident: bool,

    /// Text placed before the encoded MAC
    /// Default: " {"
    pub prefix: String,

    /// Text placed after the encoded MAC
    /// Default: "}"
    pub suffix: String,
}

impl Default for MacConfig {
    fn default() -> Self {
        Self {
            algorithm: MacAlgorithm::HmacSha256,
            key: MacKey::default(),
            include_ident: true,
            prefix: " {".into(),
            suffix: "}".into(),
        }
    }
}

impl MacConfig {
    /// MAC settings with the given algorithm and key
    pub fn new(algorithm: MacAlgorithm, key: MacKey) -> Self {
        Self {
            algorithm,
            key,
            ..Self::default()
        }
    }
}

// =============================================================================
// Text case
// =============================================================================

/// Target case
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextCase {
    #[default]
    Upper,
    Lower,
}

/// Text-case modifier settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TextCaseConfig {
    /// Default: upper
    pub case: TextCase,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_bounds_are_guarded() {
        let mut config = SequentialConfig::default();
        assert!(config.set_first(500));
        assert!(config.set_last(1000));

        assert!(!config.set_last(499));
        assert_eq!(config.last, 1000);

        assert!(!config.set_first(1001));
        assert_eq!(config.first, 500);
    }

    #[test]
    fn test_sequential_defaults() {
        let config = SequentialConfig::default();
        assert!(config.use_padding);
        assert_eq!(config.pad_char, '0');
    }

    #[test]
    fn test_hash_algorithm_names() {
        assert_eq!(HashAlgorithm::default().as_str(), "SHA1");
        assert_eq!("SHA-256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_mac_algorithm_names() {
        assert_eq!("HmacSHA256".parse::<MacAlgorithm>().unwrap(), MacAlgorithm::HmacSha256);
        assert_eq!("hmac-sha1".parse::<MacAlgorithm>().unwrap(), MacAlgorithm::HmacSha1);
        assert!("HmacMD5".parse::<MacAlgorithm>().is_err());
    }

    #[test]
    fn test_mac_key_is_redacted() {
        let key = MacKey::new(vec![1, 2, 3]);
        let printed = format!("{key:?}");
        assert!(printed.contains("redacted"));
        assert!(!printed.contains("[1, 2, 3]"));
    }

    #[test]
    fn test_deserialize_tagged_list() {
        #[derive(Deserialize)]
        struct Wrapper {
            modifiers: Vec<ModifierConfig>,
        }

        let toml = r#"
[[modifiers]]
type = "sequential"
first = 1
last = 99

[[modifiers]]
type = "hash"
algorithm = "SHA256"

[[modifiers]]
type = "mac"
key = "000102"

[[modifiers]]
type = "text_case"
case = "lower"
"#;
        let wrapper: Wrapper = toml::from_str(toml).unwrap();
        let names: Vec<_> = wrapper.modifiers.iter().map(ModifierConfig::type_name).collect();
        assert_eq!(names, vec!["sequential", "hash", "mac", "text_case"]);

        match &wrapper.modifiers[2] {
            ModifierConfig::Mac(mac) => {
                assert_eq!(mac.key.as_bytes(), &[0, 1, 2]);
                assert_eq!(mac.algorithm, MacAlgorithm::HmacSha256);
            }
            other => panic!("unexpected modifier {other:?}"),
        }
    }

    #[test]
    fn test_validate_sequential_inverted() {
        let modifier = ModifierConfig::Sequential(SequentialConfig {
            first: 10,
            last: 5,
            ..SequentialConfig::default()
        });
        assert!(modifier.validate("udp").is_err());
    }

    #[test]
    fn test_validate_mac_requires_key() {
        let modifier = ModifierConfig::Mac(MacConfig::default());
        assert!(matches!(
            modifier.validate("udp"),
            Err(ConfigError::MissingField { field: "key", .. })
        ));
    }
}
