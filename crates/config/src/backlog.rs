//! Backlog handler configuration
//!
//! Backlog handlers are told when a sender goes down or comes back, and
//! receive every message that could not be delivered.

use serde::Deserialize;

/// One configured backlog handler
///
/// An empty list means the default: a single `tracing` handler.
///
/// # Example
///
/// ```toml
/// [[senders.tcp.backlog]]
/// type = "delegate"
/// target = "udp"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BacklogConfig {
    /// Log failures through `tracing`
    Tracing,
    /// Drop failures silently
    Null,
    /// Resend failed messages through another named instance
    Delegate {
        /// Registered sender or multi to resend through
        target: String,
        /// Append the failure reason to the resent text
        #[serde(default)]
        append_reason: bool,
    },
}

impl BacklogConfig {
    /// Delegating handler with no reason suffix
    pub fn delegate(target: impl Into<String>) -> Self {
        Self::Delegate {
            target: target.into(),
            append_reason: false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Tracing => "tracing",
            Self::Null => "null",
            Self::Delegate { .. } => "delegate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            backlog: Vec<BacklogConfig>,
        }

        let toml = r#"
backlog = [
    { type = "tracing" },
    { type = "null" },
    { type = "delegate", target = "udp", append_reason = true },
]
"#;
        let wrapper: Wrapper = toml::from_str(toml).unwrap();
        assert_eq!(wrapper.backlog[0], BacklogConfig::Tracing);
        assert_eq!(wrapper.backlog[1], BacklogConfig::Null);
        assert_eq!(
            wrapper.backlog[2],
            BacklogConfig::Delegate {
                target: "udp".into(),
                append_reason: true
            }
        );
    }
}
