//! Syslane - Transform
//!
//! Modifier chain applied to every outbound message before it is rendered.
//!
//! # Overview
//!
//! Modifiers derive a new message from the previous one. They can:
//! - Number messages (sequential)
//! - Sign messages for tamper detection (hash, mac)
//! - Normalize text (text_case)
//!
//! # Architecture
//!
//! ```text
//! [SyslogMessage] → [Modifier 1] → [Modifier 2] → ... → [SyslogMessage']
//! ```
//!
//! Modifiers are chained together and applied in configured order. The
//! `Chain` struct handles sequencing, positional edits and error propagation.
//!
//! # Example
//!
//! ```
//! use syslane_config::{ModifierConfig, TextCaseConfig};
//! use syslane_protocol::{Facility, Severity, SyslogMessage};
//! use syslane_transform::Chain;
//!
//! let chain = Chain::from_configs(&[ModifierConfig::TextCase(TextCaseConfig::default())]).unwrap();
//! let message = SyslogMessage::new(Facility::User, Severity::Info, "hello");
//! assert_eq!(chain.apply(message).unwrap().body(), "HELLO");
//! ```

mod chain;
mod error;
pub mod hash;
pub mod mac;
pub mod sequential;
mod signature;
pub mod text;

pub use chain::Chain;
pub use error::TransformError;
pub use hash::HashModifier;
pub use mac::MacModifier;
pub use sequential::SequentialModifier;
pub use text::TextCaseModifier;

use syslane_config::ModifierConfig;
use syslane_protocol::SyslogMessage;

/// Result type for modifier operations
pub type TransformResult<T> = Result<T, TransformError>;

/// A single step of the message pipeline
///
/// Implementors must be `Send + Sync`: one chain is shared by every task
/// sending through a sender.
pub trait Modifier: Send + Sync {
    /// Derive the next message
    fn modify(&self, message: SyslogMessage) -> TransformResult<SyslogMessage>;

    /// Name of this modifier for logging and lookup
    fn name(&self) -> &'static str;

    /// Undo this modifier's change, returning the message it was given.
    ///
    /// `None` means the message was not produced by this modifier (or was
    /// tampered with). Modifiers that cannot be undone pass it through.
    fn strip(&self, message: &SyslogMessage) -> Option<SyslogMessage> {
        Some(message.clone())
    }

    /// Check a message this modifier produced
    fn verify(&self, message: &SyslogMessage) -> bool {
        self.strip(message).is_some()
    }
}

/// Build a modifier from its configuration
pub fn from_config(config: &ModifierConfig) -> TransformResult<Box<dyn Modifier>> {
    let modifier: Box<dyn Modifier> = match config {
        ModifierConfig::Sequential(seq) => Box::new(SequentialModifier::new(seq.clone())),
        ModifierConfig::Hash(hash) => Box::new(HashModifier::new(hash.clone())),
        ModifierConfig::Mac(mac) => Box::new(MacModifier::new(mac)?),
        ModifierConfig::TextCase(text) => Box::new(TextCaseModifier::new(text.case)),
    };
    Ok(modifier)
}
