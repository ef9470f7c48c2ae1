//! Modifier Chain - Sequential message transformation
//!
//! The `Chain` applies modifiers in configured order, each receiving the
//! output of the previous one.
//!
//! # Design
//!
//! - **Empty is a no-op**: the message is returned untouched
//! - **Order is significant**: positional edits never reorder other entries
//! - **Fail-fast**: the first error stops the chain
//! - **Strict edits**: inserting or removing past the end is an error, never
//!   a clamp

use syslane_config::ModifierConfig;
use syslane_protocol::SyslogMessage;

use crate::{Modifier, TransformError, TransformResult, from_config};

#[cfg(test)]
#[path = "chain_test.rs"]
mod tests;

/// Ordered list of modifiers
#[derive(Default)]
pub struct Chain {
    modifiers: Vec<Box<dyn Modifier>>,
}

impl Chain {
    /// Create a chain from modifiers in order
    pub fn new(modifiers: Vec<Box<dyn Modifier>>) -> Self {
        Self { modifiers }
    }

    /// Create an empty chain (no-op)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a chain from configuration, preserving order
    pub fn from_configs(configs: &[ModifierConfig]) -> TransformResult<Self> {
        let modifiers = configs
            .iter()
            .map(from_config)
            .collect::<TransformResult<Vec<_>>>()?;
        Ok(Self::new(modifiers))
    }

    /// Get the number of modifiers
    #[inline]
    pub fn len(&self) -> usize {
        self.modifiers.len()
    }

    /// Check if the chain is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    /// Get the names of all modifiers, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.modifiers.iter().map(|m| m.name()).collect()
    }

    /// Get the first modifier with this name
    pub fn get(&self, name: &str) -> Option<&dyn Modifier> {
        self.modifiers
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    /// Append a modifier
    pub fn push(&mut self, modifier: Box<dyn Modifier>) {
        self.modifiers.push(modifier);
    }

    /// Insert a modifier at `index` (≤ len)
    pub fn insert(&mut self, index: usize, modifier: Box<dyn Modifier>) -> TransformResult<()> {
        if index > self.modifiers.len() {
            return Err(TransformError::index_out_of_range(index, self.modifiers.len()));
        }
        self.modifiers.insert(index, modifier);
        Ok(())
    }

    /// Remove and return the modifier at `index` (< len)
    pub fn remove(&mut self, index: usize) -> TransformResult<Box<dyn Modifier>> {
        if index >= self.modifiers.len() {
            return Err(TransformError::index_out_of_range(index, self.modifiers.len()));
        }
        Ok(self.modifiers.remove(index))
    }

    /// Remove every modifier
    pub fn clear(&mut self) {
        self.modifiers.clear();
    }

    /// Run a message through every modifier in order
    pub fn apply(&self, message: SyslogMessage) -> TransformResult<SyslogMessage> {
        self.modifiers
            .iter()
            .try_fold(message, |current, modifier| modifier.modify(current))
    }

    /// Verify a message against every modifier
    ///
    /// Steps are peeled off last applied first, so each modifier checks the
    /// body it actually produced.
    pub fn verify(&self, message: &SyslogMessage) -> bool {
        let mut current = message.clone();
        for modifier in self.modifiers.iter().rev() {
            match modifier.strip(&current) {
                Some(previous) => current = previous,
                None => return false,
            }
        }
        true
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain").field("modifiers", &self.names()).finish()
    }
}
