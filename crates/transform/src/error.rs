//! Modifier chain errors

use thiserror::Error;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

#[derive(Debug, Error)]
pub enum TransformError {
    /// Insert or remove past the end of the chain
    #[error("modifier index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// A modifier could not be built from its configuration
    #[error("invalid modifier configuration: {0}")]
    Config(String),
}

impl TransformError {
    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
