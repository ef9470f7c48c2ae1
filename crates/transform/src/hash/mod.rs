//! Hash modifier - appends a digest for tamper detection
//!
//! The digest covers the ident (optional) and the message text, and is
//! appended base64-encoded between the configured prefix and suffix.

use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use syslane_config::{HashAlgorithm, HashConfig};
use syslane_protocol::SyslogMessage;

use crate::signature;
use crate::{Modifier, TransformResult};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Appends an unkeyed digest
#[derive(Debug, Clone)]
pub struct HashModifier {
    config: HashConfig,
}

impl HashModifier {
    pub fn new(config: HashConfig) -> Self {
        Self { config }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.config.algorithm
    }

    /// Raw digest of `text` in the context of `message`
    pub fn digest(&self, message: &SyslogMessage, text: &str) -> Vec<u8> {
        let parts = signature::signed_input(message, text, self.config.include_ident);
        match self.config.algorithm {
            HashAlgorithm::Sha1 => digest_parts::<Sha1>(&parts),
            HashAlgorithm::Sha256 => digest_parts::<Sha256>(&parts),
            HashAlgorithm::Sha384 => digest_parts::<Sha384>(&parts),
            HashAlgorithm::Sha512 => digest_parts::<Sha512>(&parts),
        }
    }
}

fn digest_parts<D: Digest>(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = D::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

impl Modifier for HashModifier {
    fn modify(&self, message: SyslogMessage) -> TransformResult<SyslogMessage> {
        let digest = self.digest(&message, message.body());
        let body = signature::append(
            message.body(),
            &self.config.prefix,
            &digest,
            &self.config.suffix,
        );
        Ok(message.with_body(body))
    }

    fn name(&self) -> &'static str {
        "hash"
    }

    fn strip(&self, message: &SyslogMessage) -> Option<SyslogMessage> {
        let (text, claimed) =
            signature::split(message.body(), &self.config.prefix, &self.config.suffix)?;
        if self.digest(message, text) != claimed {
            return None;
        }
        Some(message.clone().with_body(text.to_string()))
    }
}
