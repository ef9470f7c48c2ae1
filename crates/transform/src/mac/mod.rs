//! MAC modifier - appends a keyed HMAC
//!
//! Same framing as the hash modifier, but forging a signature requires the
//! shared key. The keyed state is built once and cloned per message.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use syslane_config::{MacAlgorithm, MacConfig};
use syslane_protocol::SyslogMessage;

use crate::signature;
use crate::{Modifier, TransformError, TransformResult};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

#[derive(Clone)]
enum Keyed {
    Sha1(Hmac<Sha1>),
    Sha256(Hmac<Sha256>),
    Sha512(Hmac<Sha512>),
}

/// Appends a keyed MAC
#[derive(Clone)]
pub struct MacModifier {
    keyed: Keyed,
    algorithm: MacAlgorithm,
    include_ident: bool,
    prefix: String,
    suffix: String,
}

impl MacModifier {
    /// Key the MAC. An empty key is a configuration error.
    pub fn new(config: &MacConfig) -> TransformResult<Self> {
        let key = config.key.as_bytes();
        if key.is_empty() {
            return Err(TransformError::config("mac key is empty"));
        }
        let invalid = |e: hmac::digest::InvalidLength| TransformError::config(e.to_string());
        let keyed = match config.algorithm {
            MacAlgorithm::HmacSha1 => Keyed::Sha1(Hmac::new_from_slice(key).map_err(invalid)?),
            MacAlgorithm::HmacSha256 => {
                Keyed::Sha256(Hmac::new_from_slice(key).map_err(invalid)?)
            }
            MacAlgorithm::HmacSha512 => {
                Keyed::Sha512(Hmac::new_from_slice(key).map_err(invalid)?)
            }
        };
        Ok(Self {
            keyed,
            algorithm: config.algorithm,
            include_ident: config.include_ident,
            prefix: config.prefix.clone(),
            suffix: config.suffix.clone(),
        })
    }

    pub fn algorithm(&self) -> MacAlgorithm {
        self.algorithm
    }

    /// Raw MAC of `text` in the context of `message`
    pub fn sign(&self, message: &SyslogMessage, text: &str) -> Vec<u8> {
        let parts = signature::signed_input(message, text, self.include_ident);
        match &self.keyed {
            Keyed::Sha1(mac) => mac_parts(mac.clone(), &parts).finalize().into_bytes().to_vec(),
            Keyed::Sha256(mac) => mac_parts(mac.clone(), &parts).finalize().into_bytes().to_vec(),
            Keyed::Sha512(mac) => mac_parts(mac.clone(), &parts).finalize().into_bytes().to_vec(),
        }
    }

    fn check(&self, message: &SyslogMessage, text: &str, claimed: &[u8]) -> bool {
        let parts = signature::signed_input(message, text, self.include_ident);
        // verify_slice compares in constant time
        match &self.keyed {
            Keyed::Sha1(mac) => mac_parts(mac.clone(), &parts).verify_slice(claimed).is_ok(),
            Keyed::Sha256(mac) => mac_parts(mac.clone(), &parts).verify_slice(claimed).is_ok(),
            Keyed::Sha512(mac) => mac_parts(mac.clone(), &parts).verify_slice(claimed).is_ok(),
        }
    }
}

fn mac_parts<M: Mac>(mut mac: M, parts: &[&[u8]]) -> M {
    for part in parts {
        mac.update(part);
    }
    mac
}

impl Modifier for MacModifier {
    fn modify(&self, message: SyslogMessage) -> TransformResult<SyslogMessage> {
        let tag = self.sign(&message, message.body());
        let body = signature::append(message.body(), &self.prefix, &tag, &self.suffix);
        Ok(message.with_body(body))
    }

    fn name(&self) -> &'static str {
        "mac"
    }

    fn strip(&self, message: &SyslogMessage) -> Option<SyslogMessage> {
        let (text, claimed) = signature::split(message.body(), &self.prefix, &self.suffix)?;
        if !self.check(message, text, &claimed) {
            return None;
        }
        Some(message.clone().with_body(text.to_string()))
    }
}

impl std::fmt::Debug for MacModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacModifier")
            .field("algorithm", &self.algorithm)
            .field("include_ident", &self.include_ident)
            .finish_non_exhaustive()
    }
}
