//! Shared framing for modifiers that append integrity data
//!
//! A signed body is `TEXT PREFIX BASE64 SUFFIX`. The signed input is the
//! ident (when included) followed by the unsigned text.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use syslane_protocol::SyslogMessage;

/// Bytes covered by a signature
pub(crate) fn signed_input<'a>(
    message: &'a SyslogMessage,
    text: &'a str,
    include_ident: bool,
) -> [&'a [u8]; 2] {
    let ident = if include_ident {
        message.ident().unwrap_or_default()
    } else {
        ""
    };
    [ident.as_bytes(), text.as_bytes()]
}

/// Append an encoded signature to `text`
pub(crate) fn append(text: &str, prefix: &str, raw: &[u8], suffix: &str) -> String {
    let encoded = STANDARD.encode(raw);
    let mut out = String::with_capacity(text.len() + prefix.len() + encoded.len() + suffix.len());
    out.push_str(text);
    out.push_str(prefix);
    out.push_str(&encoded);
    out.push_str(suffix);
    out
}

/// Split a signed body into `(text, raw signature)`
pub(crate) fn split<'a>(body: &'a str, prefix: &str, suffix: &str) -> Option<(&'a str, Vec<u8>)> {
    let without_suffix = body.strip_suffix(suffix)?;
    let at = without_suffix.rfind(prefix)?;
    let encoded = &without_suffix[at + prefix.len()..];
    let raw = STANDARD.decode(encoded).ok()?;
    Some((&without_suffix[..at], raw))
}
