//! Datagram fragmentation
//!
//! A message longer than the datagram limit is cut into marker-wrapped
//! fragments:
//!
//! ```text
//! first:  chunk + END
//! middle: BEGIN + chunk + END
//! last:   BEGIN + chunk
//! ```
//!
//! Every fragment is at most `max_len` bytes. The receiving side keeps one
//! pending buffer per peer and joins fragments back together before the
//! message is parsed. Anything that does not fit the pattern is handed back
//! unchanged.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Result, TransportError};

#[cfg(test)]
#[path = "fragment_test.rs"]
mod tests;

// =============================================================================
// Sending side
// =============================================================================

/// Splits oversized payloads into marker-wrapped fragments
#[derive(Debug, Clone)]
pub struct Fragmenter {
    max_len: usize,
    begin: Bytes,
    end: Bytes,
}

impl Fragmenter {
    /// Create a fragmenter
    ///
    /// # Errors
    ///
    /// Fails when the markers leave no room for payload in a middle fragment.
    pub fn new(max_len: usize, begin: &[u8], end: &[u8]) -> Result<Self> {
        if max_len <= begin.len() + end.len() {
            return Err(TransportError::config(format!(
                "max message length {max_len} leaves no room between split markers ({} + {} bytes)",
                begin.len(),
                end.len()
            )));
        }

        Ok(Self {
            max_len,
            begin: Bytes::copy_from_slice(begin),
            end: Bytes::copy_from_slice(end),
        })
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Split a payload; payloads within the limit come back as one datagram
    pub fn split(&self, payload: &[u8]) -> Vec<Bytes> {
        if payload.len() <= self.max_len {
            return vec![Bytes::copy_from_slice(payload)];
        }

        let mut fragments = Vec::new();

        let first = self.max_len - self.end.len();
        fragments.push(self.wrap(&[], &payload[..first], &self.end));
        let mut rest = &payload[first..];

        let middle = self.max_len - self.begin.len() - self.end.len();
        while self.begin.len() + rest.len() > self.max_len {
            fragments.push(self.wrap(&self.begin, &rest[..middle], &self.end));
            rest = &rest[middle..];
        }
        fragments.push(self.wrap(&self.begin, rest, &[]));

        fragments
    }

    fn wrap(&self, prefix: &[u8], chunk: &[u8], suffix: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(prefix.len() + chunk.len() + suffix.len());
        buf.put_slice(prefix);
        buf.put_slice(chunk);
        buf.put_slice(suffix);
        buf.freeze()
    }
}

// =============================================================================
// Receiving side
// =============================================================================

struct Pending {
    joined: BytesMut,
    raw: BytesMut,
    updated: Instant,
}

/// Joins fragments per peer
///
/// `push` returns the complete messages a datagram produced: usually zero
/// (fragment held) or one, two when a dangling buffer is flushed ahead of a
/// fresh datagram.
pub struct Reassembler<K> {
    begin: Bytes,
    end: Bytes,
    max_size: usize,
    pending: HashMap<K, Pending>,
}

impl<K: Hash + Eq + Clone> Reassembler<K> {
    /// Create a reassembler; `max_size` bounds one joined message
    pub fn new(begin: &[u8], end: &[u8], max_size: usize) -> Self {
        Self {
            begin: Bytes::copy_from_slice(begin),
            end: Bytes::copy_from_slice(end),
            max_size,
            pending: HashMap::new(),
        }
    }

    /// Peers with a partial message buffered
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Feed one datagram from `peer`
    pub fn push(&mut self, peer: &K, datagram: &[u8]) -> Vec<Bytes> {
        let mut out = Vec::new();
        let now = Instant::now();

        let continues = self.has_begin(datagram);

        if let Some(mut pending) = self.pending.remove(peer) {
            if !continues {
                // Abandoned: surface what we had verbatim, then treat this
                // datagram as fresh.
                out.push(pending.raw.freeze());
            } else {
                let body = &datagram[self.begin.len()..];
                let more = self.has_end(body);
                let body = if more {
                    &body[..body.len() - self.end.len()]
                } else {
                    body
                };

                pending.raw.extend_from_slice(datagram);
                pending.joined.extend_from_slice(body);
                pending.updated = now;

                if pending.joined.len() > self.max_size {
                    tracing::debug!(
                        size = pending.joined.len(),
                        max_size = self.max_size,
                        "reassembly overflow, passing fragments through"
                    );
                    out.push(pending.raw.freeze());
                } else if more {
                    self.pending.insert(peer.clone(), pending);
                } else {
                    out.push(pending.joined.freeze());
                }
                return out;
            }
        }

        if continues {
            // Continuation with nothing to continue
            out.push(Bytes::copy_from_slice(datagram));
        } else if self.has_end(datagram) {
            let body = &datagram[..datagram.len() - self.end.len()];
            self.pending.insert(
                peer.clone(),
                Pending {
                    joined: BytesMut::from(body),
                    raw: BytesMut::from(datagram),
                    updated: now,
                },
            );
        } else {
            out.push(Bytes::copy_from_slice(datagram));
        }

        out
    }

    /// Give up on buffers not extended for `max_age`, returning each key
    /// with its raw fragments
    pub fn expire(&mut self, max_age: Duration) -> Vec<(K, Bytes)> {
        let now = Instant::now();
        let stale: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| now.duration_since(p.updated) >= max_age)
            .map(|(k, _)| k.clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|k| self.pending.remove(&k).map(|p| (k, p.raw.freeze())))
            .collect()
    }

    /// Drain every partial buffer, raw
    pub fn drain(&mut self) -> Vec<(K, Bytes)> {
        self.pending.drain().map(|(k, p)| (k, p.raw.freeze())).collect()
    }

    fn has_begin(&self, data: &[u8]) -> bool {
        !self.begin.is_empty() && data.len() > self.begin.len() && data.starts_with(&self.begin)
    }

    fn has_end(&self, data: &[u8]) -> bool {
        !self.end.is_empty() && data.len() > self.end.len() && data.ends_with(&self.end)
    }
}
