//! Transport counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every transport
#[derive(Debug, Default)]
pub struct TransportMetrics {
    /// Messages written successfully
    pub messages_sent: AtomicU64,

    /// Bytes put on the wire, framing included
    pub bytes_sent: AtomicU64,

    /// Datagrams produced by splitting oversized messages
    pub fragments_sent: AtomicU64,

    /// Failed writes
    pub write_errors: AtomicU64,

    /// Connections opened
    pub connects: AtomicU64,
}

impl TransportMetrics {
    pub const fn new() -> Self {
        Self {
            messages_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            fragments_sent: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            connects: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_fragments(&self, count: usize) {
        self.fragments_sent
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TransportMetricsSnapshot {
        TransportMetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            fragments_sent: self.fragments_sent.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`TransportMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportMetricsSnapshot {
    pub messages_sent: u64,
    pub bytes_sent: u64,
    pub fragments_sent: u64,
    pub write_errors: u64,
    pub connects: u64,
}

/// Connection pool counters
#[derive(Debug, Default)]
pub struct PoolMetrics {
    pub created: AtomicU64,
    pub destroyed: AtomicU64,
    pub borrowed: AtomicU64,
    pub returned: AtomicU64,
    pub exhausted: AtomicU64,
}

impl PoolMetrics {
    pub const fn new() -> Self {
        Self {
            created: AtomicU64::new(0),
            destroyed: AtomicU64::new(0),
            borrowed: AtomicU64::new(0),
            returned: AtomicU64::new(0),
            exhausted: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_destroyed(&self, count: usize) {
        self.destroyed.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_borrowed(&self) {
        self.borrowed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_returned(&self) {
        self.returned.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            created: self.created.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            borrowed: self.borrowed.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PoolMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolMetricsSnapshot {
    pub created: u64,
    pub destroyed: u64,
    pub borrowed: u64,
    pub returned: u64,
    pub exhausted: u64,
}
