//! Server counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one server
#[derive(Debug, Default)]
pub struct ServerMetrics {
    /// Sessions accepted
    pub sessions_opened: AtomicU64,

    /// Sessions finished
    pub sessions_closed: AtomicU64,

    /// Connections refused by admission control
    pub sessions_rejected: AtomicU64,

    /// Frames delivered to handlers
    pub frames_received: AtomicU64,

    /// Bytes in delivered frames
    pub bytes_received: AtomicU64,

    /// Frames dropped for exceeding `max_frame_size`
    pub frames_oversized: AtomicU64,

    /// Handler calls that failed or panicked
    pub handler_errors: AtomicU64,

    /// Accept, receive and handshake errors
    pub errors: AtomicU64,
}

impl ServerMetrics {
    pub const fn new() -> Self {
        Self {
            sessions_opened: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
            sessions_rejected: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            frames_oversized: AtomicU64::new(0),
            handler_errors: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn session_closed(&self) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn session_rejected(&self) {
        self.sessions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn frame_received(&self, bytes: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn frame_oversized(&self) {
        self.frames_oversized.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ServerMetricsSnapshot {
        let opened = self.sessions_opened.load(Ordering::Relaxed);
        let closed = self.sessions_closed.load(Ordering::Relaxed);
        ServerMetricsSnapshot {
            sessions_opened: opened,
            sessions_active: opened.saturating_sub(closed),
            sessions_rejected: self.sessions_rejected.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_oversized: self.frames_oversized.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ServerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerMetricsSnapshot {
    pub sessions_opened: u64,
    pub sessions_active: u64,
    pub sessions_rejected: u64,
    pub frames_received: u64,
    pub bytes_received: u64,
    pub frames_oversized: u64,
    pub handler_errors: u64,
    pub errors: u64,
}
