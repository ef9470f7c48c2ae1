//! Connection pool for stream transports
//!
//! # Admission
//!
//! `max_active` permits gate how many connections are checked out at once.
//! `acquire` waits up to `max_wait` for a permit, then fails with
//! [`TransportError::PoolExhausted`]. A `max_active` of zero removes the
//! bound.
//!
//! # Idle connections
//!
//! Returned connections go to the back of the idle queue and `acquire` takes
//! from the back, so the front holds the longest-idle ones. The eviction
//! sweep walks from the front:
//!
//! - idle longer than `min_evictable_idle_time`: closed
//! - idle longer than `soft_min_evictable_idle_time`: closed if at least
//!   `min_idle` others stay
//! - otherwise, with `test_while_idle`, probed and closed if dead
//!
//! then opens connections until `min_idle` are idle again.
//!
//! Liveness probes peek at the socket; see [`Connection::is_alive`].

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;
use syslane_config::PoolConfig;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::{Connection, Dialer, PoolMetrics, PoolMetricsSnapshot, Result, TransportError};

#[cfg(test)]
#[path = "pool_test.rs"]
mod tests;

struct IdleConnection {
    conn: Connection,
    since: Instant,
}

/// Outcome of one eviction sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Idle connections looked at
    pub examined: usize,
    /// Closed for exceeding `min_evictable_idle_time`
    pub evicted: usize,
    /// Closed for exceeding `soft_min_evictable_idle_time`
    pub soft_evicted: usize,
    /// Closed after failing the idle probe
    pub failed_probe: usize,
}

impl EvictionReport {
    pub fn closed(&self) -> usize {
        self.evicted + self.soft_evicted + self.failed_probe
    }
}

struct PoolInner {
    name: String,
    config: PoolConfig,
    dialer: Dialer,
    idle: Mutex<VecDeque<IdleConnection>>,
    permits: Option<Arc<Semaphore>>,
    closed: AtomicBool,
    cancel: CancellationToken,
    metrics: PoolMetrics,
}

/// Bounded pool of stream connections to one target
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Create a pool
    ///
    /// When called inside a tokio runtime and `eviction_run_interval` is
    /// non-zero, the background sweep starts immediately.
    pub fn new(name: impl Into<String>, dialer: Dialer, config: PoolConfig) -> Self {
        let permits = (config.max_active > 0).then(|| Arc::new(Semaphore::new(config.max_active)));

        let pool = Self {
            inner: Arc::new(PoolInner {
                name: name.into(),
                config,
                dialer,
                idle: Mutex::new(VecDeque::new()),
                permits,
                closed: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                metrics: PoolMetrics::new(),
            }),
        };

        if !pool.inner.config.eviction_run_interval.is_zero()
            && tokio::runtime::Handle::try_current().is_ok()
        {
            spawn_evictor(Arc::downgrade(&pool.inner), pool.inner.cancel.clone());
        }

        pool
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Borrow a connection, opening one if none is idle
    ///
    /// # Errors
    ///
    /// [`TransportError::PoolExhausted`] when no permit frees within
    /// `max_wait`, [`TransportError::PoolClosed`] after `close`, or the dial
    /// error when a new connection cannot be opened.
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::Acquire) {
            return Err(TransportError::PoolClosed);
        }

        let permit = match &inner.permits {
            Some(sem) => match timeout(inner.config.max_wait, sem.clone().acquire_owned()).await {
                Ok(Ok(permit)) => Some(permit),
                Ok(Err(_)) => return Err(TransportError::PoolClosed),
                Err(_) => {
                    inner.metrics.record_exhausted();
                    tracing::warn!(
                        pool = %inner.name,
                        max_active = inner.config.max_active,
                        waited_ms = inner.config.max_wait.as_millis() as u64,
                        "connection pool exhausted"
                    );
                    return Err(TransportError::PoolExhausted {
                        waited: inner.config.max_wait,
                    });
                }
            },
            None => None,
        };

        let conn = match inner.take_idle() {
            Some(conn) => conn,
            None => {
                let conn = inner.dialer.dial().await?;
                inner.metrics.record_created();
                conn
            }
        };

        inner.metrics.record_borrowed();
        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(inner),
            _permit: permit,
        })
    }

    /// Run one eviction sweep now
    pub fn evict_sweep(&self) -> EvictionReport {
        self.inner.evict_sweep()
    }

    /// Open connections until `min_idle` are idle; returns how many opened
    pub async fn ensure_min_idle(&self) -> usize {
        self.inner.ensure_min_idle().await
    }

    /// Close every idle connection without closing the pool
    pub fn clear_idle(&self) -> usize {
        let drained: Vec<IdleConnection> = self.inner.idle.lock().drain(..).collect();
        let count = drained.len();
        self.inner.metrics.record_destroyed(count);
        count
    }

    pub fn idle_count(&self) -> usize {
        self.inner.idle.lock().len()
    }

    /// Connections currently checked out (only tracked when bounded)
    pub fn active_count(&self) -> Option<usize> {
        self.inner
            .permits
            .as_ref()
            .map(|sem| self.inner.config.max_active - sem.available_permits())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Close the pool
    ///
    /// Stops the sweep, fails pending and future `acquire` calls, and closes
    /// idle connections. Borrowed connections are closed when returned.
    pub async fn close(&self) {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        inner.cancel.cancel();
        if let Some(sem) = &inner.permits {
            sem.close();
        }

        let drained: Vec<IdleConnection> = inner.idle.lock().drain(..).collect();
        let count = drained.len();
        for mut idle in drained {
            idle.conn.shutdown().await;
        }
        inner.metrics.record_destroyed(count);

        tracing::debug!(pool = %inner.name, closed = count, "connection pool closed");
    }

    pub fn metrics(&self) -> PoolMetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.inner.cancel.cancel();
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("name", &self.inner.name)
            .field("idle", &self.idle_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl PoolInner {
    fn take_idle(&self) -> Option<Connection> {
        loop {
            let entry = self.idle.lock().pop_back()?;
            if self.config.test_on_borrow && !entry.conn.is_alive() {
                tracing::debug!(pool = %self.name, "discarding dead connection on borrow");
                self.metrics.record_destroyed(1);
                continue;
            }
            return Some(entry.conn);
        }
    }

    fn release(&self, conn: Connection) {
        if self.closed.load(Ordering::Acquire) {
            self.metrics.record_destroyed(1);
            return;
        }

        if self.config.test_on_return && !conn.is_alive() {
            tracing::debug!(pool = %self.name, "discarding dead connection on return");
            self.metrics.record_destroyed(1);
            return;
        }

        self.idle.lock().push_back(IdleConnection {
            conn,
            since: Instant::now(),
        });
        self.metrics.record_returned();
    }

    fn evict_sweep(&self) -> EvictionReport {
        let config = &self.config;
        let now = Instant::now();
        let mut report = EvictionReport::default();
        let mut closed = Vec::new();

        {
            let mut idle = self.idle.lock();
            let total = idle.len();
            let budget = match config.num_tests_per_eviction_run {
                0 => total,
                n => n.min(total),
            };

            let mut kept = Vec::with_capacity(budget);
            for _ in 0..budget {
                let Some(entry) = idle.pop_front() else {
                    break;
                };
                report.examined += 1;

                let idle_for = now.saturating_duration_since(entry.since);
                let others = idle.len() + kept.len();

                if !config.min_evictable_idle_time.is_zero()
                    && idle_for > config.min_evictable_idle_time
                {
                    report.evicted += 1;
                    closed.push(entry);
                } else if !config.soft_min_evictable_idle_time.is_zero()
                    && idle_for > config.soft_min_evictable_idle_time
                    && others >= config.min_idle
                {
                    report.soft_evicted += 1;
                    closed.push(entry);
                } else if config.test_while_idle && !entry.conn.is_alive() {
                    report.failed_probe += 1;
                    closed.push(entry);
                } else {
                    kept.push(entry);
                }
            }

            // Survivors keep their place at the front
            for entry in kept.into_iter().rev() {
                idle.push_front(entry);
            }
        }

        self.metrics.record_destroyed(closed.len());
        drop(closed);

        if report.closed() > 0 {
            tracing::debug!(
                pool = %self.name,
                examined = report.examined,
                evicted = report.evicted,
                soft_evicted = report.soft_evicted,
                failed_probe = report.failed_probe,
                "eviction sweep"
            );
        }

        report
    }

    async fn ensure_min_idle(&self) -> usize {
        let mut opened = 0;

        loop {
            if self.closed.load(Ordering::Acquire) {
                break;
            }

            let idle = self.idle.lock().len();
            if idle >= self.config.min_idle {
                break;
            }
            if let Some(sem) = &self.permits {
                let active = self.config.max_active - sem.available_permits();
                if active + idle >= self.config.max_active {
                    break;
                }
            }

            match self.dialer.dial().await {
                Ok(conn) => {
                    self.metrics.record_created();
                    self.idle.lock().push_back(IdleConnection {
                        conn,
                        since: Instant::now(),
                    });
                    opened += 1;
                }
                Err(e) => {
                    tracing::debug!(pool = %self.name, error = %e, "failed to refill idle connections");
                    break;
                }
            }
        }

        opened
    }
}

fn spawn_evictor(pool: Weak<PoolInner>, cancel: CancellationToken) {
    tokio::spawn(async move {
        let Some(interval) = pool.upgrade().map(|p| p.config.eviction_run_interval) else {
            return;
        };

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let Some(inner) = pool.upgrade() else {
                break;
            };
            inner.evict_sweep();
            inner.ensure_min_idle().await;
        }
    });
}

/// A borrowed connection; goes back to the pool when dropped
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: Option<OwnedSemaphorePermit>,
}

impl PooledConnection {
    /// Write one framed message
    pub async fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        match self.conn.as_mut() {
            Some(conn) => conn.write_frame(frame).await,
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection invalidated",
            )),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.conn.as_ref().is_some_and(Connection::is_alive)
    }

    /// Destroy instead of returning to the pool
    pub fn invalidate(mut self) {
        if self.conn.take().is_some() {
            self.pool.metrics.record_destroyed(1);
        }
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("pool", &self.pool.name)
            .field("conn", &self.conn)
            .finish()
    }
}
