//! Session admission control
//!
//! `max_active_sessions` permits bound concurrent sessions. Under
//! [`OverflowPolicy::Reject`] a connection arriving while every permit is
//! held is closed without being read. Under [`OverflowPolicy::Block`] the
//! accept loop waits for a permit before accepting, for at most
//! `block_timeout`; the connection accepted after a timed-out wait is then
//! handled as under `Reject`.

use std::sync::Arc;
use std::time::Duration;

use syslane_config::OverflowPolicy;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Held by a session for its lifetime
#[derive(Debug)]
pub struct SessionPermit {
    _permit: Option<OwnedSemaphorePermit>,
}

/// Permit source for one server
#[derive(Debug, Clone)]
pub struct Admission {
    semaphore: Option<Arc<Semaphore>>,
    policy: OverflowPolicy,
    block_timeout: Duration,
}

impl Admission {
    /// `max_sessions` 0 admits everything
    pub fn new(max_sessions: usize, policy: OverflowPolicy, block_timeout: Duration) -> Self {
        Self {
            semaphore: (max_sessions > 0).then(|| Arc::new(Semaphore::new(max_sessions))),
            policy,
            block_timeout,
        }
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Whether the accept loop should wait for a permit before accepting
    pub fn waits_before_accept(&self) -> bool {
        self.semaphore.is_some() && self.policy == OverflowPolicy::Block
    }

    /// Free permits; `None` when unbounded
    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }

    /// Take a permit according to the policy; `None` means reject
    pub async fn acquire(&self) -> Option<SessionPermit> {
        let Some(semaphore) = &self.semaphore else {
            return Some(SessionPermit { _permit: None });
        };

        let permit = match self.policy {
            OverflowPolicy::Reject => Arc::clone(semaphore).try_acquire_owned().ok(),
            OverflowPolicy::Block => {
                match tokio::time::timeout(
                    self.block_timeout,
                    Arc::clone(semaphore).acquire_owned(),
                )
                .await
                {
                    Ok(Ok(permit)) => Some(permit),
                    Ok(Err(_)) => None,
                    Err(_) => {
                        tracing::warn!(
                            waited = ?self.block_timeout,
                            "session limit still reached after block timeout"
                        );
                        None
                    }
                }
            }
        };

        permit.map(|p| SessionPermit { _permit: Some(p) })
    }
}
