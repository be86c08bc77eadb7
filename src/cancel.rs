//! Cooperative cancellation
//!
//! A [`CancelToken`] is handed to every operation that can block or loop.
//! Cancellation is level triggered: once requested the token stays cancelled
//! and every clone observes it. A short reason can be recorded alongside the
//! request; the first reason wins so the most specific failure message is the
//! one that reaches the host application.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Cloneable cancellation handle shared across sync stages.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
    poll_interval: Duration,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    reason: OnceLock<String>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    /// Token whose async wait checks the flag at the given interval.
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                reason: OnceLock::new(),
            }),
            poll_interval,
        }
    }

    /// Request cancellation without recording a reason.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    /// Request cancellation and record a reason. The first reason wins;
    /// later calls still cancel but their message is dropped.
    pub fn cancel_with_reason(&self, reason: impl Into<String>) {
        let _ = self.inner.reason.set(reason.into());
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Reason recorded by the first `cancel_with_reason` call, if any.
    pub fn reason(&self) -> Option<String> {
        self.inner.reason.get().cloned()
    }

    /// Resolve once cancellation has been requested.
    ///
    /// The flag is polled rather than notified so cancellation set from
    /// synchronous code on another thread is still observed within one poll
    /// interval. The first check happens immediately.
    pub async fn cancelled(&self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;
            if self.is_cancelled() {
                return;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
