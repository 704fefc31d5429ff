//! Cooperative cancellation for searches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation handle passed along with every search.
///
/// Clones share the same flag, so a caller can keep one clone and cancel a
/// search running elsewhere. A context whose deadline has passed counts as
/// cancelled.
#[derive(Clone, Debug, Default)]
pub struct SearchContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl SearchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that cancels itself once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// A scan guard that consults this context every `interval` entries.
    pub fn checker(&self, interval: usize) -> CancelCheck<'_> {
        CancelCheck {
            ctx: self,
            interval: interval.max(1),
            seen: 0,
        }
    }
}

/// Amortised cancellation check for long scans.
pub struct CancelCheck<'a> {
    ctx: &'a SearchContext,
    interval: usize,
    seen: usize,
}

impl CancelCheck<'_> {
    /// Record one scanned entry; returns `true` once the search should stop.
    pub fn tick(&mut self) -> bool {
        self.seen += 1;
        self.seen % self.interval == 0 && self.ctx.is_cancelled()
    }

    pub fn scanned(&self) -> usize {
        self.seen
    }
}
