//! Wall-clock budget for one retrieval call.
//!
//! Cooperative, not preemptive: the budget gates entry into each unit of
//! work and caps the timeout of each network call at the time remaining.
//! In-flight calls that outlive the budget are abandoned by their timeout,
//! not forcibly aborted. Built on `tokio::time` so paused-time tests drive
//! it deterministically.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// The deadline shared by every stage of one call.
pub struct Budget {
    started: Instant,
    limit: Duration,
    hit: AtomicBool,
}

impl Budget {
    /// Start the clock with a millisecond ceiling.
    pub fn start(budget_ms: u64) -> Self {
        Self {
            started: Instant::now(),
            limit: Duration::from_millis(budget_ms),
            hit: AtomicBool::new(false),
        }
    }

    /// Elapsed time since the call started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Elapsed whole milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Time left before the deadline; zero once exhausted.
    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed())
    }

    /// Gate entry into one unit of work. Returns `false` and records the
    /// budget hit when no time remains.
    pub fn admit(&self) -> bool {
        if self.remaining().is_zero() {
            self.hit.store(true, Ordering::SeqCst);
            false
        } else {
            true
        }
    }

    /// Record that a stage was skipped or truncated.
    pub fn mark_hit(&self) {
        self.hit.store(true, Ordering::SeqCst);
    }

    /// Whether any stage ran out of budget.
    pub fn hit(&self) -> bool {
        self.hit.load(Ordering::SeqCst)
    }

    /// Run a future bounded by the remaining budget. `None` on timeout,
    /// which also records the budget hit.
    pub async fn bound<F>(&self, fut: F) -> Option<F::Output>
    where
        F: Future,
    {
        let remaining = self.remaining();
        if remaining.is_zero() {
            self.hit.store(true, Ordering::SeqCst);
            return None;
        }
        match tokio::time::timeout(remaining, fut).await {
            Ok(out) => Some(out),
            Err(_) => {
                self.hit.store(true, Ordering::SeqCst);
                None
            }
        }
    }
}
