//! In-memory retry queue for events whose send failed
//!
//! ## State machine
//!
//! ```text
//!            reachable signal (queue non-empty)
//!   ┌──────┐ ─────────────────────────────────▶ ┌──────────┐
//!   │ idle │                                    │ draining │
//!   └──────┘ ◀───────────────────────────────── └──────────┘
//!              queue empty / first failure /
//!              cancellation
//! ```
//!
//! Appending a failed event never starts a drain; only a reachability signal
//! does. A drain pass sends the oldest event first and stops at the first
//! failure, putting that event back at the tail. The rest of the queue waits
//! for the next signal.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::EventRecord;

/// FIFO of failed events plus the single-drain flag
#[derive(Debug, Default)]
pub struct RetryQueue {
    events: Mutex<VecDeque<EventRecord>>,
    draining: AtomicBool,
}

/// Result of one drain pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainOutcome {
    /// Events delivered and removed
    pub sent: usize,
    /// Events removed because they can never be delivered
    pub dropped: usize,
    /// Whether the pass stopped on a retryable failure
    pub halted: bool,
}

/// Marks a drain pass as running; clears the flag when dropped
#[derive(Debug)]
pub struct DrainGuard<'a> {
    queue: &'a RetryQueue,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.queue.draining.store(false, Ordering::Release);
    }
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failed event at the tail
    pub fn push(&self, record: EventRecord) {
        let mut events = self.lock();
        events.push_back(record);
        tracing::debug!(pending = events.len(), "Queued event for retry");
    }

    pub fn pop_front(&self) -> Option<EventRecord> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the queued events, oldest first
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.lock().iter().cloned().collect()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Claim the drain flag. Returns `None` if a pass is already running.
    pub fn try_begin_drain(&self) -> Option<DrainGuard<'_>> {
        self.draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard { queue: self })
    }

    /// Run one drain pass with `send`.
    ///
    /// The caller must hold the [`DrainGuard`]. Retryable failures put the
    /// event back at the tail and end the pass; non-retryable ones drop the
    /// event and continue. On cancellation the in-flight event goes back to
    /// the head so nothing is lost.
    pub async fn drain<F, Fut>(
        &self,
        _guard: &DrainGuard<'_>,
        cancel: &CancellationToken,
        mut send: F,
    ) -> DrainOutcome
    where
        F: FnMut(EventRecord) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut outcome = DrainOutcome::default();

        while let Some(record) = self.pop_front() {
            let result = tokio::select! {
                result = send(record.clone()) => result,
                _ = cancel.cancelled() => {
                    self.lock().push_front(record);
                    break;
                }
            };

            match result {
                Ok(()) => outcome.sent += 1,
                Err(e) if e.is_retryable() => {
                    tracing::debug!(
                        event_code = %record.event_code,
                        error = %e,
                        "Retry failed, halting drain pass"
                    );
                    self.push(record);
                    outcome.halted = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        event_code = %record.event_code,
                        error = %e,
                        "Dropping queued event that cannot be delivered"
                    );
                    outcome.dropped += 1;
                }
            }
        }

        outcome
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<EventRecord>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
