//! Deferred-send scheduler for Wildcard.
//!
//! Holds outbound items that should leave after a delay (for example, so a
//! card animation can start before the authority hears about the play).
//! The scheduler owns no task and no timer of its own: the owner awaits
//! [`SendScheduler::next_due`] inside its `tokio::select!` loop, so dropping
//! or clearing the scheduler is all it takes to cancel everything.
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* may call scheduler.schedule(..) */ }
//!         due = scheduler.next_due() => send(due.item),
//!     }
//! }
//! ```
//!
//! With nothing scheduled, `next_due` pends forever and `select!` keeps
//! serving its other branches.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

/// Handle to one scheduled item, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SendKey(u64);

impl fmt::Display for SendKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "send-{}", self.0)
    }
}

/// An item whose delay has elapsed, returned by [`SendScheduler::next_due`].
#[derive(Debug)]
pub struct Due<T> {
    pub key: SendKey,
    pub item: T,
    /// How far past its deadline the item was handed out.
    pub late_by: Duration,
}

#[derive(Debug)]
struct Pending<T> {
    key: SendKey,
    deadline: Instant,
    item: T,
}

/// Queue of outbound items, each released after its delay.
#[derive(Debug)]
pub struct SendScheduler<T> {
    delay: Duration,
    /// Sorted by deadline; ties keep insertion order.
    queue: VecDeque<Pending<T>>,
    next_key: u64,
}

impl<T> SendScheduler<T> {
    /// Creates a scheduler that holds each item for `delay`.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            queue: VecDeque::new(),
            next_key: 1,
        }
    }

    /// The delay applied by [`schedule`](Self::schedule).
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether scheduled items are due at once.
    pub fn is_immediate(&self) -> bool {
        self.delay.is_zero()
    }

    /// Schedules `item` after the delay.
    pub fn schedule(&mut self, item: T) -> SendKey {
        let key = SendKey(self.next_key);
        self.next_key += 1;
        let deadline = Instant::now() + self.delay;

        let at = self.queue.partition_point(|p| p.deadline <= deadline);
        self.queue.insert(at, Pending { key, deadline, item });

        trace!(%key, delay_ms = self.delay.as_millis() as u64, pending = self.queue.len(), "send scheduled");
        key
    }

    /// Waits for the earliest item to come due and removes it.
    ///
    /// Cancel safe: if the future is dropped before it resolves, the item
    /// stays queued.
    pub async fn next_due(&mut self) -> Due<T> {
        loop {
            let Some(deadline) = self.queue.front().map(|p| p.deadline) else {
                return std::future::pending().await;
            };

            time::sleep_until(deadline).await;

            if let Some(Pending { key, deadline, item }) = self.queue.pop_front() {
                return Due {
                    key,
                    item,
                    late_by: Instant::now().saturating_duration_since(deadline),
                };
            }
        }
    }

    /// Cancels one scheduled item, returning it if it was still pending.
    pub fn cancel(&mut self, key: SendKey) -> Option<T> {
        let at = self.queue.iter().position(|p| p.key == key)?;
        let pending = self.queue.remove(at)?;
        debug!(%key, "scheduled send cancelled");
        Some(pending.item)
    }

    /// Cancels everything, returning the items in deadline order.
    pub fn cancel_all(&mut self) -> Vec<T> {
        if !self.queue.is_empty() {
            debug!(count = self.queue.len(), "cancelling all scheduled sends");
        }
        self.queue.drain(..).map(|p| p.item).collect()
    }

    /// Number of items still waiting.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> Default for SendScheduler<T> {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}
