//! Last-write-wins sequencing for render results.
//!
//! Each recomputation takes a [`Ticket`] before it snapshots state. When
//! the result arrives it is offered to a [`LatestSlot`], which keeps it only
//! if no newer ticket has already published. Completion order does not
//! matter; issue order does.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct UpdateSequencer {
    next: AtomicU64,
}

impl UpdateSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ticket newer than every ticket issued before it.
    pub fn issue(&self) -> Ticket {
        Ticket(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[derive(Debug)]
pub struct LatestSlot<T> {
    inner: Mutex<Option<(Ticket, T)>>,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        LatestSlot {
            inner: Mutex::new(None),
        }
    }
}

impl<T: Clone> LatestSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` unless a result with a newer ticket is already held.
    /// Returns whether it was stored.
    pub fn offer(&self, ticket: Ticket, value: T) -> bool {
        let mut slot = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some((held, _)) if *held > ticket => {
                log::debug!(
                    "[AQM] sequence: discarding stale result {} (holding {})",
                    ticket.value(),
                    held.value()
                );
                false
            }
            _ => {
                *slot = Some((ticket, value));
                true
            }
        }
    }

    pub fn latest(&self) -> Option<T> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, value)| value.clone())
    }

    pub fn ticket(&self) -> Option<Ticket> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(ticket, _)| *ticket)
    }
}
