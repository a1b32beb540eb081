//! Single-slot handoff between the poll loop and metric scrapes.
//!
//! The poll loop publishes a fresh stats map every interval while scrapes
//! arrive whenever Prometheus decides. Neither side may wait on the other,
//! so the channel holds at most one value and the newest publish always
//! wins: an unconsumed value is evicted, never the incoming one.
//!
//! # Thread Safety
//!
//! Insert, evict, and take all happen inside one [`Mutex`] critical section.
//! The lock is held only for an `Option` swap and is taken from synchronous
//! code (the Prometheus collector callback), so it is a `std` mutex rather
//! than an async one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::stats::PoolStatsMap;

/// Bounded, overwrite-on-full channel of capacity one.
///
/// Delivery is at most once per published value: the first
/// [`try_consume`](Self::try_consume) after a publish takes the value and
/// later calls see `None` until the next publish.
#[derive(Debug)]
pub struct StatsChannel<T = Arc<PoolStatsMap>> {
    slot: Mutex<Option<T>>,
}

impl<T> Default for StatsChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StatsChannel<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Stores `value`, discarding any value nobody consumed yet.
    ///
    /// Returns `true` if an unconsumed value was evicted.
    pub fn publish(&self, value: T) -> bool {
        self.lock().replace(value).is_some()
    }

    /// Takes the held value, if any.
    pub fn try_consume(&self) -> Option<T> {
        self.lock().take()
    }

    /// Number of values waiting to be consumed (0 or 1).
    pub fn depth(&self) -> usize {
        usize::from(self.lock().is_some())
    }

    // Every critical section leaves the slot either empty or holding a
    // complete value, so a panic elsewhere cannot corrupt it.
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
