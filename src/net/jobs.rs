//! Deferred token-increment jobs.
//!
//! Increment requests that arrive while a firing pass is already running on
//! the same thread are buffered here and applied once the pass reaches its
//! fixed point, instead of re-entering the firing loop.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::net::ids::PlaceId;

/// FIFO buffer of pending place increments.
#[derive(Debug, Default)]
pub struct JobQueue {
    pending: Mutex<VecDeque<PlaceId>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, place: PlaceId) {
        self.guard().push_back(place);
    }

    /// Take everything queued so far, in arrival order.
    pub fn take(&self) -> Vec<PlaceId> {
        self.guard().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, VecDeque<PlaceId>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
