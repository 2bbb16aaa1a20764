//! Time source abstraction so voting windows can be driven in tests.

use crate::types::Timestamp;
use chrono::{Duration, Utc};
use std::fmt::Debug;
use std::sync::RwLock;

/// A source of the current time
pub trait Clock: Send + Sync + Debug {
    /// The current instant
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by `chrono::Utc::now`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<Timestamp>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }

    /// Jump to an absolute instant
    pub fn set(&self, to: Timestamp) {
        let mut now = self.now.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
