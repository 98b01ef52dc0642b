//! Retry schedules: ordered wait durations governing delivery attempts.
//!
//! The schedule's length is the total number of attempts for one delivery.
//! The wait at index `i` is applied only after attempt `i` fails *and*
//! another attempt remains, so a schedule of length N produces at most N
//! attempts separated by the waits at indices `0..=N-2`. The first entry's
//! wait is therefore only used when a second attempt exists; an empty
//! schedule means no attempt is made at all.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ordered sequence of non-negative waits between delivery attempts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetrySchedule {
    waits: Vec<Duration>,
}

impl RetrySchedule {
    /// Creates a schedule from explicit wait durations.
    pub fn new(waits: impl Into<Vec<Duration>>) -> Self {
        Self { waits: waits.into() }
    }

    /// Creates a schedule from whole seconds, the caller-facing contract of
    /// the original log target configuration.
    pub fn from_secs(secs: &[u64]) -> Self {
        Self { waits: secs.iter().map(|&s| Duration::from_secs(s)).collect() }
    }

    /// Creates a schedule from whole milliseconds.
    pub fn from_millis(millis: &[u64]) -> Self {
        Self { waits: millis.iter().map(|&ms| Duration::from_millis(ms)).collect() }
    }

    /// Creates a schedule of `attempts` attempts all separated by `wait`.
    pub fn fixed(attempts: usize, wait: Duration) -> Self {
        Self { waits: vec![wait; attempts] }
    }

    /// The empty schedule: zero attempts, no network call.
    pub fn none() -> Self {
        Self::default()
    }

    /// Total number of attempts this schedule allows.
    pub fn attempts(&self) -> usize {
        self.waits.len()
    }

    /// Returns true when the schedule allows no attempts.
    pub fn is_empty(&self) -> bool {
        self.waits.is_empty()
    }

    /// Wait to apply after attempt `index` (0-based) fails, or `None` when
    /// no further attempt remains.
    pub fn wait_after(&self, index: usize) -> Option<Duration> {
        if index + 1 < self.waits.len() {
            self.waits.get(index).copied()
        } else {
            None
        }
    }

    /// Iterates over the configured waits in order.
    pub fn iter(&self) -> impl Iterator<Item = Duration> + '_ {
        self.waits.iter().copied()
    }
}

impl From<Vec<Duration>> for RetrySchedule {
    fn from(waits: Vec<Duration>) -> Self {
        Self::new(waits)
    }
}
