//! Fixed-width, sortable timestamps.
//!
//! Snapshot and diff folders are named after a [`Timestamp`]. The format is
//! zero-padded and fixed-width, so lexicographic order of folder names equals
//! chronological order.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Folder-name format: `YYYYMMDD_HHMMSS_mmm`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

/// A formatted timestamp suitable for use as a folder name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Format a timestamp from milliseconds since the epoch (interpreted as a
    /// naive wall-clock time).
    pub fn from_millis(millis: i64) -> Self {
        let naive = DateTime::from_timestamp_millis(millis)
            .map(|dt| dt.naive_utc())
            .unwrap_or_default();
        Self::from_naive(naive)
    }

    /// Format a timestamp from a naive date-time.
    pub fn from_naive(naive: NaiveDateTime) -> Self {
        Self(naive.format(TIMESTAMP_FORMAT).to_string())
    }

    /// Parse a folder name. Returns `None` if it is not a timestamp.
    pub fn parse(s: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
            .ok()
            .map(|_| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of folder timestamps.
pub trait Clock: Send + Sync {
    /// Produce the next timestamp.
    fn now(&self) -> Timestamp;
}

/// A clock shared between the store and its callers.
pub type SharedClock = Arc<dyn Clock>;

/// Wall-clock time in the local timezone.
///
/// Never returns the same timestamp twice: if the wall clock has not advanced
/// by a full millisecond (or went backwards), the previous value plus one
/// millisecond is returned instead.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Mutex<Option<i64>>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = Local::now().naive_local().and_utc().timestamp_millis();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let millis = match *last {
            Some(prev) if wall <= prev => prev + 1,
            _ => wall,
        };
        *last = Some(millis);
        Timestamp::from_millis(millis)
    }
}

/// Deterministic clock that advances by a fixed step on every call.
#[derive(Debug)]
pub struct StepClock {
    next: AtomicI64,
    step_millis: i64,
}

impl StepClock {
    /// Start at `start_millis` and advance by `step_millis` per call.
    pub fn new(start_millis: i64, step_millis: i64) -> Self {
        Self {
            next: AtomicI64::new(start_millis),
            step_millis,
        }
    }

    pub fn shared(start_millis: i64, step_millis: i64) -> SharedClock {
        Arc::new(Self::new(start_millis, step_millis))
    }
}

impl Default for StepClock {
    /// 2024-01-01 00:00:00, one second per call.
    fn default() -> Self {
        Self::new(1_704_067_200_000, 1_000)
    }
}

impl Clock for StepClock {
    fn now(&self) -> Timestamp {
        let millis = self.next.fetch_add(self.step_millis, Ordering::SeqCst);
        Timestamp::from_millis(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_fixed_width() {
        let early = Timestamp::from_millis(1_704_067_200_000);
        let late = Timestamp::from_millis(1_704_067_200_000 + 3_600_000 * 13 + 7);
        assert_eq!(early.as_str(), "20240101_000000_000");
        assert_eq!(late.as_str(), "20240101_130000_007");
        assert_eq!(early.as_str().len(), late.as_str().len());
        assert!(early < late);
    }

    #[test]
    fn test_timestamp_parse() {
        assert!(Timestamp::parse("20240101_130000_007").is_some());
        assert!(Timestamp::parse("snapshot").is_none());
        assert!(Timestamp::parse("20240101_130000").is_none());
    }

    #[test]
    fn test_system_clock_strictly_increasing() {
        let clock = SystemClock::new();
        let mut previous = clock.now();
        for _ in 0..50 {
            let next = clock.now();
            assert!(next > previous, "{} should sort after {}", next, previous);
            previous = next;
        }
    }

    #[test]
    fn test_step_clock() {
        let clock = StepClock::default();
        assert_eq!(clock.now().as_str(), "20240101_000000_000");
        assert_eq!(clock.now().as_str(), "20240101_000001_000");
    }
}
