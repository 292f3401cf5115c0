//! Timestamp type and clock abstraction.
//!
//! Timestamps are Unix epoch seconds (UTC) as reported by the server. They are
//! used for display, sorting and banner expiry only, never for deciding the
//! outcome of a challenge.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    ///
    /// A clock set before the Unix epoch reads as [`Timestamp::EPOCH`].
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Whether this timestamp + duration has passed relative to `now`.
    pub fn has_expired(&self, duration_secs: u64, now: Timestamp) -> bool {
        now.0 >= self.0.saturating_add(duration_secs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Source of "now" for components that stamp local decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_saturates_when_now_is_earlier() {
        let t = Timestamp::new(100);
        assert_eq!(t.elapsed_since(Timestamp::new(40)), 0);
        assert_eq!(t.elapsed_since(Timestamp::new(160)), 60);
    }

    #[test]
    fn has_expired_is_inclusive() {
        let t = Timestamp::new(1_000);
        assert!(!t.has_expired(5, Timestamp::new(1_004)));
        assert!(t.has_expired(5, Timestamp::new(1_005)));
        assert!(t.has_expired(u64::MAX, Timestamp::new(u64::MAX)));
    }

    #[test]
    fn serializes_as_bare_seconds() {
        let json = serde_json::to_string(&Timestamp::new(1_700_000_000)).unwrap();
        assert_eq!(json, "1700000000");
        let back: Timestamp = serde_json::from_str("42").unwrap();
        assert_eq!(back, Timestamp::new(42));
    }
}
