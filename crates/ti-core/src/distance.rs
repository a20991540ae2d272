//! Timestamps and the distance between them.

use std::time::{Duration, Instant, SystemTime};

use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone};

/// A totally ordered instant that can measure how far it is from another.
///
/// The indices never look inside a timestamp beyond ordering, equality and
/// [`abs_distance`](Timestamp::abs_distance).
pub trait Timestamp: Ord {
    /// Magnitude of the gap between two timestamps.
    type Distance: Ord;

    /// Returns the non-negative distance between `self` and `other`.
    fn abs_distance(&self, other: &Self) -> Self::Distance;

    /// Converts a configured tolerance in milliseconds into a distance.
    fn tolerance_from_millis(ms: u32) -> Self::Distance;
}

/// Returns the distance between `a` and `b` regardless of their order.
pub fn absolute_distance<T: Timestamp>(a: &T, b: &T) -> T::Distance {
    a.abs_distance(b)
}

impl<Tz: TimeZone> Timestamp for DateTime<Tz> {
    type Distance = TimeDelta;

    fn abs_distance(&self, other: &Self) -> TimeDelta {
        if other < self {
            self.clone() - other.clone()
        } else {
            other.clone() - self.clone()
        }
    }

    fn tolerance_from_millis(ms: u32) -> TimeDelta {
        TimeDelta::milliseconds(i64::from(ms))
    }
}

impl Timestamp for NaiveDateTime {
    type Distance = TimeDelta;

    fn abs_distance(&self, other: &Self) -> TimeDelta {
        if other < self {
            *self - *other
        } else {
            *other - *self
        }
    }

    fn tolerance_from_millis(ms: u32) -> TimeDelta {
        TimeDelta::milliseconds(i64::from(ms))
    }
}

impl Timestamp for SystemTime {
    type Distance = Duration;

    fn abs_distance(&self, other: &Self) -> Duration {
        // `duration_since` fails exactly when `other` is later, and the error
        // carries the reverse distance.
        self.duration_since(*other)
            .unwrap_or_else(|err| err.duration())
    }

    fn tolerance_from_millis(ms: u32) -> Duration {
        Duration::from_millis(u64::from(ms))
    }
}

impl Timestamp for Instant {
    type Distance = Duration;

    fn abs_distance(&self, other: &Self) -> Duration {
        if other < self {
            *self - *other
        } else {
            *other - *self
        }
    }

    fn tolerance_from_millis(ms: u32) -> Duration {
        Duration::from_millis(u64::from(ms))
    }
}

// Raw integer timestamps are taken to be epoch milliseconds.
impl Timestamp for i64 {
    type Distance = u64;

    fn abs_distance(&self, other: &Self) -> u64 {
        self.abs_diff(*other)
    }

    fn tolerance_from_millis(ms: u32) -> u64 {
        u64::from(ms)
    }
}

impl Timestamp for u64 {
    type Distance = u64;

    fn abs_distance(&self, other: &Self) -> u64 {
        self.abs_diff(*other)
    }

    fn tolerance_from_millis(ms: u32) -> u64 {
        u64::from(ms)
    }
}
