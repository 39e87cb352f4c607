//! Last-writer-wins register.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A value paired with the instant it was last written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampedValue<T> {
    pub value: T,
    pub timestamp: DateTime<Utc>,
}

impl<T: Clone> TimestampedValue<T> {
    /// Stamped with the current time.
    pub fn new(value: T) -> Self {
        Self {
            value,
            timestamp: Utc::now(),
        }
    }

    pub fn at(value: T, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }

    /// Replace the value and move the timestamp forward.
    ///
    /// The new stamp is strictly greater than the old one even when the
    /// wall clock has not advanced (or went backwards).
    pub fn update(&mut self, value: T) {
        self.update_at(value, Utc::now());
    }

    pub fn update_at(&mut self, value: T, now: DateTime<Utc>) {
        let floor = self.timestamp + Duration::microseconds(1);
        self.value = value;
        self.timestamp = now.max(floor);
    }

}

impl<T: Clone + Serialize> TimestampedValue<T> {
    /// Keep whichever side was written last.
    ///
    /// Exact ties go to the side whose JSON encoding sorts higher, so both
    /// devices resolve a tie to the same value whichever one merges.
    pub fn merge(&self, other: &Self) -> Self {
        match other.timestamp.cmp(&self.timestamp) {
            Ordering::Greater => other.clone(),
            Ordering::Less => self.clone(),
            Ordering::Equal if encoded(&other.value) > encoded(&self.value) => other.clone(),
            Ordering::Equal => self.clone(),
        }
    }
}

/// Encoding failures sort lowest.
fn encoded<T: Serialize>(value: &T) -> Option<String> {
    serde_json::to_string(value).ok()
}
