//! Millisecond timestamps.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in time in Unix milliseconds.
///
/// Server-assigned timestamps and sync cursors use this type. A thread's
/// `version` is also read as a `Timestamp` when it serves as the thread's
/// recency proxy, since clients choose it as "now" in milliseconds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The zero cursor, which requests a full sync.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Creates a timestamp from Unix milliseconds.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the Unix milliseconds.
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Returns true for the zero value.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
