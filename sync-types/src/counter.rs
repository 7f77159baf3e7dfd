//! The shared clicker counter.

use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

use crate::{DecodeError, Payload};

/// Name of the single field in a serialized counter.
const COUNT_FIELD: &str = "count";

/// The counter both devices keep in sync.
///
/// There is no version or timestamp: counters are ordered by `count` alone,
/// so two histories that reach the same number compare equal.
///
/// Mutations consume the counter and return the updated value. Arithmetic
/// saturates at the `i64` bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Counter {
    count: i64,
}

impl Counter {
    /// Create a counter holding `count`.
    pub const fn new(count: i64) -> Self {
        Self { count }
    }

    /// Create a counter at zero.
    pub const fn zero() -> Self {
        Self { count: 0 }
    }

    /// The current count.
    pub const fn count(&self) -> i64 {
        self.count
    }

    /// Return the counter with `by` added. Negative values move it down.
    #[must_use]
    pub fn increment(self, by: i64) -> Self {
        Self {
            count: self.count.saturating_add(by),
        }
    }

    /// Return the counter with `by` subtracted.
    #[must_use]
    pub fn decrement(self, by: i64) -> Self {
        Self {
            count: self.count.saturating_sub(by),
        }
    }

    /// Return a counter at zero.
    #[must_use]
    pub fn reset(self) -> Self {
        Self::zero()
    }

    /// Compare by count magnitude only.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.count.cmp(&other.count)
    }

    /// Serialize to `{"count": <n>}`.
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        payload.insert(COUNT_FIELD.to_string(), Value::from(self.count));
        payload
    }

    /// Strictly decode from a payload.
    ///
    /// Extra fields are ignored. `count` must be present and fit in an `i64`.
    pub fn try_from_payload(payload: &Payload) -> Result<Self, DecodeError> {
        let value = payload
            .get(COUNT_FIELD)
            .ok_or(DecodeError::MissingField(COUNT_FIELD))?;
        value
            .as_i64()
            .map(Self::new)
            .ok_or_else(|| DecodeError::InvalidField {
                field: COUNT_FIELD,
                reason: format!("expected integer, got {value}"),
            })
    }

    /// Leniently decode from a payload, falling back to zero.
    pub fn from_payload(payload: &Payload) -> Self {
        Self::try_from_payload(payload).unwrap_or_default()
    }
}

impl From<i64> for Counter {
    fn from(count: i64) -> Self {
        Self::new(count)
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.count)
    }
}
