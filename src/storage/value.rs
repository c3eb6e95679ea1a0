//! Typed Value Representation
//!
//! Every key in ArborKV is bound to exactly one [`Value`], a closed sum type
//! over the three kinds the cache supports: a scalar string, an ordered list
//! of strings, or a string-to-string map. Each variant carries its own
//! absolute expiration deadline, so an entry can be judged live or lapsed
//! without consulting anything outside the value itself.
//!
//! ## Expiration Encoding
//!
//! Deadlines are `i64` nanoseconds since the Unix epoch. The sentinel
//! [`NEVER_EXPIRES`] (zero) marks an immortal entry. A value is considered
//! lapsed strictly when `now > expires_at` - an entry read at exactly its
//! deadline is still live.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Sentinel deadline for entries that never expire.
pub const NEVER_EXPIRES: i64 = 0;

/// Current wall-clock time as nanoseconds since the Unix epoch.
pub fn epoch_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(NEVER_EXPIRES)
}

/// Converts a time-to-live into an absolute deadline relative to `now`.
///
/// `None` or a zero duration means the entry never expires.
pub fn deadline_after(now: i64, ttl: Option<Duration>) -> i64 {
    match ttl {
        Some(ttl) if !ttl.is_zero() => now.saturating_add(ttl.as_nanos() as i64),
        _ => NEVER_EXPIRES,
    }
}

/// Returns true if a deadline has lapsed at instant `now`.
#[inline]
pub fn lapsed(expires_at: i64, now: i64) -> bool {
    expires_at > NEVER_EXPIRES && now > expires_at
}

/// Which of the three value kinds a key is currently bound to.
///
/// Classification happens once, at the store boundary; the index and the
/// algorithms beneath it never re-inspect the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Scalar,
    List,
    Map,
}

impl Kind {
    /// Wire-friendly name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Scalar => "scalar",
            Kind::List => "list",
            Kind::Map => "map",
        }
    }
}

/// A stored value: one of three kinds, each with its own deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A single string.
    Scalar { data: String, expires_at: i64 },
    /// An ordered sequence of strings. `VecDeque` gives O(1) pushes at
    /// both ends for the prepend/append operations.
    List {
        data: VecDeque<String>,
        expires_at: i64,
    },
    /// A string-to-string field map.
    Map {
        data: HashMap<String, String>,
        expires_at: i64,
    },
}

impl Value {
    /// Creates a scalar value.
    pub fn scalar(data: String, expires_at: i64) -> Self {
        Value::Scalar { data, expires_at }
    }

    /// Creates a single-element list.
    pub fn list_of(first: String, expires_at: i64) -> Self {
        let mut data = VecDeque::with_capacity(1);
        data.push_back(first);
        Value::List { data, expires_at }
    }

    /// Creates a single-field map.
    pub fn map_of(field: String, value: String, expires_at: i64) -> Self {
        let mut data = HashMap::with_capacity(1);
        data.insert(field, value);
        Value::Map { data, expires_at }
    }

    /// The kind discriminant of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Scalar { .. } => Kind::Scalar,
            Value::List { .. } => Kind::List,
            Value::Map { .. } => Kind::Map,
        }
    }

    /// The absolute expiration deadline carried by this value.
    pub fn expires_at(&self) -> i64 {
        match self {
            Value::Scalar { expires_at, .. }
            | Value::List { expires_at, .. }
            | Value::Map { expires_at, .. } => *expires_at,
        }
    }

    /// Checks whether this value has lapsed at instant `now`.
    #[inline]
    pub fn is_expired(&self, now: i64) -> bool {
        lapsed(self.expires_at(), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_classification() {
        assert_eq!(Value::scalar("v".into(), 0).kind(), Kind::Scalar);
        assert_eq!(Value::list_of("v".into(), 0).kind(), Kind::List);
        assert_eq!(Value::map_of("f".into(), "v".into(), 0).kind(), Kind::Map);
    }

    #[test]
    fn immortal_never_lapses() {
        let v = Value::scalar("v".into(), NEVER_EXPIRES);
        assert!(!v.is_expired(i64::MAX));
    }

    #[test]
    fn lapse_is_strict() {
        let v = Value::scalar("v".into(), 100);
        assert!(!v.is_expired(99));
        assert!(!v.is_expired(100));
        assert!(v.is_expired(101));
    }

    #[test]
    fn deadline_from_ttl() {
        assert_eq!(deadline_after(50, None), NEVER_EXPIRES);
        assert_eq!(deadline_after(50, Some(Duration::ZERO)), NEVER_EXPIRES);
        assert_eq!(
            deadline_after(50, Some(Duration::from_nanos(100))),
            150
        );
    }

    #[test]
    fn constructors_seed_one_element() {
        match Value::list_of("a".into(), 0) {
            Value::List { data, .. } => assert_eq!(data, VecDeque::from(["a".to_string()])),
            _ => panic!("expected list"),
        }
        match Value::map_of("f".into(), "v".into(), 0) {
            Value::Map { data, .. } => {
                assert_eq!(data.get("f").map(String::as_str), Some("v"));
                assert_eq!(data.len(), 1);
            }
            _ => panic!("expected map"),
        }
    }
}
