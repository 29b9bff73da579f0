//! Store Entry
//!
//! A value and its absolute expiration in epoch seconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current time in seconds since the Unix epoch
pub(crate) fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Entry in the store with value and expiration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    value: String,
    /// `None` never expires
    expires_at: Option<i64>,
}

impl Entry {
    /// Entry that never expires
    pub fn permanent(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    /// Entry expiring at the given epoch second
    pub fn expiring(value: impl Into<String>, expires_at: i64) -> Self {
        Self {
            value: value.into(),
            expires_at: Some(expires_at),
        }
    }

    pub(crate) fn from_deadline(value: String, deadline: DateTime<Utc>) -> Self {
        Self::expiring(value, deadline.timestamp())
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    pub fn is_permanent(&self) -> bool {
        self.expires_at.is_none()
    }

    /// Valid when permanent or when the deadline is strictly after `now`
    #[inline]
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.expires_at.map(|t| t > now).unwrap_or(true)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_always_valid() {
        let entry = Entry::permanent("value");
        assert!(entry.is_permanent());
        assert!(entry.is_valid_at(i64::MAX));
        assert_eq!(entry.value(), "value");
    }

    #[test]
    fn test_expiry_is_strict() {
        let entry = Entry::expiring("value", 100);
        assert!(entry.is_valid_at(99));
        assert!(!entry.is_valid_at(100));
        assert!(!entry.is_valid_at(101));
    }

    #[test]
    fn test_deadline_truncates_to_seconds() {
        let deadline = DateTime::from_timestamp(1_700_000_000, 900_000_000).unwrap();
        let entry = Entry::from_deadline("v".into(), deadline);
        assert_eq!(entry.expires_at(), Some(1_700_000_000));
    }
}
