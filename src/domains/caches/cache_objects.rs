use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CacheValue {
    pub value: Bytes,
    pub expiry: Option<DateTime<Utc>>,
}

impl CacheValue {
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self { value: value.into(), expiry: None }
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn has_expiry(&self) -> bool {
        self.expiry.is_some()
    }

    /// An entry stops being visible at the very instant its expiry is reached.
    pub fn is_expired(&self, now: &DateTime<Utc>) -> bool {
        self.expiry.is_some_and(|expiry| *now >= expiry)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    key: Bytes,
    value: CacheValue,
}

impl CacheEntry {
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self { key: key.into(), value: CacheValue::new(value) }
    }

    /// `ttl_millis <= 0` leaves the entry without expiry, as does a deadline past chrono's range.
    pub fn with_ttl(mut self, ttl_millis: i64, now: DateTime<Utc>) -> Self {
        if ttl_millis > 0 {
            self.value.expiry = now.checked_add_signed(TimeDelta::milliseconds(ttl_millis));
        }
        self
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.value.expiry
    }

    pub fn destructure(self) -> (Bytes, CacheValue) {
        (self.key, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_positive_ttl_means_no_expiry() {
        let now = Utc::now();
        assert_eq!(CacheEntry::new("k", "v").with_ttl(0, now).expiry(), None);
        assert_eq!(CacheEntry::new("k", "v").with_ttl(-5, now).expiry(), None);
    }

    #[test]
    fn test_expired_from_expiry_instant_on() {
        // GIVEN
        let now = Utc::now();
        let entry = CacheEntry::new("k", "v").with_ttl(100, now);
        let (_, value) = entry.destructure();

        // THEN
        assert!(!value.is_expired(&(now + TimeDelta::milliseconds(99))));
        assert!(value.is_expired(&(now + TimeDelta::milliseconds(100))));
        assert!(value.is_expired(&(now + TimeDelta::milliseconds(101))));
    }
}
