//! TTL cache in front of a storage backend.

use chrono::Duration;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::{CacheEntry, CacheStorage};
use super::traits::{Clock, SystemClock};

/// Cache store with time-to-live invalidation.
///
/// Storage failures never reach the caller: a failed read is a miss and a
/// failed write leaves the previous state in place.
pub struct CacheStore {
  storage: Arc<dyn CacheStorage>,
  clock: Arc<dyn Clock>,
  /// How long a cached payload stays valid
  ttl: Duration,
}

impl CacheStore {
  /// Create a new cache store with the given storage backend and a 5 minute TTL.
  pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
    Self {
      storage,
      clock: Arc::new(SystemClock),
      ttl: Duration::minutes(5),
    }
  }

  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Valid only while `now - fetched_at < ttl`.
  fn is_fresh(&self, entry: &CacheEntry) -> bool {
    self.clock.now() - entry.fetched_at < self.ttl
  }

  /// Cached value for `key` if it is still fresh.
  pub fn fresh(&self, key: &str) -> Option<Value> {
    match self.storage.get(key) {
      Ok(Some(entry)) if self.is_fresh(&entry) => {
        debug!(key, "cache hit");
        Some(entry.value)
      }
      Ok(Some(_)) => {
        debug!(key, "cache stale");
        None
      }
      Ok(None) => {
        debug!(key, "cache miss");
        None
      }
      Err(e) => {
        warn!(key, error = %e, "cache read failed, treating as miss");
        None
      }
    }
  }

  /// Overwrite the entry for `key`, stamped with the current time.
  pub fn put(&self, key: &str, value: &Value) {
    let entry = CacheEntry {
      value: value.clone(),
      fetched_at: self.clock.now(),
    };
    if let Err(e) = self.storage.put(key, &entry) {
      warn!(key, error = %e, "cache write failed");
    }
  }

  pub fn invalidate(&self, key: &str) {
    debug!(key, "cache invalidated");
    if let Err(e) = self.storage.remove(key) {
      warn!(key, error = %e, "cache invalidation failed");
    }
  }

  /// Drop `family` and every `family:<suffix>` entry.
  pub fn invalidate_family(&self, family: &str) {
    debug!(family, "cache family invalidated");
    if let Err(e) = self.storage.remove_family(family) {
      warn!(family, error = %e, "cache invalidation failed");
    }
  }

  pub fn clear(&self) {
    debug!("cache cleared");
    if let Err(e) = self.storage.clear() {
      warn!(error = %e, "cache clear failed");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::MemoryStorage;
  use crate::cache::traits::ManualClock;
  use chrono::{TimeZone, Utc};
  use serde_json::json;

  fn store_with_clock() -> (CacheStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
    let store = CacheStore::new(Arc::new(MemoryStorage::new())).with_clock(clock.clone());
    (store, clock)
  }

  #[test]
  fn test_fresh_until_ttl_elapses() {
    let (store, clock) = store_with_clock();
    store.put("expenses", &json!([{"id": 1}]));

    clock.advance(Duration::minutes(4));
    assert_eq!(store.fresh("expenses"), Some(json!([{"id": 1}])));

    clock.advance(Duration::seconds(59));
    assert!(store.fresh("expenses").is_some());

    // Exactly at the TTL boundary the entry is stale
    clock.advance(Duration::seconds(1));
    assert_eq!(store.fresh("expenses"), None);
  }

  #[test]
  fn test_put_restamps_entry() {
    let (store, clock) = store_with_clock();
    store.put("goals", &json!([]));
    clock.advance(Duration::minutes(6));
    assert_eq!(store.fresh("goals"), None);

    store.put("goals", &json!([{"id": 2}]));
    assert_eq!(store.fresh("goals"), Some(json!([{"id": 2}])));
  }

  #[test]
  fn test_invalidate_and_clear() {
    let (store, _clock) = store_with_clock();
    store.put("incomes", &json!([]));
    store.put("dashboard", &json!({}));

    store.invalidate("incomes");
    assert_eq!(store.fresh("incomes"), None);
    assert!(store.fresh("dashboard").is_some());

    store.clear();
    assert_eq!(store.fresh("dashboard"), None);
  }

  #[test]
  fn test_invalidate_family_keeps_other_keys() {
    let (store, _clock) = store_with_clock();
    store.put("monthlyTrends:6", &json!({}));
    store.put("incomes", &json!([]));

    store.invalidate_family("monthlyTrends");
    assert_eq!(store.fresh("monthlyTrends:6"), None);
    assert!(store.fresh("incomes").is_some());
  }

  #[test]
  fn test_custom_ttl() {
    let (store, clock) = store_with_clock();
    let store = store.with_ttl(Duration::seconds(10));
    store.put("accounts", &json!([]));

    clock.advance(Duration::seconds(11));
    assert_eq!(store.fresh("accounts"), None);
  }
}
