//! Cache storage trait with SQLite and no-op implementations, plus an
//! in-memory one for tests.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, OptionalExtension};
use serde_json::Value;
#[cfg(test)]
use std::collections::HashMap;
use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;

use crate::db::Database;
use crate::error::{ClientError, ClientResult};

/// A cached resource payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
  pub value: Value,
  /// When the payload was fetched from the backend
  pub fetched_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  fn get(&self, key: &str) -> ClientResult<Option<CacheEntry>>;

  /// Insert or overwrite the entry under `key`.
  fn put(&self, key: &str, entry: &CacheEntry) -> ClientResult<()>;

  fn remove(&self, key: &str) -> ClientResult<()>;

  /// Remove `family` itself and every `family:<suffix>` entry.
  fn remove_family(&self, family: &str) -> ClientResult<()>;

  fn clear(&self) -> ClientResult<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> ClientResult<Option<CacheEntry>> {
    Ok(None) // Always miss
  }

  fn put(&self, _key: &str, _entry: &CacheEntry) -> ClientResult<()> {
    Ok(()) // Discard
  }

  fn remove(&self, _key: &str) -> ClientResult<()> {
    Ok(())
  }

  fn remove_family(&self, _family: &str) -> ClientResult<()> {
    Ok(())
  }

  fn clear(&self) -> ClientResult<()> {
    Ok(())
  }
}

#[cfg(test)]
fn in_family(key: &str, family: &str) -> bool {
  match key.strip_prefix(family) {
    Some(rest) => rest.is_empty() || rest.starts_with(':'),
    None => false,
  }
}

/// Process-local storage.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, CacheEntry>>,
}

#[cfg(test)]
impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn entries(&self) -> ClientResult<std::sync::MutexGuard<'_, HashMap<String, CacheEntry>>> {
    self
      .entries
      .lock()
      .map_err(|e| ClientError::Storage(format!("Lock poisoned: {}", e)))
  }
}

#[cfg(test)]
impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> ClientResult<Option<CacheEntry>> {
    Ok(self.entries()?.get(key).cloned())
  }

  fn put(&self, key: &str, entry: &CacheEntry) -> ClientResult<()> {
    self.entries()?.insert(key.to_string(), entry.clone());
    Ok(())
  }

  fn remove(&self, key: &str) -> ClientResult<()> {
    self.entries()?.remove(key);
    Ok(())
  }

  fn remove_family(&self, family: &str) -> ClientResult<()> {
    self.entries()?.retain(|key, _| !in_family(key, family));
    Ok(())
  }

  fn clear(&self) -> ClientResult<()> {
    self.entries()?.clear();
    Ok(())
  }
}

/// SQLite-based cache storage, so entries outlive a single command.
pub struct SqliteStorage {
  db: Arc<Database>,
}

impl SqliteStorage {
  pub fn new(db: Arc<Database>) -> Self {
    Self { db }
  }
}

impl CacheStorage for SqliteStorage {
  fn get(&self, key: &str) -> ClientResult<Option<CacheEntry>> {
    let conn = self.db.conn()?;

    let row: Option<(String, i64)> = conn
      .query_row(
        "SELECT data, fetched_at_millis FROM resource_cache WHERE cache_key = ?",
        params![key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?;

    match row {
      Some((data, millis)) => {
        let value: Value = serde_json::from_str(&data)
          .map_err(|e| ClientError::Storage(format!("Failed to deserialize cache entry: {}", e)))?;
        let fetched_at = Utc
          .timestamp_millis_opt(millis)
          .single()
          .ok_or_else(|| ClientError::Storage(format!("Invalid cache timestamp {}", millis)))?;
        Ok(Some(CacheEntry { value, fetched_at }))
      }
      None => Ok(None),
    }
  }

  fn put(&self, key: &str, entry: &CacheEntry) -> ClientResult<()> {
    let data = serde_json::to_string(&entry.value)
      .map_err(|e| ClientError::Storage(format!("Failed to serialize cache entry: {}", e)))?;

    let conn = self.db.conn()?;
    conn.execute(
      "INSERT OR REPLACE INTO resource_cache (cache_key, data, fetched_at_millis)
       VALUES (?, ?, ?)",
      params![key, data, entry.fetched_at.timestamp_millis()],
    )?;
    Ok(())
  }

  fn remove(&self, key: &str) -> ClientResult<()> {
    let conn = self.db.conn()?;
    conn.execute("DELETE FROM resource_cache WHERE cache_key = ?", params![key])?;
    Ok(())
  }

  fn remove_family(&self, family: &str) -> ClientResult<()> {
    let prefix = format!("{}:", family);
    let conn = self.db.conn()?;
    conn.execute(
      "DELETE FROM resource_cache WHERE cache_key = ?1 OR substr(cache_key, 1, ?2) = ?3",
      params![family, prefix.chars().count() as i64, prefix],
    )?;
    Ok(())
  }

  fn clear(&self) -> ClientResult<()> {
    let conn = self.db.conn()?;
    conn.execute("DELETE FROM resource_cache", [])?;
    Ok(())
  }
}
