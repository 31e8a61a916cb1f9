//! Key-value stores backing the session and the durable local data.
//!
//! Two scopes exist: `session` holds the auth token and profile and is wiped
//! at logout, `local` survives logout and holds fallback records and settings.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{ClientError, ClientResult};

/// Scope of a key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
  Session,
  Local,
}

impl Scope {
  pub fn as_str(self) -> &'static str {
    match self {
      Scope::Session => "session",
      Scope::Local => "local",
    }
  }
}

/// String key-value store.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> ClientResult<Option<String>>;

  fn set(&self, key: &str, value: &str) -> ClientResult<()>;

  fn remove(&self, key: &str) -> ClientResult<()>;
}

/// Read a JSON value stored under `key`.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> ClientResult<Option<T>> {
  match store.get(key)? {
    Some(raw) => serde_json::from_str(&raw)
      .map(Some)
      .map_err(|e| ClientError::Storage(format!("Corrupt value under '{}': {}", key, e))),
    None => Ok(None),
  }
}

/// Store `value` as JSON under `key`.
pub fn set_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> ClientResult<()> {
  let raw = serde_json::to_string(value)
    .map_err(|e| ClientError::Storage(format!("Failed to serialize '{}': {}", key, e)))?;
  store.set(key, &raw)
}
