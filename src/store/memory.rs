use std::collections::HashMap;
use std::sync::Mutex;

use super::KeyValueStore;
use crate::error::{ClientError, ClientResult};

/// In-process key-value store.
#[derive(Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn entries(&self) -> ClientResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
    self
      .entries
      .lock()
      .map_err(|e| ClientError::Storage(format!("Lock poisoned: {}", e)))
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> ClientResult<Option<String>> {
    Ok(self.entries()?.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> ClientResult<()> {
    self.entries()?.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> ClientResult<()> {
    self.entries()?.remove(key);
    Ok(())
  }
}
