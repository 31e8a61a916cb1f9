use rusqlite::{params, OptionalExtension};
use std::sync::Arc;

use super::{KeyValueStore, Scope};
use crate::db::Database;
use crate::error::ClientResult;

/// Key-value store persisted in the `kv_store` table, one scope per instance.
#[derive(Clone)]
pub struct SqliteStore {
  db: Arc<Database>,
  scope: Scope,
}

impl SqliteStore {
  pub fn new(db: Arc<Database>, scope: Scope) -> Self {
    Self { db, scope }
  }
}

impl KeyValueStore for SqliteStore {
  fn get(&self, key: &str) -> ClientResult<Option<String>> {
    let conn = self.db.conn()?;
    let value = conn
      .query_row(
        "SELECT value FROM kv_store WHERE scope = ? AND key = ?",
        params![self.scope.as_str(), key],
        |row| row.get(0),
      )
      .optional()?;
    Ok(value)
  }

  fn set(&self, key: &str, value: &str) -> ClientResult<()> {
    let conn = self.db.conn()?;
    conn.execute(
      "INSERT OR REPLACE INTO kv_store (scope, key, value) VALUES (?, ?, ?)",
      params![self.scope.as_str(), key, value],
    )?;
    Ok(())
  }

  fn remove(&self, key: &str) -> ClientResult<()> {
    let conn = self.db.conn()?;
    conn.execute(
      "DELETE FROM kv_store WHERE scope = ? AND key = ?",
      params![self.scope.as_str(), key],
    )?;
    Ok(())
  }
}
