mod schema;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{ClientError, ClientResult};

/// SQLite connection shared by the key-value stores and the resource cache.
pub struct Database {
  conn: Mutex<Connection>,
}

impl Database {
  /// Open or create the database at the default location
  pub fn open_default() -> ClientResult<Self> {
    let path = Self::default_path()?;
    Self::open(&path)
  }

  /// Open or create the database at `path`
  pub fn open(path: &Path) -> ClientResult<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| {
        ClientError::Storage(format!("Failed to create data directory: {}", e))
      })?;
    }

    let conn = Connection::open(path).map_err(|e| {
      ClientError::Storage(format!(
        "Failed to open database at {}: {}",
        path.display(),
        e
      ))
    })?;

    Self::with_connection(conn)
  }

  /// Database that lives only as long as the process.
  pub fn in_memory() -> ClientResult<Self> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> ClientResult<Self> {
    let db = Self {
      conn: Mutex::new(conn),
    };
    db.run_migrations()?;
    Ok(db)
  }

  /// Directory holding the database and the log files
  pub fn data_dir() -> ClientResult<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| ClientError::Storage("Could not determine data directory".to_string()))?;

    Ok(data_dir.join("fintrackr"))
  }

  fn default_path() -> ClientResult<PathBuf> {
    Ok(Self::data_dir()?.join("fintrackr.db"))
  }

  fn run_migrations(&self) -> ClientResult<()> {
    self
      .conn()?
      .execute_batch(schema::SCHEMA)
      .map_err(|e| ClientError::Storage(format!("Failed to run migrations: {}", e)))?;
    Ok(())
  }

  /// Lock the connection
  pub fn conn(&self) -> ClientResult<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| ClientError::Storage(format!("Lock poisoned: {}", e)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_open_creates_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("fintrackr.db");

    Database::open(&path).unwrap();

    assert!(path.exists());
  }

  #[test]
  fn test_migrations_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fintrackr.db");

    Database::open(&path).unwrap();
    Database::open(&path).unwrap();
  }
}
