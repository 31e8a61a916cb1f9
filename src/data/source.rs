//! Two-tier repository: a remote source, a local mirror, and the policy that
//! decides when to fall back from one to the other.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};
use crate::resource::{Collection, Summary};

/// The backend.
#[async_trait]
pub trait RemoteSource: Send + Sync {
  async fn list(&self, collection: Collection) -> ClientResult<Value>;

  async fn summary(&self, summary: Summary) -> ClientResult<Value>;

  async fn create(&self, collection: Collection, payload: &Value) -> ClientResult<Value>;

  async fn update(&self, collection: Collection, id: &str, payload: &Value) -> ClientResult<Value>;

  async fn delete(&self, collection: Collection, id: &str) -> ClientResult<()>;

  async fn verify_bank_account(&self, id: &str, otp: &str) -> ClientResult<Value>;
}

/// Durable local copy of records saved while the backend was unreachable.
pub trait LocalMirror: Send + Sync {
  /// Records in insertion order. Empty when nothing was saved.
  fn records(&self, collection: Collection) -> ClientResult<Vec<Value>>;

  fn append(&self, collection: Collection, record: Value) -> ClientResult<()>;
}

/// Decides which remote failures may be answered from the mirror.
pub trait FallbackPolicy: Send + Sync {
  fn fallback_on_read(&self, error: &ClientError) -> bool;

  fn fallback_on_write(&self, error: &ClientError) -> bool;
}

/// Prefer the backend. Reads degrade on any backend failure; writes are only
/// saved locally when the backend could not be reached at all. Auth and
/// validation failures never fall back.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreferRemote;

impl FallbackPolicy for PreferRemote {
  fn fallback_on_read(&self, error: &ClientError) -> bool {
    match error {
      ClientError::Api { .. }
      | ClientError::Network(_)
      | ClientError::Decode(_)
      | ClientError::Storage(_) => true,
      ClientError::Auth(_) | ClientError::NotLoggedIn | ClientError::Validation { .. } => false,
    }
  }

  fn fallback_on_write(&self, error: &ClientError) -> bool {
    error.is_network()
  }
}
