//! Error taxonomy shared by the API client, the cache and the local stores.

use thiserror::Error;

/// Errors produced by the client layers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
  /// Form input failed a client-side constraint. Never reaches the network.
  #[error("{field}: {message}")]
  Validation { field: String, message: String },

  /// The backend answered with a non-2xx status.
  #[error("{message} (HTTP {status})")]
  Api { status: u16, message: String },

  /// The request never got a response.
  #[error("Network error: {0}")]
  Network(String),

  /// Expired or rejected credentials. The session has been cleared.
  #[error("Authentication required: {0}")]
  Auth(String),

  /// No session was ever established on this machine.
  #[error("Not logged in")]
  NotLoggedIn,

  /// Local persistence failed.
  #[error("Storage error: {0}")]
  Storage(String),

  /// A successful response carried a body that is not valid JSON.
  #[error("Invalid response from server: {0}")]
  Decode(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
  pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Validation {
      field: field.into(),
      message: message.into(),
    }
  }

  pub fn is_network(&self) -> bool {
    matches!(self, Self::Network(_))
  }

  pub fn is_auth(&self) -> bool {
    matches!(self, Self::Auth(_))
  }

  /// HTTP status when the backend produced one.
  #[cfg(test)]
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Api { status, .. } => Some(*status),
      _ => None,
    }
  }
}

impl From<rusqlite::Error> for ClientError {
  fn from(error: rusqlite::Error) -> Self {
    Self::Storage(error.to_string())
  }
}

impl From<reqwest::Error> for ClientError {
  fn from(error: reqwest::Error) -> Self {
    Self::Network(error.to_string())
  }
}
