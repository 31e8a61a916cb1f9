//! Authenticated session held in the session-scoped store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::error::ClientResult;
use crate::store::{get_json, set_json, KeyValueStore};

const TOKEN_KEY: &str = "fintrackr_token";
const USER_KEY: &str = "fintrackr_user";

/// Profile of the logged-in user as returned by the login endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
  pub id: Option<i64>,
  pub username: Option<String>,
  pub email: Option<String>,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub role: Option<String>,
}

impl SessionUser {
  /// Accepts both `ROLE_ADMIN` and `ADMIN`, case-insensitively.
  pub fn is_admin(&self) -> bool {
    self
      .role
      .as_deref()
      .map(|r| {
        let r = r.to_uppercase();
        r == "ROLE_ADMIN" || r == "ADMIN"
      })
      .unwrap_or(false)
  }

  pub fn display_name(&self) -> String {
    let full = format!(
      "{} {}",
      self.first_name.as_deref().unwrap_or(""),
      self.last_name.as_deref().unwrap_or("")
    );
    let full = full.trim();
    if full.is_empty() {
      self.username.clone().unwrap_or_default()
    } else {
      full.to_string()
    }
  }
}

/// Token plus user profile.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
  pub token: String,
  pub user: SessionUser,
}

impl AuthSession {
  /// Build a session from a login payload. The backend sends the token as
  /// `token`, older builds as `jwt`; user fields sit at the top level.
  pub fn from_login_payload(payload: &Value) -> Option<Self> {
    let token = payload
      .get("jwt")
      .or_else(|| payload.get("token"))
      .and_then(Value::as_str)
      .filter(|t| !t.is_empty())?;

    let user = SessionUser {
      id: payload.get("id").and_then(Value::as_i64),
      username: string_field(payload, "username"),
      email: string_field(payload, "email"),
      first_name: string_field(payload, "firstName"),
      last_name: string_field(payload, "lastName"),
      role: string_field(payload, "role"),
    };

    Some(Self {
      token: token.to_string(),
      user,
    })
  }
}

fn string_field(payload: &Value, name: &str) -> Option<String> {
  payload.get(name).and_then(Value::as_str).map(String::from)
}

/// Session state, shared by the API client and the commands.
#[derive(Clone)]
pub struct SessionStore {
  store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self { store }
  }

  pub fn token(&self) -> ClientResult<Option<String>> {
    self.store.get(TOKEN_KEY)
  }

  pub fn user(&self) -> ClientResult<Option<SessionUser>> {
    get_json(self.store.as_ref(), USER_KEY)
  }

  pub fn is_authenticated(&self) -> bool {
    matches!(self.token(), Ok(Some(_)))
  }

  /// Store the user, then the token. The token marks the session as
  /// authenticated, so a failed write leaves neither behind.
  pub fn save(&self, session: &AuthSession) -> ClientResult<()> {
    let saved = set_json(self.store.as_ref(), USER_KEY, &session.user)
      .and_then(|()| self.store.set(TOKEN_KEY, &session.token));
    if saved.is_err() {
      self.clear();
    }
    saved
  }

  pub fn set_token(&self, token: &str) -> ClientResult<()> {
    self.store.set(TOKEN_KEY, token)
  }

  /// Remove token and user. Both removals are attempted even if one fails.
  pub fn clear(&self) {
    for key in [USER_KEY, TOKEN_KEY] {
      if let Err(e) = self.store.remove(key) {
        warn!(key, error = %e, "failed to clear session key");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ClientError;
  use crate::store::MemoryStore;
  use serde_json::json;

  fn session_store() -> SessionStore {
    SessionStore::new(Arc::new(MemoryStore::new()))
  }

  /// Accepts every write except the token.
  struct RejectsToken(MemoryStore);

  impl KeyValueStore for RejectsToken {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
      self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
      if key == TOKEN_KEY {
        return Err(ClientError::Storage("disk full".to_string()));
      }
      self.0.set(key, value)
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
      self.0.remove(key)
    }
  }

  #[test]
  fn test_failed_token_write_leaves_no_partial_session() {
    let store = SessionStore::new(Arc::new(RejectsToken(MemoryStore::new())));
    let session = AuthSession::from_login_payload(&json!({"token": "abc", "username": "user"})).unwrap();

    let err = store.save(&session).unwrap_err();

    assert_eq!(err, ClientError::Storage("disk full".to_string()));
    assert!(!store.is_authenticated());
    assert_eq!(store.user().unwrap(), None);
  }

  #[test]
  fn test_from_login_payload_prefers_jwt() {
    let payload = json!({"jwt": "from-jwt", "token": "from-token", "id": 3});
    let session = AuthSession::from_login_payload(&payload).unwrap();

    assert_eq!(session.token, "from-jwt");
    assert_eq!(session.user.id, Some(3));
  }

  #[test]
  fn test_from_login_payload_without_token() {
    assert!(AuthSession::from_login_payload(&json!({"message": "ok"})).is_none());
    assert!(AuthSession::from_login_payload(&json!({"token": ""})).is_none());
  }

  #[test]
  fn test_save_and_clear() {
    let store = session_store();
    let session = AuthSession::from_login_payload(&json!({
      "token": "abc",
      "username": "user",
      "role": "ROLE_ADMIN"
    }))
    .unwrap();

    store.save(&session).unwrap();
    assert!(store.is_authenticated());
    assert_eq!(store.user().unwrap().unwrap().role.as_deref(), Some("ROLE_ADMIN"));

    store.clear();
    assert!(!store.is_authenticated());
    assert_eq!(store.user().unwrap(), None);
  }

  #[test]
  fn test_is_admin_accepts_both_spellings() {
    let mut user = SessionUser {
      role: Some("admin".to_string()),
      ..Default::default()
    };
    assert!(user.is_admin());

    user.role = Some("ROLE_ADMIN".to_string());
    assert!(user.is_admin());

    user.role = Some("ROLE_USER".to_string());
    assert!(!user.is_admin());
  }

  #[test]
  fn test_display_name_falls_back_to_username() {
    let user = SessionUser {
      username: Some("jdoe".to_string()),
      ..Default::default()
    };
    assert_eq!(user.display_name(), "jdoe");
  }
}
