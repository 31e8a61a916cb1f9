use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::api::endpoints;
use crate::error::{ClientError, ClientResult};
use crate::session::{AuthSession, SessionStore};

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// FinTrackr REST client. Every backend call goes through here.
#[derive(Clone)]
pub struct ApiService {
  http: reqwest::Client,
  base_url: Url,
  session: SessionStore,
}

impl ApiService {
  pub fn new(base_url: Url, session: SessionStore) -> ClientResult<Self> {
    let http = reqwest::Client::builder()
      .user_agent(concat!("fintrackr/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| ClientError::Network(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self {
      http,
      base_url,
      session,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  #[cfg(test)]
  pub fn session(&self) -> &SessionStore {
    &self.session
  }

  /// Resolve `path` against the base URL, keeping any path prefix the base has.
  pub(crate) fn endpoint(&self, path: &str, query: &[(&str, String)]) -> ClientResult<Url> {
    let raw = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
    let mut url = Url::parse(&raw)
      .map_err(|e| ClientError::validation("url", format!("Invalid endpoint {}: {}", raw, e)))?;
    if !query.is_empty() {
      url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
    }
    Ok(url)
  }

  fn build(
    &self,
    method: Method,
    url: Url,
    body: Option<&Value>,
    requires_auth: bool,
  ) -> ClientResult<RequestBuilder> {
    let mut builder = self
      .http
      .request(method, url)
      .header(CONTENT_TYPE, "application/json")
      .header(ACCEPT, "application/json");

    if requires_auth {
      if let Some(token) = self.session.token()? {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
      }
    }

    if let Some(body) = body {
      builder = builder.json(body);
    }

    Ok(builder)
  }

  /// Send a request to `path` and parse the JSON response.
  pub async fn request(
    &self,
    method: Method,
    path: &str,
    body: Option<&Value>,
    requires_auth: bool,
  ) -> ClientResult<Value> {
    self
      .request_with_query(method, path, &[], body, requires_auth)
      .await
  }

  pub async fn request_with_query(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<&Value>,
    requires_auth: bool,
  ) -> ClientResult<Value> {
    let url = self.endpoint(path, query)?;
    let builder = self.build(method.clone(), url, body, requires_auth)?;

    let result = self.execute(builder, requires_auth).await;
    if let Err(e) = &result {
      error!(%method, path, error = %e, "request failed");
    }
    result
  }

  async fn execute(&self, builder: RequestBuilder, requires_auth: bool) -> ClientResult<Value> {
    let response = builder.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
      if text.trim().is_empty() {
        return Ok(Value::Null);
      }
      return serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()));
    }

    let message = error_message(status, &text);
    if status == StatusCode::UNAUTHORIZED && requires_auth {
      warn!("backend rejected credentials, clearing session");
      self.session.clear();
      return Err(ClientError::Auth(message));
    }

    Err(ClientError::Api {
      status: status.as_u16(),
      message,
    })
  }

  /// Log in and persist the session when the payload carries a token.
  /// The raw payload is returned so callers can read extra fields.
  pub async fn login(&self, username_or_email: &str, password: &str) -> ClientResult<Value> {
    let body = json!({
      "usernameOrEmail": username_or_email,
      "password": password,
    });
    let data = self
      .request(Method::POST, endpoints::LOGIN, Some(&body), false)
      .await?;

    if let Some(session) = AuthSession::from_login_payload(&data) {
      self.session.save(&session)?;
      info!(user = ?session.user.username, "logged in");
    }

    Ok(data)
  }

  /// Create an account. Does not log in.
  pub async fn register(&self, user: &Value) -> ClientResult<Value> {
    self
      .request(Method::POST, endpoints::REGISTER, Some(user), false)
      .await
  }

  /// Best-effort backend logout, then clear the local session regardless.
  pub async fn logout(&self) {
    if let Err(e) = self.request(Method::POST, endpoints::LOGOUT, None, true).await {
      debug!(error = %e, "backend logout failed, ignoring");
    }
    self.session.clear();
    info!("logged out");
  }

  pub async fn refresh_token(&self) -> ClientResult<Value> {
    let data = self
      .request(Method::POST, endpoints::REFRESH, None, true)
      .await?;
    if let Some(token) = data.get("token").and_then(Value::as_str) {
      self.session.set_token(token)?;
    }
    Ok(data)
  }

  pub async fn profile(&self) -> ClientResult<Value> {
    self.request(Method::GET, endpoints::ME, None, true).await
  }

  pub async fn update_profile(&self, profile: &Value) -> ClientResult<Value> {
    self
      .request(Method::PUT, endpoints::ME, Some(profile), true)
      .await
  }

  /// Health probe with a fixed 5 second timeout.
  pub async fn check_connection(&self) -> ClientResult<()> {
    let url = self.endpoint(endpoints::HEALTH, &[])?;
    let builder = self
      .build(Method::GET, url, None, false)?
      .timeout(HEALTH_TIMEOUT);
    self.execute(builder, false).await.map(|_| ())
  }

  pub async fn request_password_reset(&self, email: &str) -> ClientResult<Value> {
    let body = json!({ "email": email });
    self
      .request(Method::POST, endpoints::FORGOT_PASSWORD, Some(&body), false)
      .await
  }

  pub async fn confirm_password_reset(&self, token: &str, new_password: &str) -> ClientResult<Value> {
    let body = json!({ "token": token, "newPassword": new_password });
    self
      .request(Method::POST, endpoints::RESET_PASSWORD, Some(&body), false)
      .await
  }
}

/// Message for a failed response: `error`, then `message`, then a generic one.
fn error_message(status: StatusCode, body: &str) -> String {
  let generic = format!("Request failed with status {}", status.as_u16());
  let Ok(parsed) = serde_json::from_str::<Value>(body) else {
    return generic;
  };

  ["error", "message"]
    .iter()
    .find_map(|field| {
      parsed
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
    })
    .unwrap_or(generic)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;
  use std::sync::Arc;
  use wiremock::matchers::{body_json, header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn client(uri: &str) -> ApiService {
    let session = SessionStore::new(Arc::new(MemoryStore::new()));
    ApiService::new(Url::parse(uri).unwrap(), session).unwrap()
  }

  fn login_as(api: &ApiService, token: &str) {
    let session = AuthSession::from_login_payload(&json!({ "token": token })).unwrap();
    api.session().save(&session).unwrap();
  }

  #[test]
  fn test_error_message_preference() {
    let status = StatusCode::BAD_REQUEST;
    assert_eq!(
      error_message(status, r#"{"error":"Invalid amount","message":"ignored"}"#),
      "Invalid amount"
    );
    assert_eq!(error_message(status, r#"{"message":"Category required"}"#), "Category required");
    assert_eq!(error_message(status, "{}"), "Request failed with status 400");
    assert_eq!(
      error_message(StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>"),
      "Request failed with status 502"
    );
  }

  #[test]
  fn test_endpoint_keeps_base_path_prefix() {
    let api = client("http://localhost:8080/backend/");
    let url = api
      .endpoint("/api/income/recent", &[("limit", "5".to_string())])
      .unwrap();
    assert_eq!(url.as_str(), "http://localhost:8080/backend/api/income/recent?limit=5");
  }

  #[tokio::test]
  async fn test_request_attaches_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/goals"))
      .and(header("authorization", "Bearer abc"))
      .and(header("accept", "application/json"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
      .mount(&server)
      .await;

    let api = client(&server.uri());
    login_as(&api, "abc");

    let goals = api.request(Method::GET, "/api/goals", None, true).await.unwrap();
    assert_eq!(goals, json!([{"id": 1}]));
  }

  #[tokio::test]
  async fn test_unauthenticated_request_has_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/auth/register"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
      .mount(&server)
      .await;

    let api = client(&server.uri());
    login_as(&api, "abc");
    api.register(&json!({"username": "new"})).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
  }

  #[tokio::test]
  async fn test_non_success_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/expenses"))
      .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Amount must be positive"})))
      .mount(&server)
      .await;

    let api = client(&server.uri());
    let err = api
      .request(Method::POST, "/api/expenses", Some(&json!({"amount": -1})), true)
      .await
      .unwrap_err();

    assert_eq!(
      err,
      ClientError::Api {
        status: 400,
        message: "Amount must be positive".to_string()
      }
    );
  }

  #[tokio::test]
  async fn test_unauthorized_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/income"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Token expired"})))
      .mount(&server)
      .await;

    let api = client(&server.uri());
    login_as(&api, "stale");

    let err = api.request(Method::GET, "/api/income", None, true).await.unwrap_err();

    assert_eq!(err, ClientError::Auth("Token expired".to_string()));
    assert!(!api.session().is_authenticated());
  }

  #[tokio::test]
  async fn test_empty_success_body_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
      .and(path("/api/goals/4"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&server)
      .await;

    let api = client(&server.uri());
    let value = api.request(Method::DELETE, "/api/goals/4", None, true).await.unwrap();
    assert_eq!(value, Value::Null);
  }

  #[tokio::test]
  async fn test_unreachable_backend_is_network_error() {
    // Nothing listens on port 1
    let api = client("http://127.0.0.1:1");
    let err = api.request(Method::GET, "/api/goals", None, true).await.unwrap_err();
    assert!(err.is_network());
  }

  #[tokio::test]
  async fn test_login_persists_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/auth/login"))
      .and(body_json(json!({"usernameOrEmail": "user@example.com", "password": "secret"})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "token": "abc",
        "id": 1,
        "username": "user",
        "role": "ROLE_ADMIN"
      })))
      .mount(&server)
      .await;

    let api = client(&server.uri());
    let payload = api.login("user@example.com", "secret").await.unwrap();

    assert_eq!(payload["username"], "user");
    assert_eq!(api.session().token().unwrap().as_deref(), Some("abc"));
    let user = api.session().user().unwrap().unwrap();
    assert_eq!(user.role.as_deref(), Some("ROLE_ADMIN"));
    assert_eq!(user.id, Some(1));
  }

  #[tokio::test]
  async fn test_failed_login_uses_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/auth/login"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
      .mount(&server)
      .await;

    let api = client(&server.uri());
    let err = api.login("user", "wrong").await.unwrap_err();

    assert_eq!(err.to_string(), "Bad credentials (HTTP 401)");
    assert!(!api.session().is_authenticated());
  }

  #[tokio::test]
  async fn test_logout_clears_session_when_backend_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/auth/logout"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let api = client(&server.uri());
    login_as(&api, "abc");
    api.logout().await;

    assert!(!api.session().is_authenticated());
    assert_eq!(api.session().user().unwrap(), None);
  }

  #[tokio::test]
  async fn test_logout_clears_session_when_backend_unreachable() {
    let api = client("http://127.0.0.1:1");
    login_as(&api, "abc");
    api.logout().await;

    assert!(!api.session().is_authenticated());
  }

  #[tokio::test]
  async fn test_refresh_token_replaces_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/auth/refresh"))
      .and(header("authorization", "Bearer old"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "new"})))
      .mount(&server)
      .await;

    let api = client(&server.uri());
    login_as(&api, "old");
    api.refresh_token().await.unwrap();

    assert_eq!(api.session().token().unwrap().as_deref(), Some("new"));
  }

  #[tokio::test]
  async fn test_check_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/public/health"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "UP"})))
      .mount(&server)
      .await;

    let api = client(&server.uri());
    api.check_connection().await.unwrap();
  }
}
