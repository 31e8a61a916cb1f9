use chrono::SecondsFormat;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::source::{FallbackPolicy, LocalMirror, PreferRemote, RemoteSource};
use crate::cache::{CacheStore, Clock, Fetched, SystemClock};
use crate::error::{ClientError, ClientResult};
use crate::resource::{Collection, Summary};
use crate::session::SessionStore;

/// Outcome of a create.
#[derive(Debug, Clone, PartialEq)]
pub enum Saved {
  /// Stored by the backend
  Remote(Value),
  /// Backend unreachable; stored only in the local mirror
  Local(Value),
}

impl Saved {
  pub fn record(&self) -> &Value {
    match self {
      Saved::Remote(record) | Saved::Local(record) => record,
    }
  }

  pub fn is_local(&self) -> bool {
    matches!(self, Saved::Local(_))
  }
}

/// Caching facade in front of the backend, with a local fallback.
///
/// Per cache key the state moves Empty → Fresh → Stale → Fresh on a
/// successful refetch, and back to Empty on `clear_cache` or a mutation.
pub struct DataService {
  remote: Arc<dyn RemoteSource>,
  mirror: Arc<dyn LocalMirror>,
  cache: CacheStore,
  session: SessionStore,
  policy: Arc<dyn FallbackPolicy>,
  clock: Arc<dyn Clock>,
}

impl DataService {
  pub fn new(
    remote: Arc<dyn RemoteSource>,
    mirror: Arc<dyn LocalMirror>,
    cache: CacheStore,
    session: SessionStore,
  ) -> Self {
    Self {
      remote,
      mirror,
      cache,
      session,
      policy: Arc::new(PreferRemote),
      clock: Arc::new(SystemClock),
    }
  }

  #[cfg(test)]
  pub fn with_policy(mut self, policy: Arc<dyn FallbackPolicy>) -> Self {
    self.policy = policy;
    self
  }

  /// Clock used to stamp locally saved records.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// List a collection.
  ///
  /// 1. Fresh cache entry and no `force_refresh` → cached list, no network
  /// 2. Otherwise fetch; success overwrites the cache entry
  /// 3. Failure → the local mirror if it holds records, else an empty list.
  ///    The cache is left as it was. Only auth failures propagate.
  pub async fn get(&self, collection: Collection, force_refresh: bool) -> ClientResult<Fetched<Vec<Value>>> {
    let key = collection.cache_key();

    if !force_refresh {
      if let Some(Value::Array(records)) = self.cache.fresh(key) {
        return Ok(Fetched::from_cache(records));
      }
    }

    let fetched = self.remote.list(collection).await.and_then(into_records);
    match fetched {
      Ok(records) => {
        self.cache.put(key, &Value::Array(records.clone()));
        Ok(Fetched::from_network(records))
      }
      Err(e) if self.policy.fallback_on_read(&e) => {
        warn!(key, error = %e, "fetch failed, reading local mirror");
        Ok(self.read_mirror(collection))
      }
      Err(e) => Err(e),
    }
  }

  fn read_mirror(&self, collection: Collection) -> Fetched<Vec<Value>> {
    match self.mirror.records(collection) {
      Ok(records) if !records.is_empty() => {
        info!(key = collection.cache_key(), count = records.len(), "using local fallback");
        Fetched::from_fallback(records)
      }
      Ok(_) => Fetched::unavailable(Vec::new()),
      Err(e) => {
        warn!(key = collection.cache_key(), error = %e, "local mirror unreadable");
        Fetched::unavailable(Vec::new())
      }
    }
  }

  /// Fetch an aggregate with the same caching as `get`.
  ///
  /// On failure the profile falls back to the user stored at login; other
  /// aggregates degrade to an empty object.
  pub async fn summary(&self, summary: Summary, force_refresh: bool) -> ClientResult<Fetched<Value>> {
    let key = summary.cache_key();

    if !force_refresh {
      if let Some(value) = self.cache.fresh(&key) {
        return Ok(Fetched::from_cache(value));
      }
    }

    match self.remote.summary(summary).await {
      Ok(value) => {
        self.cache.put(&key, &value);
        Ok(Fetched::from_network(value))
      }
      Err(e) if self.policy.fallback_on_read(&e) => {
        warn!(key = %key, error = %e, "fetch failed");
        Ok(self.summary_fallback(summary))
      }
      Err(e) => Err(e),
    }
  }

  fn summary_fallback(&self, summary: Summary) -> Fetched<Value> {
    if summary == Summary::Profile {
      let stored = self
        .session
        .user()
        .ok()
        .flatten()
        .and_then(|user| serde_json::to_value(user).ok());
      if let Some(user) = stored {
        return Fetched::from_fallback(user);
      }
    }
    Fetched::unavailable(json!({}))
  }

  /// Create a record. When the backend is unreachable the payload is saved
  /// to the local mirror with a generated `id` and `timestamp` instead.
  ///
  /// Generated ids are epoch milliseconds and can collide for calls less
  /// than a millisecond apart.
  pub async fn create(&self, collection: Collection, payload: Value) -> ClientResult<Saved> {
    if !payload.is_object() {
      return Err(ClientError::validation("payload", "must be a JSON object"));
    }

    match self.remote.create(collection, &payload).await {
      Ok(created) => {
        self.invalidate(collection);
        Ok(Saved::Remote(created))
      }
      Err(e) if self.policy.fallback_on_write(&e) => {
        let record = self.stamp(payload);
        self.mirror.append(collection, record.clone())?;
        self.invalidate(collection);
        warn!(key = collection.cache_key(), error = %e, "backend unreachable, saved locally");
        Ok(Saved::Local(record))
      }
      Err(e) => Err(e),
    }
  }

  fn stamp(&self, mut payload: Value) -> Value {
    let now = self.clock.now();
    if let Some(fields) = payload.as_object_mut() {
      fields.insert("id".to_string(), json!(now.timestamp_millis()));
      fields.insert(
        "timestamp".to_string(),
        json!(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
      );
    }
    payload
  }

  pub async fn update(&self, collection: Collection, id: &str, payload: &Value) -> ClientResult<Value> {
    let updated = self.remote.update(collection, id, payload).await?;
    self.invalidate(collection);
    Ok(updated)
  }

  pub async fn delete(&self, collection: Collection, id: &str) -> ClientResult<()> {
    self.remote.delete(collection, id).await?;
    self.invalidate(collection);
    Ok(())
  }

  pub async fn verify_bank_account(&self, id: &str, otp: &str) -> ClientResult<Value> {
    let verified = self.remote.verify_bank_account(id, otp).await?;
    self.invalidate(Collection::BankAccounts);
    Ok(verified)
  }

  /// Drop the collection's entry and every aggregate derived from it.
  fn invalidate(&self, collection: Collection) {
    self.cache.invalidate(collection.cache_key());
    for dependent in collection.dependents() {
      self.cache.invalidate_family(dependent.family());
    }
  }

  /// Remove one cache key family (`monthlyTrends` covers every window), or
  /// everything.
  pub fn clear_cache(&self, key: Option<&str>) {
    match key {
      Some(key) => self.cache.invalidate_family(key),
      None => self.cache.clear(),
    }
  }

  /// Drop everything cached and reload the dashboard.
  pub async fn sync_all(&self) -> ClientResult<Fetched<Value>> {
    debug!("syncing with backend");
    self.clear_cache(None);
    self.summary(Summary::DashboardOverview, false).await
  }
}

fn into_records(value: Value) -> ClientResult<Vec<Value>> {
  match value {
    Value::Array(records) => Ok(records),
    Value::Null => Ok(Vec::new()),
    other => Err(ClientError::Decode(format!(
      "expected a list, got {}",
      json_kind(&other)
    ))),
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "a list",
    Value::Object(_) => "an object",
  }
}
