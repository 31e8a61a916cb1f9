use chrono::Local;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::api::{ApiService, TransactionKind};
use crate::cache::{CacheStorage, CacheStore, Fetched, NoopStorage, SqliteStorage};
use crate::cli::{
  AddCommand, AdminCommand, CacheCommand, Command, GoalsCommand, InvestCommand, PasswordCommand,
  SettingsCommand,
};
use crate::config::{Config, API_BASE_URL_KEY};
use crate::connectivity::{wait_for_backend, ConnectionStatus, RetryPolicy};
use crate::data::{DataService, Saved, StoreMirror};
use crate::db::Database;
use crate::error::ClientError;
use crate::render;
use crate::resource::{all_cache_keys, Collection, Summary};
use crate::search;
use crate::session::{AuthSession, SessionStore};
use crate::store::{KeyValueStore, Scope, SqliteStore};
use crate::validation::is_valid_email;

/// Everything a command needs, wired once per invocation.
pub struct App {
  config: Config,
  api: ApiService,
  data: DataService,
  session: SessionStore,
  /// Durable local scope: settings and fallback records
  local: Arc<dyn KeyValueStore>,
  /// Base URL given on the command line, if any
  api_override: Option<String>,
}

impl App {
  pub fn new(config: Config, db: Arc<Database>, api_override: Option<String>) -> Result<Self> {
    let session_store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::new(db.clone(), Scope::Session));
    let local: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::new(db.clone(), Scope::Local));
    let session = SessionStore::new(session_store);

    let persisted = local.get(API_BASE_URL_KEY)?;
    let base_url = config.resolve_base_url(api_override.as_deref(), persisted.as_deref())?;
    info!(base_url = %base_url, environment = ?config.environment, "starting");

    let api = ApiService::new(base_url, session.clone())?;

    let storage: Arc<dyn CacheStorage> = if config.cache.enabled {
      Arc::new(SqliteStorage::new(db))
    } else {
      debug!("resource cache disabled");
      Arc::new(NoopStorage)
    };
    let cache = CacheStore::new(storage).with_ttl(config.cache_ttl());

    let data = DataService::new(
      Arc::new(api.clone()),
      Arc::new(StoreMirror::new(local.clone())),
      cache,
      session.clone(),
    );

    Ok(Self {
      config,
      api,
      data,
      session,
      local,
      api_override,
    })
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Login { username, password } => self.login(&username, password).await,
      Command::Register(form) => {
        let password = match form.password.clone() {
          Some(p) => p,
          None => Config::get_password()?,
        };
        let payload = form.validate(&password)?;
        let response = self.api.register(&payload).await?;
        println!("{}", message_or(&response, "registration successful, you can now log in"));
        Ok(())
      }
      Command::Logout => {
        self.api.logout().await;
        self.data.clear_cache(None);
        println!("logged out");
        Ok(())
      }
      Command::Whoami { refresh } => {
        self.require_login()?;
        let profile = self.data.summary(Summary::Profile, refresh).await?;
        print_fetched(&profile, render::pretty(&profile.data));
        Ok(())
      }
      Command::UpdateProfile { json } => {
        self.require_login()?;
        let updated = self.api.update_profile(&parse_object(&json)?).await?;
        self.data.clear_cache(Some(Summary::Profile.family()));
        println!("{}", render::pretty(&updated));
        Ok(())
      }
      Command::Refresh => {
        self.require_login()?;
        self.api.refresh_token().await?;
        println!("session renewed");
        Ok(())
      }
      Command::Status { once } => self.status(once).await,

      Command::List { resource, refresh } => {
        self.require_login()?;
        let fetched = self.data.get(resource, refresh).await?;
        print_fetched(&fetched, render::records(resource, &fetched.data));
        Ok(())
      }
      Command::Show { resource, id } => {
        self.require_login()?;
        let record = self.api.get_one(resource, &id).await?;
        println!("{}", render::pretty(&record));
        Ok(())
      }
      Command::Add(add) => {
        self.require_login()?;
        self.add(add).await
      }
      Command::Update { resource, id, json } => {
        self.require_login()?;
        let payload = parse_object(&json)?;
        let updated = self.data.update(resource, &id, &payload).await?;
        println!("updated {} {}", resource.label(), id);
        println!("{}", render::pretty(&updated));
        Ok(())
      }
      Command::Delete { resource, id } => {
        self.require_login()?;
        self.data.delete(resource, &id).await?;
        println!("deleted {} {}", resource.label(), id);
        Ok(())
      }

      Command::Dashboard { refresh } => {
        self.require_login()?;
        let months = self.config.trend_months;
        let (overview, trends) = futures::join!(
          self.data.summary(Summary::DashboardOverview, refresh),
          self.data.summary(Summary::MonthlyTrends { months }, refresh)
        );
        let overview = overview?;
        print_fetched(&overview, render::pretty(&overview.data));
        // A trends failure does not hide the overview
        match trends {
          Ok(trends) => {
            println!("\nmonthly trends ({} months)", months);
            print_fetched(&trends, render::pretty(&trends.data));
          }
          Err(e) => eprintln!("monthly trends unavailable: {}", e),
        }
        Ok(())
      }
      Command::Trends { months, refresh } => {
        self.require_login()?;
        let months = months.unwrap_or(self.config.trend_months);
        if months == 0 {
          return Err(ClientError::validation("months", "must be at least 1").into());
        }
        let trends = self.data.summary(Summary::MonthlyTrends { months }, refresh).await?;
        print_fetched(&trends, render::pretty(&trends.data));
        Ok(())
      }
      Command::Spending => {
        self.require_login()?;
        println!("{}", render::pretty(&self.api.spending_analysis().await?));
        Ok(())
      }
      Command::Insights => {
        self.require_login()?;
        println!("{}", render::pretty(&self.api.insights().await?));
        Ok(())
      }

      Command::Recent { kind, limit } => {
        self.require_login()?;
        let recent = self.api.recent(kind, limit).await?;
        print_records(kind, &recent);
        Ok(())
      }
      Command::Categories { kind } => {
        self.require_login()?;
        let categories = self.api.categories(kind).await?;
        match categories.as_array() {
          Some(list) => {
            for category in list {
              match category.as_str() {
                Some(name) => println!("{}", name),
                None => println!("{}", category),
              }
            }
          }
          None => println!("{}", render::pretty(&categories)),
        }
        Ok(())
      }
      Command::ByCategory { kind, category } => {
        self.require_login()?;
        let records = self.api.by_category(kind, &category).await?;
        print_records(kind, &records);
        Ok(())
      }
      Command::Search { kind, filter, refresh } => {
        self.require_login()?;
        let fetched = self.data.get(kind.into(), refresh).await?;
        let today = Local::now().date_naive();
        let found = search::search(kind, fetched.data.clone(), &filter, today);
        print_fetched(&fetched, render::records(kind.into(), &found));
        println!("{}", search::summarize(kind, &found, today));
        Ok(())
      }
      Command::Range { kind, start, end } => {
        self.require_login()?;
        if start > end {
          return Err(ClientError::validation("start", "must not be after the end date").into());
        }
        let records = self.api.date_range(kind, start, end).await?;
        print_records(kind, &records);
        Ok(())
      }

      Command::Goals(goals) => {
        self.require_login()?;
        let value = match goals {
          GoalsCommand::Active => {
            let active = self.api.active_goals().await?;
            if let Some(list) = active.as_array() {
              println!("{}", render::records(Collection::Goals, list));
              return Ok(());
            }
            active
          }
          GoalsCommand::Stats => self.api.goal_stats().await?,
        };
        println!("{}", render::pretty(&value));
        Ok(())
      }
      Command::Invest(invest) => {
        self.require_login()?;
        let value = match invest {
          InvestCommand::Recommendations => self.api.investment_recommendations().await?,
          InvestCommand::Capacity => self.api.investment_capacity().await?,
          InvestCommand::RiskProfiles => self.api.risk_profiles().await?,
        };
        println!("{}", render::pretty(&value));
        Ok(())
      }

      Command::VerifyAccount { id, otp } => {
        self.require_login()?;
        if otp.trim().is_empty() {
          return Err(ClientError::validation("otp", "Please enter the verification code").into());
        }
        let verified = self.data.verify_bank_account(&id, otp.trim()).await?;
        println!("{}", message_or(&verified, "bank account verified"));
        Ok(())
      }

      Command::Password(PasswordCommand::Forgot { email }) => {
        let email = email.trim();
        if !is_valid_email(email) {
          return Err(ClientError::validation("email", "Please enter a valid email address").into());
        }
        let response = self.api.request_password_reset(email).await?;
        println!(
          "{}",
          message_or(&response, "if the address is registered, a reset link has been sent")
        );
        Ok(())
      }
      Command::Password(PasswordCommand::Reset(form)) => {
        let (token, new_password) = form.validate()?;
        let response = self.api.confirm_password_reset(&token, &new_password).await?;
        println!("{}", message_or(&response, "password updated, you can now log in"));
        Ok(())
      }

      Command::Admin(admin) => {
        self.require_admin()?;
        self.admin(admin).await
      }

      Command::Cache(CacheCommand::Clear { key }) => {
        if let Some(key) = key.as_deref() {
          if !all_cache_keys().contains(&key) {
            return Err(eyre!(
              "unknown cache key '{}', expected one of: {}",
              key,
              all_cache_keys().join(", ")
            ));
          }
        }
        self.data.clear_cache(key.as_deref());
        println!("cache cleared");
        Ok(())
      }
      Command::Sync => {
        self.require_login()?;
        let overview = self.data.sync_all().await?;
        print_fetched(&overview, render::pretty(&overview.data));
        Ok(())
      }

      Command::Settings(settings) => self.settings(settings),
    }
  }

  async fn login(&self, username: &str, password: Option<String>) -> Result<()> {
    let username = username.trim();
    if username.is_empty() {
      return Err(ClientError::validation("username", "Please enter your username or email").into());
    }
    if username.contains('@') && !is_valid_email(username) {
      return Err(ClientError::validation("username", "Please enter a valid email address").into());
    }
    let password = match password {
      Some(p) => p,
      None => Config::get_password()?,
    };
    if password.is_empty() {
      return Err(ClientError::validation("password", "Please enter your password").into());
    }

    let payload = self.api.login(username, &password).await?;
    let Some(session) = AuthSession::from_login_payload(&payload) else {
      return Err(eyre!("{}", message_or(&payload, "login response carried no token")));
    };

    // Cached data may belong to a previous user
    self.data.clear_cache(None);
    println!("logged in as {}", session.user.display_name());
    Ok(())
  }

  async fn status(&self, once: bool) -> Result<()> {
    let policy = if once {
      RetryPolicy::once()
    } else {
      RetryPolicy::default()
    };

    let status = wait_for_backend(policy, || self.api.check_connection()).await;
    let attempts = status.attempts();
    if let ConnectionStatus::Unreachable { last_error, .. } = status {
      return Err(eyre!(
        "backend at {} unreachable after {} attempts: {}",
        self.api.base_url(),
        attempts,
        last_error
      ));
    }
    println!(
      "connected to {} ({} attempt{})",
      self.api.base_url(),
      attempts,
      if attempts == 1 { "" } else { "s" }
    );
    if !self.session.is_authenticated() {
      println!("not logged in");
    }
    Ok(())
  }

  async fn add(&self, add: AddCommand) -> Result<()> {
    let today = Local::now().date_naive();
    let (collection, payload) = match add {
      AddCommand::Income(form) => (Collection::Incomes, form.validate(today)?),
      AddCommand::Expense(form) => (Collection::Expenses, form.validate(today)?),
      AddCommand::Goal(form) => (Collection::Goals, form.validate(today)?),
      AddCommand::Investment(form) => (Collection::Investments, form.validate(today)?),
      AddCommand::Account(form) => (Collection::BankAccounts, form.validate()?),
    };

    let saved = self.data.create(collection, payload).await?;
    println!("{}", saved_message(collection, &saved));
    println!("{}", render::record_line(collection, saved.record()));
    Ok(())
  }

  async fn admin(&self, admin: AdminCommand) -> Result<()> {
    let value = match admin {
      AdminCommand::Ping => self.api.admin_ping().await?,
      AdminCommand::Users => self.api.list_users().await?,
      AdminCommand::CreateUser { json } => self.api.create_user(&parse_object(&json)?).await?,
      AdminCommand::UpdateUser { id, json } => self.api.update_user(&id, &parse_object(&json)?).await?,
      AdminCommand::DeleteUser { id } => {
        self.api.delete_user(&id).await?;
        println!("deleted user {}", id);
        return Ok(());
      }
    };
    println!("{}", render::pretty(&value));
    Ok(())
  }

  fn settings(&self, settings: SettingsCommand) -> Result<()> {
    match settings {
      SettingsCommand::Show => {
        let persisted = self.local.get(API_BASE_URL_KEY)?;
        println!("environment:   {:?}", self.config.environment);
        println!("api url:       {}", self.api.base_url());
        if let Some(url) = &self.api_override {
          println!("  from --api-url: {}", url);
        }
        println!("  persisted:   {}", persisted.as_deref().unwrap_or("-"));
        println!("cache:         {}", if self.config.cache.enabled { "enabled" } else { "disabled" });
        println!("cache ttl:     {}s", self.config.cache.ttl_secs);
        println!("trend months:  {}", self.config.trend_months);
        match Database::data_dir() {
          Ok(dir) => println!("data dir:      {}", dir.display()),
          Err(e) => println!("data dir:      unavailable ({})", e),
        }
        match self.session.user()? {
          Some(user) if self.session.is_authenticated() => println!("user:          {}", user.display_name()),
          _ => println!("user:          not logged in"),
        }
        Ok(())
      }
      SettingsCommand::SetApiUrl { url } => {
        let parsed = Url::parse(url.trim()).map_err(|e| eyre!("Invalid API base URL {:?}: {}", url, e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
          return Err(eyre!("API base URL must use http or https"));
        }
        self.local.set(API_BASE_URL_KEY, parsed.as_str())?;
        // Cached payloads came from the previous backend
        self.data.clear_cache(None);
        println!("api url set to {}", parsed);
        Ok(())
      }
      SettingsCommand::ResetApiUrl => {
        self.local.remove(API_BASE_URL_KEY)?;
        self.data.clear_cache(None);
        println!("api url reset");
        Ok(())
      }
    }
  }

  fn require_login(&self) -> Result<(), ClientError> {
    if self.session.is_authenticated() {
      Ok(())
    } else {
      Err(ClientError::NotLoggedIn)
    }
  }

  fn require_admin(&self) -> Result<()> {
    self.require_login()?;
    match self.session.user()? {
      Some(user) if user.is_admin() => Ok(()),
      _ => Err(eyre!("admin role required")),
    }
  }
}

fn print_fetched<T>(fetched: &Fetched<T>, body: String) {
  if fetched.is_degraded() {
    if let Some(note) = render::source_note(fetched.source) {
      eprintln!("warning: {}", note);
    }
  }
  println!("{}", body);
}

fn saved_message(collection: Collection, saved: &Saved) -> String {
  if saved.is_local() {
    format!("{} saved locally (offline mode)", collection.label())
  } else {
    format!("{} added", collection.label())
  }
}

fn print_records(kind: TransactionKind, value: &Value) {
  match value.as_array() {
    Some(list) => println!("{}", render::records(kind.into(), list)),
    None => println!("{}", render::pretty(value)),
  }
}

/// The backend's `message` field, or `default`.
fn message_or(response: &Value, default: &str) -> String {
  response
    .get("message")
    .and_then(Value::as_str)
    .filter(|m| !m.is_empty())
    .unwrap_or(default)
    .to_string()
}

fn parse_object(raw: &str) -> Result<Value, ClientError> {
  match serde_json::from_str::<Value>(raw) {
    Ok(value) if value.is_object() => Ok(value),
    Ok(_) => Err(ClientError::validation("json", "must be a JSON object")),
    Err(e) => Err(ClientError::validation("json", format!("invalid JSON: {}", e))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn app(uri: &str) -> App {
    let config = Config::default();
    let db = Arc::new(Database::in_memory().unwrap());
    App::new(config, db, Some(uri.to_string())).unwrap()
  }

  #[test]
  fn test_parse_object() {
    assert_eq!(parse_object(r#"{"a":1}"#).unwrap(), json!({"a": 1}));
    assert!(parse_object("[1]").is_err());
    assert!(parse_object("{").is_err());
  }

  #[test]
  fn test_saved_message_flags_offline_saves() {
    let local = Saved::Local(json!({"id": 1}));
    let remote = Saved::Remote(json!({"id": 2}));
    assert_eq!(saved_message(Collection::Expenses, &local), "expense saved locally (offline mode)");
    assert_eq!(saved_message(Collection::Expenses, &remote), "expense added");
  }

  #[test]
  fn test_message_or() {
    assert_eq!(message_or(&json!({"message": "done"}), "x"), "done");
    assert_eq!(message_or(&json!({"message": ""}), "x"), "x");
    assert_eq!(message_or(&Value::Null, "x"), "x");
  }

  #[test]
  fn test_persisted_url_is_used_without_override() {
    let db = Arc::new(Database::in_memory().unwrap());
    SqliteStore::new(db.clone(), Scope::Local)
      .set(API_BASE_URL_KEY, "https://saved.example.com/")
      .unwrap();

    let app = App::new(Config::default(), db, None).unwrap();
    assert_eq!(app.api.base_url().as_str(), "https://saved.example.com/");
  }

  #[tokio::test]
  async fn test_data_commands_need_a_session() {
    let app = app("http://127.0.0.1:1");
    let err = app
      .run(Command::List {
        resource: Collection::Expenses,
        refresh: false,
      })
      .await
      .unwrap_err();
    assert_eq!(err.downcast_ref::<ClientError>(), Some(&ClientError::NotLoggedIn));
  }

  #[tokio::test]
  async fn test_login_then_admin_requires_role() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/auth/login"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "token": "abc",
        "username": "jdoe",
        "role": "ROLE_USER"
      })))
      .mount(&server)
      .await;

    let app = app(&server.uri());
    app.login("jdoe", Some("secret".to_string())).await.unwrap();
    assert!(app.session.is_authenticated());

    let err = app.run(Command::Admin(AdminCommand::Ping)).await.unwrap_err();
    assert!(err.to_string().contains("admin role required"));
  }

  #[tokio::test]
  async fn test_login_without_token_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/auth/login"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Account locked"})))
      .mount(&server)
      .await;

    let app = app(&server.uri());
    let err = app.login("jdoe", Some("secret".to_string())).await.unwrap_err();
    assert!(err.to_string().contains("Account locked"));
    assert!(!app.session.is_authenticated());
  }

  #[tokio::test]
  async fn test_set_api_url_persists() {
    let app = app("http://127.0.0.1:1");
    app
      .settings(SettingsCommand::SetApiUrl {
        url: "https://finance.example.com".to_string(),
      })
      .unwrap();
    assert_eq!(
      app.local.get(API_BASE_URL_KEY).unwrap().as_deref(),
      Some("https://finance.example.com/")
    );

    assert!(app
      .settings(SettingsCommand::SetApiUrl {
        url: "ftp://files.example.com".to_string()
      })
      .is_err());

    app.settings(SettingsCommand::ResetApiUrl).unwrap();
    assert_eq!(app.local.get(API_BASE_URL_KEY).unwrap(), None);
  }

  #[tokio::test]
  async fn test_search_filters_the_cached_list() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/auth/login"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc", "username": "jdoe"})))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/expenses"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        {"id": 1, "date": "2024-01-02", "amount": 20, "category": "UTILITIES"}
      ])))
      .expect(1)
      .mount(&server)
      .await;

    let app = app(&server.uri());
    app.login("jdoe", Some("secret".to_string())).await.unwrap();
    for category in ["bills", "food"] {
      let filter = search::SearchFilter {
        category: Some(category.to_string()),
        ..Default::default()
      };
      app
        .run(Command::Search {
          kind: TransactionKind::Expense,
          filter,
          refresh: false,
        })
        .await
        .unwrap();
    }
  }

  #[tokio::test]
  async fn test_clear_trends_family_is_accepted() {
    let app = app("http://127.0.0.1:1");
    app
      .run(Command::Cache(CacheCommand::Clear {
        key: Some("monthlyTrends".to_string()),
      }))
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn test_unknown_cache_key_is_rejected() {
    let app = app("http://127.0.0.1:1");
    let err = app
      .run(Command::Cache(CacheCommand::Clear {
        key: Some("budgets".to_string()),
      }))
      .await
      .unwrap_err();
    assert!(err.to_string().contains("unknown cache key"));
  }
}
