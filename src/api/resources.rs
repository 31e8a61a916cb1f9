//! Resource endpoints. Thin wrappers over `ApiService::request`.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};

use super::client::ApiService;
use super::endpoints::{self, TransactionKind};
use crate::data::RemoteSource;
use crate::error::ClientResult;
use crate::resource::{Collection, Summary};

pub const DEFAULT_RECENT_LIMIT: u32 = 5;

impl ApiService {
  // ==========================================================================
  // Collections
  // ==========================================================================

  pub async fn list(&self, collection: Collection) -> ClientResult<Value> {
    self
      .request(Method::GET, endpoints::collection_list(collection), None, true)
      .await
  }

  pub async fn get_one(&self, collection: Collection, id: &str) -> ClientResult<Value> {
    self
      .request(Method::GET, &endpoints::collection_item(collection, id)?, None, true)
      .await
  }

  pub async fn create(&self, collection: Collection, payload: &Value) -> ClientResult<Value> {
    self
      .request(Method::POST, endpoints::collection_base(collection), Some(payload), true)
      .await
  }

  pub async fn update(&self, collection: Collection, id: &str, payload: &Value) -> ClientResult<Value> {
    self
      .request(Method::PUT, &endpoints::collection_item(collection, id)?, Some(payload), true)
      .await
  }

  pub async fn delete(&self, collection: Collection, id: &str) -> ClientResult<()> {
    self
      .request(Method::DELETE, &endpoints::collection_item(collection, id)?, None, true)
      .await
      .map(|_| ())
  }

  // ==========================================================================
  // Income / expense variants
  // ==========================================================================

  pub async fn categories(&self, kind: TransactionKind) -> ClientResult<Value> {
    let path = format!("{}/categories", kind.base());
    self.request(Method::GET, &path, None, true).await
  }

  pub async fn by_category(&self, kind: TransactionKind, category: &str) -> ClientResult<Value> {
    let path = format!("{}/by-category", kind.base());
    self
      .request_with_query(Method::GET, &path, &[("category", category.to_string())], None, true)
      .await
  }

  pub async fn recent(&self, kind: TransactionKind, limit: u32) -> ClientResult<Value> {
    let path = format!("{}/recent", kind.base());
    self
      .request_with_query(Method::GET, &path, &[("limit", limit.to_string())], None, true)
      .await
  }

  pub async fn date_range(
    &self,
    kind: TransactionKind,
    start: NaiveDate,
    end: NaiveDate,
  ) -> ClientResult<Value> {
    let query = [
      ("startDate", start.format("%Y-%m-%d").to_string()),
      ("endDate", end.format("%Y-%m-%d").to_string()),
    ];
    self
      .request_with_query(Method::GET, kind.base(), &query, None, true)
      .await
  }

  // ==========================================================================
  // Goals and investments
  // ==========================================================================

  pub async fn active_goals(&self) -> ClientResult<Value> {
    self.request(Method::GET, endpoints::GOALS_ACTIVE, None, true).await
  }

  pub async fn goal_stats(&self) -> ClientResult<Value> {
    self.request(Method::GET, endpoints::GOALS_STATS, None, true).await
  }

  pub async fn investment_recommendations(&self) -> ClientResult<Value> {
    self
      .request(Method::GET, endpoints::INVEST_RECOMMENDATIONS, None, true)
      .await
  }

  pub async fn investment_capacity(&self) -> ClientResult<Value> {
    self.request(Method::GET, endpoints::INVEST_CAPACITY, None, true).await
  }

  pub async fn risk_profiles(&self) -> ClientResult<Value> {
    self
      .request(Method::GET, endpoints::INVEST_RISK_PROFILES, None, true)
      .await
  }

  // ==========================================================================
  // Dashboard
  // ==========================================================================

  pub async fn dashboard_overview(&self) -> ClientResult<Value> {
    self
      .request(Method::GET, endpoints::DASHBOARD_OVERVIEW, None, true)
      .await
  }

  pub async fn spending_analysis(&self) -> ClientResult<Value> {
    self
      .request(Method::GET, endpoints::DASHBOARD_SPENDING_ANALYSIS, None, true)
      .await
  }

  pub async fn monthly_trends(&self, months: u32) -> ClientResult<Value> {
    self
      .request_with_query(
        Method::GET,
        endpoints::DASHBOARD_MONTHLY_TRENDS,
        &[("months", months.to_string())],
        None,
        true,
      )
      .await
  }

  pub async fn insights(&self) -> ClientResult<Value> {
    self
      .request(Method::GET, endpoints::DASHBOARD_INSIGHTS, None, true)
      .await
  }

  // ==========================================================================
  // Bank accounts
  // ==========================================================================

  pub async fn verify_bank_account(&self, id: &str, otp: &str) -> ClientResult<Value> {
    let body = json!({ "otp": otp });
    self
      .request(Method::POST, &endpoints::verify_bank_account(id)?, Some(&body), true)
      .await
  }

  // ==========================================================================
  // Admin
  // ==========================================================================

  /// Succeeds only for admin accounts.
  pub async fn admin_ping(&self) -> ClientResult<Value> {
    self.request(Method::GET, endpoints::ADMIN_PING, None, true).await
  }

  pub async fn list_users(&self) -> ClientResult<Value> {
    self.request(Method::GET, endpoints::USERS, None, true).await
  }

  pub async fn create_user(&self, user: &Value) -> ClientResult<Value> {
    self
      .request(Method::POST, endpoints::USERS, Some(user), true)
      .await
  }

  pub async fn update_user(&self, id: &str, user: &Value) -> ClientResult<Value> {
    self
      .request(Method::PUT, &endpoints::user(id)?, Some(user), true)
      .await
  }

  pub async fn delete_user(&self, id: &str) -> ClientResult<()> {
    self
      .request(Method::DELETE, &endpoints::user(id)?, None, true)
      .await
      .map(|_| ())
  }
}

#[async_trait]
impl RemoteSource for ApiService {
  async fn list(&self, collection: Collection) -> ClientResult<Value> {
    ApiService::list(self, collection).await
  }

  async fn summary(&self, summary: Summary) -> ClientResult<Value> {
    match summary {
      Summary::DashboardOverview => self.dashboard_overview().await,
      Summary::MonthlyTrends { months } => self.monthly_trends(months).await,
      Summary::Profile => self.profile().await,
    }
  }

  async fn create(&self, collection: Collection, payload: &Value) -> ClientResult<Value> {
    ApiService::create(self, collection, payload).await
  }

  async fn update(&self, collection: Collection, id: &str, payload: &Value) -> ClientResult<Value> {
    ApiService::update(self, collection, id, payload).await
  }

  async fn delete(&self, collection: Collection, id: &str) -> ClientResult<()> {
    ApiService::delete(self, collection, id).await
  }

  async fn verify_bank_account(&self, id: &str, otp: &str) -> ClientResult<Value> {
    ApiService::verify_bank_account(self, id, otp).await
  }
}
