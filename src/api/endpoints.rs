//! Backend endpoint paths.

use std::borrow::Cow;

use crate::error::{ClientError, ClientResult};
use crate::resource::Collection;

// Authentication
pub const LOGIN: &str = "/api/auth/login";
pub const REGISTER: &str = "/api/auth/register";
pub const LOGOUT: &str = "/api/auth/logout";
pub const REFRESH: &str = "/api/auth/refresh";
pub const ME: &str = "/api/auth/me";
pub const FORGOT_PASSWORD: &str = "/api/auth/forgot-password";
pub const RESET_PASSWORD: &str = "/api/auth/reset-password";

pub const HEALTH: &str = "/api/public/health";

// Dashboard & analytics
pub const DASHBOARD_OVERVIEW: &str = "/api/dashboard/overview";
pub const DASHBOARD_SPENDING_ANALYSIS: &str = "/api/dashboard/spending-analysis";
pub const DASHBOARD_MONTHLY_TRENDS: &str = "/api/dashboard/monthly-trends";
pub const DASHBOARD_INSIGHTS: &str = "/api/dashboard/insights";

// Goals
pub const GOALS_ACTIVE: &str = "/api/goals/active";
pub const GOALS_STATS: &str = "/api/goals/stats";

// Investments
pub const INVEST_RECOMMENDATIONS: &str = "/api/investments/recommendations";
pub const INVEST_CAPACITY: &str = "/api/investments/capacity";
pub const INVEST_RISK_PROFILES: &str = "/api/investments/risk-profiles";

// Bank accounts
pub const MY_BANK_ACCOUNTS: &str = "/api/bank-accounts/my";

// Admin
pub const USERS: &str = "/api/users";
pub const ADMIN_PING: &str = "/api/admin/ping";

/// Income and expense share the same query variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TransactionKind {
  Income,
  Expense,
}

impl TransactionKind {
  pub fn base(self) -> &'static str {
    match self {
      TransactionKind::Income => "/api/income",
      TransactionKind::Expense => "/api/expenses",
    }
  }
}

impl From<TransactionKind> for Collection {
  fn from(kind: TransactionKind) -> Self {
    match kind {
      TransactionKind::Income => Collection::Incomes,
      TransactionKind::Expense => Collection::Expenses,
    }
  }
}

/// Base path for create, update and delete.
pub fn collection_base(collection: Collection) -> &'static str {
  match collection {
    Collection::Incomes => "/api/income",
    Collection::Expenses => "/api/expenses",
    Collection::Goals => "/api/goals",
    Collection::Investments => "/api/investments",
    Collection::BankAccounts => "/api/bank-accounts",
  }
}

/// Path listing the current user's records.
pub fn collection_list(collection: Collection) -> &'static str {
  match collection {
    Collection::BankAccounts => MY_BANK_ACCOUNTS,
    other => collection_base(other),
  }
}

/// An id as a single path segment. `/`, `?` and `%` are escaped; dot
/// segments are refused because the URL parser would resolve them.
fn segment(id: &str) -> ClientResult<Cow<'_, str>> {
  match id.trim() {
    "" | "." | ".." => Err(ClientError::validation("id", "must be a record id")),
    id => Ok(urlencoding::encode(id)),
  }
}

pub fn collection_item(collection: Collection, id: &str) -> ClientResult<String> {
  Ok(format!("{}/{}", collection_base(collection), segment(id)?))
}

pub fn verify_bank_account(id: &str) -> ClientResult<String> {
  Ok(format!(
    "{}/{}/verify",
    collection_base(Collection::BankAccounts),
    segment(id)?
  ))
}

pub fn user(id: &str) -> ClientResult<String> {
  Ok(format!("{}/{}", USERS, segment(id)?))
}
