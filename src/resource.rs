//! Resource kinds known to the client.
//!
//! Records themselves stay opaque `serde_json::Value`s; the backend owns
//! their schema.

use std::fmt;
use std::str::FromStr;

/// List-valued resources with full CRUD and a local fallback copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
  Incomes,
  Expenses,
  Goals,
  Investments,
  BankAccounts,
}

impl Collection {
  pub const ALL: [Collection; 5] = [
    Collection::Incomes,
    Collection::Expenses,
    Collection::Goals,
    Collection::Investments,
    Collection::BankAccounts,
  ];

  /// Cache key, also the key of the fallback record in the local store.
  pub fn cache_key(self) -> &'static str {
    match self {
      Collection::Incomes => "incomes",
      Collection::Expenses => "expenses",
      Collection::Goals => "goals",
      Collection::Investments => "investments",
      Collection::BankAccounts => "accounts",
    }
  }

  /// Aggregates derived from this collection. A mutation invalidates them too.
  pub fn dependents(self) -> &'static [Summary] {
    match self {
      Collection::Incomes | Collection::Expenses => &[
        Summary::DashboardOverview,
        Summary::MonthlyTrends { months: 0 },
      ],
      Collection::Goals | Collection::Investments | Collection::BankAccounts => &[],
    }
  }

  /// Singular label for messages.
  pub fn label(self) -> &'static str {
    match self {
      Collection::Incomes => "income",
      Collection::Expenses => "expense",
      Collection::Goals => "goal",
      Collection::Investments => "investment",
      Collection::BankAccounts => "bank account",
    }
  }
}

impl fmt::Display for Collection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.cache_key())
  }
}

impl FromStr for Collection {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "income" | "incomes" => Ok(Collection::Incomes),
      "expense" | "expenses" => Ok(Collection::Expenses),
      "goal" | "goals" => Ok(Collection::Goals),
      "investment" | "investments" => Ok(Collection::Investments),
      "account" | "accounts" | "bank-accounts" => Ok(Collection::BankAccounts),
      other => Err(format!("unknown resource '{}'", other)),
    }
  }
}

/// Single-valued aggregates computed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Summary {
  DashboardOverview,
  /// Cached per window, one entry for each `months` value.
  MonthlyTrends { months: u32 },
  Profile,
}

impl Summary {
  /// Key family shared by every entry of this kind. Invalidating the family
  /// drops all of them.
  pub fn family(self) -> &'static str {
    match self {
      Summary::DashboardOverview => "dashboard",
      Summary::MonthlyTrends { .. } => "monthlyTrends",
      Summary::Profile => "user",
    }
  }

  /// Entry key. Trends windows are keyed `monthlyTrends:<months>`.
  pub fn cache_key(self) -> String {
    match self {
      Summary::MonthlyTrends { months } => format!("{}:{}", self.family(), months),
      other => other.family().to_string(),
    }
  }
}

/// Every cache key family the client uses.
pub fn all_cache_keys() -> Vec<&'static str> {
  let mut keys: Vec<&'static str> = Collection::ALL.iter().map(|c| c.cache_key()).collect();
  keys.extend([
    Summary::DashboardOverview.family(),
    Summary::MonthlyTrends { months: 0 }.family(),
    Summary::Profile.family(),
  ]);
  keys
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_transactions_invalidate_dashboard_and_trends() {
    for collection in [Collection::Incomes, Collection::Expenses] {
      let keys: Vec<_> = collection.dependents().iter().map(|s| s.family()).collect();
      assert_eq!(keys, vec!["dashboard", "monthlyTrends"]);
    }
    assert!(Collection::Goals.dependents().is_empty());
  }

  #[test]
  fn test_trends_windows_have_distinct_keys() {
    assert_eq!(Summary::MonthlyTrends { months: 12 }.cache_key(), "monthlyTrends:12");
    assert_ne!(
      Summary::MonthlyTrends { months: 3 }.cache_key(),
      Summary::MonthlyTrends { months: 12 }.cache_key()
    );
    assert_eq!(Summary::DashboardOverview.cache_key(), "dashboard");
  }

  #[test]
  fn test_parse_accepts_singular_and_plural() {
    assert_eq!("expense".parse::<Collection>().unwrap(), Collection::Expenses);
    assert_eq!("Accounts".parse::<Collection>().unwrap(), Collection::BankAccounts);
    assert!("budgets".parse::<Collection>().is_err());
  }

  #[test]
  fn test_cache_keys_are_unique() {
    let mut keys = all_cache_keys();
    let len = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), len);
  }
}
