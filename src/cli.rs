use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::api::TransactionKind;
use crate::resource::Collection;
use crate::search::SearchFilter;
use crate::validation::{
  AccountForm, ExpenseForm, GoalForm, IncomeForm, InvestmentForm, PasswordResetForm,
  RegistrationForm,
};

#[derive(Parser, Debug)]
#[command(name = "fintrackr")]
#[command(about = "Command-line client for the FinTrackr personal finance backend")]
#[command(version)]
pub struct Cli {
  /// Path to config file (default: $XDG_CONFIG_HOME/fintrackr/config.yaml)
  #[arg(short, long, global = true)]
  pub config: Option<PathBuf>,

  /// Backend base URL for this invocation, overriding every other setting
  #[arg(long, global = true)]
  pub api_url: Option<String>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Log in and keep the session for later commands
  Login {
    /// Username or email
    username: String,
    /// Falls back to FINTRACKR_PASSWORD
    #[arg(long)]
    password: Option<String>,
  },

  /// Create an account. Does not log in.
  Register(RegistrationForm),

  /// End the session
  Logout,

  /// Show the logged-in user
  Whoami {
    /// Bypass the cache
    #[arg(long)]
    refresh: bool,
  },

  /// Change profile fields from a JSON body
  UpdateProfile {
    #[arg(long)]
    json: String,
  },

  /// Renew the session token
  Refresh,

  /// Check that the backend is reachable, retrying with backoff
  Status {
    /// Probe once without retrying
    #[arg(long)]
    once: bool,
  },

  /// List incomes, expenses, goals, investments or accounts
  List {
    resource: Collection,
    /// Bypass the cache
    #[arg(long)]
    refresh: bool,
  },

  /// Show a single record
  Show { resource: Collection, id: String },

  /// Add a record
  #[command(subcommand)]
  Add(AddCommand),

  /// Replace a record with a JSON body
  Update {
    resource: Collection,
    id: String,
    /// Record as a JSON object
    #[arg(long)]
    json: String,
  },

  /// Delete a record
  Delete { resource: Collection, id: String },

  /// Financial overview
  Dashboard {
    #[arg(long)]
    refresh: bool,
  },

  /// Month-by-month income and expense totals
  Trends {
    /// Months to include (default from config)
    #[arg(long)]
    months: Option<u32>,
    #[arg(long)]
    refresh: bool,
  },

  /// Spending broken down by category
  Spending,

  /// Personalised financial insights
  Insights,

  /// Most recent incomes or expenses
  Recent {
    kind: TransactionKind,
    #[arg(long, default_value_t = crate::api::DEFAULT_RECENT_LIMIT)]
    limit: u32,
  },

  /// Categories in use for incomes or expenses
  Categories { kind: TransactionKind },

  /// Incomes or expenses in one category
  ByCategory { kind: TransactionKind, category: String },

  /// Filter listed incomes or expenses by period, category and amount
  Search {
    kind: TransactionKind,
    #[command(flatten)]
    filter: SearchFilter,
    /// Bypass the cache
    #[arg(long)]
    refresh: bool,
  },

  /// Incomes or expenses between two dates (YYYY-MM-DD, inclusive)
  Range {
    kind: TransactionKind,
    start: NaiveDate,
    end: NaiveDate,
  },

  /// Goal views
  #[command(subcommand)]
  Goals(GoalsCommand),

  /// Investment views
  #[command(subcommand)]
  Invest(InvestCommand),

  /// Verify a bank account with the one-time code sent by the bank
  VerifyAccount { id: String, otp: String },

  /// Password reset
  #[command(subcommand)]
  Password(PasswordCommand),

  /// Administration (admin role required)
  #[command(subcommand)]
  Admin(AdminCommand),

  /// Local cache maintenance
  #[command(subcommand)]
  Cache(CacheCommand),

  /// Drop the cache and reload the dashboard
  Sync,

  /// Inspect or change client settings
  #[command(name = "config", subcommand)]
  Settings(SettingsCommand),
}

#[derive(Subcommand, Debug)]
pub enum AddCommand {
  Income(IncomeForm),
  Expense(ExpenseForm),
  Goal(GoalForm),
  Investment(InvestmentForm),
  Account(AccountForm),
}

#[derive(Subcommand, Debug)]
pub enum GoalsCommand {
  /// Goals not yet reached
  Active,
  /// Progress statistics
  Stats,
}

#[derive(Subcommand, Debug)]
pub enum InvestCommand {
  Recommendations,
  /// How much can be invested each month
  Capacity,
  RiskProfiles,
}

#[derive(Subcommand, Debug)]
pub enum PasswordCommand {
  /// Send a reset email
  Forgot { email: String },
  /// Set a new password with the token from the email
  Reset(PasswordResetForm),
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
  /// Check admin access
  Ping,
  /// List all users
  Users,
  /// Create a user from a JSON body
  CreateUser {
    #[arg(long)]
    json: String,
  },
  /// Update a user from a JSON body
  UpdateUser {
    id: String,
    #[arg(long)]
    json: String,
  },
  DeleteUser { id: String },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
  /// Remove one cache key family (e.g. expenses, monthlyTrends), or everything
  Clear { key: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
  /// Print the effective settings
  Show,
  /// Persist a backend base URL for later invocations
  SetApiUrl { url: String },
  /// Forget the persisted base URL
  ResetApiUrl,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::search::{AmountMode, Period};
  use clap::CommandFactory;

  #[test]
  fn test_cli_definition_is_consistent() {
    Cli::command().debug_assert();
  }

  #[test]
  fn test_parse_list_accepts_aliases() {
    let cli = Cli::parse_from(["fintrackr", "list", "bank-accounts", "--refresh"]);
    match cli.command {
      Command::List { resource, refresh } => {
        assert_eq!(resource, Collection::BankAccounts);
        assert!(refresh);
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_parse_add_expense() {
    let cli = Cli::parse_from([
      "fintrackr",
      "--api-url",
      "http://localhost:9999",
      "add",
      "expense",
      "--amount",
      "12.5",
      "--category",
      "FOOD",
    ]);
    assert_eq!(cli.api_url.as_deref(), Some("http://localhost:9999"));
    match cli.command {
      Command::Add(AddCommand::Expense(form)) => {
        assert_eq!(form.amount, "12.5");
        assert_eq!(form.category, "FOOD");
        assert!(form.date.is_none());
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_parse_range_dates() {
    let cli = Cli::parse_from(["fintrackr", "range", "income", "2024-01-01", "2024-01-31"]);
    match cli.command {
      Command::Range { kind, start, end } => {
        assert_eq!(kind, TransactionKind::Income);
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_parse_search_filters() {
    let cli = Cli::parse_from([
      "fintrackr",
      "search",
      "expense",
      "--period",
      "last7days",
      "--category",
      "bills",
      "--amount",
      "20",
      "--mode",
      "above",
    ]);
    match cli.command {
      Command::Search { kind, filter, refresh } => {
        assert_eq!(kind, TransactionKind::Expense);
        assert_eq!(filter.period, Period::Last7Days);
        assert_eq!(filter.category.as_deref(), Some("bills"));
        assert_eq!(filter.amount, Some(20.0));
        assert_eq!(filter.mode, AmountMode::Above);
        assert!(!refresh);
      }
      other => panic!("unexpected command {:?}", other),
    }

    assert!(Cli::try_parse_from(["fintrackr", "search", "income", "--mode", "below"]).is_err());
  }

  #[test]
  fn test_unknown_resource_is_rejected() {
    assert!(Cli::try_parse_from(["fintrackr", "list", "budgets"]).is_err());
  }
}
