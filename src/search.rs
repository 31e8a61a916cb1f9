//! Client-side search over listed incomes and expenses.

use chrono::{Datelike, Duration, NaiveDate};
use clap::{Args, ValueEnum};
use serde_json::Value;
use std::cmp::Reverse;
use std::fmt;

use crate::api::TransactionKind;

/// Amounts closer than this count as equal.
const EXACT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Period {
  #[default]
  All,
  /// Today and the seven days before it
  #[value(name = "last7days")]
  Last7Days,
  /// The current calendar month
  ThisMonth,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum AmountMode {
  /// Within one cent of the amount
  #[default]
  Exact,
  /// At least the amount
  Above,
  /// At most the amount
  Below,
}

#[derive(Debug, Clone, Default, Args)]
pub struct SearchFilter {
  #[arg(long, value_enum, default_value_t = Period::All)]
  pub period: Period,
  /// Category name, case-insensitive. Short names such as BILLS are accepted.
  #[arg(long)]
  pub category: Option<String>,
  #[arg(long)]
  pub amount: Option<f64>,
  /// How `--amount` is compared
  #[arg(long, value_enum, default_value_t = AmountMode::Exact, requires = "amount")]
  pub mode: AmountMode,
}

/// Backend category names for the short names people type.
fn category_alias(kind: TransactionKind, category: &str) -> Option<&'static str> {
  match (kind, category) {
    (TransactionKind::Expense, "TRANSPORT") => Some("TRANSPORTATION"),
    (TransactionKind::Expense, "BILLS") => Some("UTILITIES"),
    (TransactionKind::Income, "INVESTMENT") => Some("INVESTMENTS"),
    _ => None,
  }
}

fn category_of(kind: TransactionKind, record: &Value) -> Option<&str> {
  let keys: &[&str] = match kind {
    TransactionKind::Income => &["category", "type"],
    TransactionKind::Expense => &["category"],
  };
  keys
    .iter()
    .find_map(|key| record.get(*key).and_then(Value::as_str))
    .filter(|c| !c.is_empty())
}

fn date_of(record: &Value) -> Option<NaiveDate> {
  let raw = record.get("date")?.as_str()?;
  NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok()
}

/// Missing or non-numeric amounts count as zero.
fn amount_of(record: &Value) -> f64 {
  match record.get("amount") {
    Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
    Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
    _ => 0.0,
  }
}

fn same_month(date: NaiveDate, today: NaiveDate) -> bool {
  date.year() == today.year() && date.month() == today.month()
}

impl SearchFilter {
  fn matches(&self, kind: TransactionKind, record: &Value, today: NaiveDate) -> bool {
    let in_period = match self.period {
      Period::All => true,
      Period::Last7Days => date_of(record)
        .map(|d| d >= today - Duration::days(7) && d <= today)
        .unwrap_or(false),
      Period::ThisMonth => date_of(record).map(|d| same_month(d, today)).unwrap_or(false),
    };
    in_period && self.matches_category(kind, record) && self.matches_amount(record)
  }

  fn matches_category(&self, kind: TransactionKind, record: &Value) -> bool {
    let Some(wanted) = self.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) else {
      return true;
    };
    let wanted = wanted.to_uppercase();
    let actual = category_of(kind, record).unwrap_or("").to_uppercase();
    actual == wanted || category_alias(kind, &wanted) == Some(actual.as_str())
  }

  fn matches_amount(&self, record: &Value) -> bool {
    let Some(wanted) = self.amount else {
      return true;
    };
    let actual = amount_of(record);
    match self.mode {
      AmountMode::Exact => (actual - wanted).abs() < EXACT_TOLERANCE,
      AmountMode::Above => actual >= wanted,
      AmountMode::Below => actual <= wanted,
    }
  }
}

/// Records matching `filter`, newest first. Undated records go last;
/// records sharing a date keep their reversed listing order.
pub fn search(
  kind: TransactionKind,
  records: Vec<Value>,
  filter: &SearchFilter,
  today: NaiveDate,
) -> Vec<Value> {
  let mut found: Vec<Value> = records
    .into_iter()
    .filter(|r| filter.matches(kind, r, today))
    .collect();
  found.reverse();
  found.sort_by_key(|r| Reverse(date_of(r)));
  found
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSummary {
  pub count: usize,
  pub total: f64,
  pub this_month: f64,
  /// Most frequent category. Ties go to the one seen first.
  pub top_category: Option<String>,
}

pub fn summarize(kind: TransactionKind, records: &[Value], today: NaiveDate) -> SearchSummary {
  let total: f64 = records.iter().map(amount_of).sum();
  let this_month: f64 = records
    .iter()
    .filter(|r| date_of(r).map(|d| same_month(d, today)).unwrap_or(false))
    .map(amount_of)
    .sum();

  let mut counts: Vec<(&str, usize)> = Vec::new();
  for record in records {
    let category = category_of(kind, record).unwrap_or("Other");
    match counts.iter_mut().find(|(c, _)| *c == category) {
      Some((_, n)) => *n += 1,
      None => counts.push((category, 1)),
    }
  }
  let mut top: Option<(&str, usize)> = None;
  for (category, n) in counts {
    if top.map(|(_, best)| n > best).unwrap_or(true) {
      top = Some((category, n));
    }
  }

  SearchSummary {
    count: records.len(),
    total,
    this_month,
    top_category: top.map(|(c, _)| capitalize(c)),
  }
}

fn capitalize(word: &str) -> String {
  let mut chars = word.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    None => String::new(),
  }
}

impl fmt::Display for SearchSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} found, total {:.2}, this month {:.2}, top category {}",
      self.count,
      self.total,
      self.this_month,
      self.top_category.as_deref().unwrap_or("N/A")
    )
  }
}
