//! Plain-text rendering of backend records for the terminal.

use serde_json::Value;

use crate::cache::Source;
use crate::resource::Collection;

type Columns = &'static [&'static [&'static str]];

const INCOME_COLUMNS: Columns = &[&["id"], &["date"], &["amount"], &["type", "category"], &["source"]];
const EXPENSE_COLUMNS: Columns = &[
  &["id"],
  &["date"],
  &["amount"],
  &["category"],
  &["merchant", "description"],
];
const GOAL_COLUMNS: Columns = &[&["id"], &["name"], &["currentAmount"], &["targetAmount"], &["targetDate"]];
const INVESTMENT_COLUMNS: Columns = &[&["id"], &["name"], &["type"], &["amount"], &["currentValue"]];
const ACCOUNT_COLUMNS: Columns = &[
  &["id"],
  &["name", "accountName"],
  &["bank", "bankName"],
  &["balance"],
  &["currency"],
  &["verified"],
];

/// Columns shown per collection. The first key present wins.
fn columns(collection: Collection) -> Columns {
  match collection {
    Collection::Incomes => INCOME_COLUMNS,
    Collection::Expenses => EXPENSE_COLUMNS,
    Collection::Goals => GOAL_COLUMNS,
    Collection::Investments => INVESTMENT_COLUMNS,
    Collection::BankAccounts => ACCOUNT_COLUMNS,
  }
}

fn cell(value: &Value) -> String {
  match value {
    Value::Null => "-".to_string(),
    Value::String(s) if s.is_empty() => "-".to_string(),
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// One record as a tab-separated line.
pub fn record_line(collection: Collection, record: &Value) -> String {
  columns(collection)
    .iter()
    .map(|candidates| {
      candidates
        .iter()
        .find_map(|key| record.get(*key).filter(|v| !v.is_null()))
        .map(cell)
        .unwrap_or_else(|| "-".to_string())
    })
    .collect::<Vec<_>>()
    .join("\t")
}

pub fn records(collection: Collection, records: &[Value]) -> String {
  if records.is_empty() {
    return format!("no {} found", collection);
  }
  records
    .iter()
    .map(|r| record_line(collection, r))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Any JSON value, indented.
pub fn pretty(value: &Value) -> String {
  serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Warning printed above data that did not come from the backend or a fresh cache.
pub fn source_note(source: Source) -> Option<&'static str> {
  match source {
    Source::Network | Source::Cache => None,
    Source::Fallback => Some("backend unavailable, showing locally saved data"),
    Source::Unavailable => Some("backend unavailable and no local data"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_expense_line() {
    let line = record_line(
      Collection::Expenses,
      &json!({"id": 7, "date": "2024-01-02", "amount": 12.5, "category": "FOOD", "merchant": null, "description": "lunch"}),
    );
    assert_eq!(line, "7\t2024-01-02\t12.5\tFOOD\tlunch");
  }

  #[test]
  fn test_missing_fields_render_as_dash() {
    let line = record_line(Collection::Goals, &json!({"name": "Bike"}));
    assert_eq!(line, "-\tBike\t-\t-\t-");
  }

  #[test]
  fn test_empty_list() {
    assert_eq!(records(Collection::Incomes, &[]), "no incomes found");
  }

  #[test]
  fn test_degraded_sources_have_a_note() {
    assert!(source_note(Source::Cache).is_none());
    assert!(source_note(Source::Fallback).is_some());
    assert!(source_note(Source::Unavailable).is_some());
  }
}
