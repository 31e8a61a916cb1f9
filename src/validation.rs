//! Client-side form validation. A form that fails here never reaches the
//! network; a form that passes becomes the JSON payload the backend expects.

use chrono::NaiveDate;
use clap::Args;
use serde_json::{json, Value};

use crate::error::{ClientError, ClientResult};

const DATE_FORMAT: &str = "%Y-%m-%d";
const MIN_REGISTRATION_PASSWORD: usize = 6;
const MIN_RESET_PASSWORD: usize = 8;

fn required(field: &str, value: &str, message: &str) -> ClientResult<String> {
  let value = value.trim();
  if value.is_empty() {
    return Err(ClientError::validation(field, message));
  }
  Ok(value.to_string())
}

fn optional(value: &Option<String>) -> Option<String> {
  value
    .as_deref()
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(String::from)
}

fn parse_number(field: &str, raw: &str, message: &str) -> ClientResult<f64> {
  raw
    .trim()
    .parse::<f64>()
    .ok()
    .filter(|v| v.is_finite())
    .ok_or_else(|| ClientError::validation(field, message))
}

/// Non-negative number, or `default` when absent or unusable.
fn non_negative_or(raw: &Option<String>, default: f64) -> f64 {
  optional(raw)
    .and_then(|raw| raw.parse::<f64>().ok())
    .filter(|v| v.is_finite() && *v >= 0.0)
    .unwrap_or(default)
}

fn parse_positive(field: &str, raw: &str, message: &str) -> ClientResult<f64> {
  let value = parse_number(field, raw, message)?;
  if value <= 0.0 {
    return Err(ClientError::validation(field, message));
  }
  Ok(value)
}

fn parse_date(field: &str, raw: &str) -> ClientResult<NaiveDate> {
  NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
    .map_err(|_| ClientError::validation(field, "Please enter a date as YYYY-MM-DD"))
}

fn date_or_today(field: &str, raw: &Option<String>, today: NaiveDate) -> ClientResult<String> {
  let date = match optional(raw) {
    Some(raw) => parse_date(field, &raw)?,
    None => today,
  };
  Ok(date.format(DATE_FORMAT).to_string())
}

/// New expense.
#[derive(Debug, Clone, Default, Args)]
pub struct ExpenseForm {
  #[arg(long)]
  pub amount: String,
  /// Expense category, e.g. FOOD
  #[arg(long)]
  pub category: String,
  /// Date as YYYY-MM-DD (default: today)
  #[arg(long)]
  pub date: Option<String>,
  #[arg(long)]
  pub merchant: Option<String>,
  #[arg(long)]
  pub description: Option<String>,
  #[arg(long)]
  pub recurring: bool,
  /// Recurrence frequency, e.g. MONTHLY
  #[arg(long)]
  pub frequency: Option<String>,
}

impl ExpenseForm {
  pub fn validate(&self, today: NaiveDate) -> ClientResult<Value> {
    let amount = parse_positive(
      "amount",
      &self.amount,
      "Please enter a valid amount greater than 0",
    )?;
    let category = required("category", &self.category, "Please select an expense category")?;

    Ok(json!({
      "amount": amount,
      "date": date_or_today("date", &self.date, today)?,
      "category": category,
      "merchant": optional(&self.merchant),
      "description": optional(&self.description),
      "recurring": self.recurring,
      "frequency": optional(&self.frequency),
    }))
  }
}

/// New income.
#[derive(Debug, Clone, Default, Args)]
pub struct IncomeForm {
  #[arg(long)]
  pub amount: String,
  /// Income type, e.g. SALARY
  #[arg(long = "type")]
  pub income_type: String,
  /// Who paid
  #[arg(long)]
  pub source: Option<String>,
  /// Date as YYYY-MM-DD (default: today)
  #[arg(long)]
  pub date: Option<String>,
  #[arg(long)]
  pub description: Option<String>,
  #[arg(long)]
  pub recurring: bool,
  #[arg(long)]
  pub frequency: Option<String>,
}

impl IncomeForm {
  pub fn validate(&self, today: NaiveDate) -> ClientResult<Value> {
    let amount = parse_positive(
      "amount",
      &self.amount,
      "Please enter a valid amount greater than 0",
    )?;
    let income_type = required("type", &self.income_type, "Please select an income type")?;

    Ok(json!({
      "amount": amount,
      "date": date_or_today("date", &self.date, today)?,
      "type": income_type,
      "source": optional(&self.source),
      "description": optional(&self.description),
      "recurring": self.recurring,
      "frequency": optional(&self.frequency),
    }))
  }
}

/// New savings goal.
#[derive(Debug, Clone, Default, Args)]
pub struct GoalForm {
  #[arg(long)]
  pub name: String,
  #[arg(long)]
  pub target_amount: String,
  /// Already saved (default: 0)
  #[arg(long)]
  pub current_amount: Option<String>,
  /// Deadline as YYYY-MM-DD, must be in the future
  #[arg(long)]
  pub target_date: String,
  #[arg(long)]
  pub category: String,
  #[arg(long)]
  pub priority: Option<String>,
  #[arg(long)]
  pub description: Option<String>,
}

impl GoalForm {
  pub fn validate(&self, today: NaiveDate) -> ClientResult<Value> {
    let name = required("name", &self.name, "Please enter a goal name")?;
    let target = parse_positive(
      "target_amount",
      &self.target_amount,
      "Please enter a valid target amount greater than 0",
    )?;

    // Unparseable or negative saved amounts count as nothing saved yet
    let current = non_negative_or(&self.current_amount, 0.0);
    if current > target {
      return Err(ClientError::validation(
        "current_amount",
        "Current saved amount cannot exceed target amount",
      ));
    }

    let category = required("category", &self.category, "Please select a goal category")?;
    let target_date = parse_date("target_date", &self.target_date)?;
    if target_date <= today {
      return Err(ClientError::validation(
        "target_date",
        "Target date must be in the future",
      ));
    }

    Ok(json!({
      "name": name,
      "targetAmount": target,
      "currentAmount": current,
      "targetDate": target_date.format(DATE_FORMAT).to_string(),
      "category": category,
      "priority": optional(&self.priority),
      "description": optional(&self.description),
    }))
  }
}

/// New investment.
#[derive(Debug, Clone, Default, Args)]
pub struct InvestmentForm {
  #[arg(long)]
  pub name: String,
  /// Investment type, e.g. STOCKS
  #[arg(long = "type")]
  pub investment_type: String,
  /// Amount invested
  #[arg(long)]
  pub amount: String,
  /// Current value (default: amount invested)
  #[arg(long)]
  pub current_value: Option<String>,
  /// Purchase date as YYYY-MM-DD (default: today)
  #[arg(long)]
  pub date: Option<String>,
  #[arg(long)]
  pub quantity: Option<String>,
  #[arg(long)]
  pub broker: Option<String>,
  #[arg(long)]
  pub description: Option<String>,
}

impl InvestmentForm {
  pub fn validate(&self, today: NaiveDate) -> ClientResult<Value> {
    let name = required("name", &self.name, "Please enter an investment name")?;
    let investment_type = required(
      "type",
      &self.investment_type,
      "Please select an investment type",
    )?;
    let amount = parse_positive(
      "amount",
      &self.amount,
      "Please enter a valid investment amount greater than 0",
    )?;
    let current_value = non_negative_or(&self.current_value, amount);
    let quantity = non_negative_or(&self.quantity, 0.0);

    Ok(json!({
      "name": name,
      "type": investment_type,
      "amount": amount,
      "currentValue": current_value,
      "date": date_or_today("date", &self.date, today)?,
      "quantity": quantity,
      "broker": optional(&self.broker),
      "description": optional(&self.description),
    }))
  }
}

/// New bank account.
#[derive(Debug, Clone, Default, Args)]
pub struct AccountForm {
  #[arg(long)]
  pub name: String,
  /// Account type, e.g. CHECKING
  #[arg(long = "type")]
  pub account_type: String,
  #[arg(long)]
  pub bank: Option<String>,
  /// Account number
  #[arg(long)]
  pub number: Option<String>,
  #[arg(long)]
  pub balance: String,
  #[arg(long)]
  pub currency: String,
  #[arg(long)]
  pub description: Option<String>,
  #[arg(long)]
  pub primary: bool,
}

impl AccountForm {
  pub fn validate(&self) -> ClientResult<Value> {
    let name = required("name", &self.name, "Please enter an account name")?;
    let account_type = required("type", &self.account_type, "Please select an account type")?;
    let balance = parse_number("balance", &self.balance, "Please enter a valid balance")?;
    let currency = required("currency", &self.currency, "Please select a currency")?;

    Ok(json!({
      "name": name,
      "type": account_type,
      "bank": optional(&self.bank),
      "number": optional(&self.number),
      "balance": balance,
      "currency": currency,
      "description": optional(&self.description),
      "primary": self.primary,
    }))
  }
}

/// Account registration.
#[derive(Debug, Clone, Default, Args)]
pub struct RegistrationForm {
  #[arg(long)]
  pub first_name: String,
  #[arg(long)]
  pub last_name: String,
  #[arg(long)]
  pub username: String,
  #[arg(long)]
  pub email: String,
  /// Falls back to FINTRACKR_PASSWORD
  #[arg(long)]
  pub password: Option<String>,
}

/// Loose `local@domain.tld` check: no whitespace, one `@`, a dot in the domain.
pub fn is_valid_email(email: &str) -> bool {
  if email.chars().any(char::is_whitespace) {
    return false;
  }
  let mut parts = email.split('@');
  let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
    return false;
  };
  match domain.rsplit_once('.') {
    Some((host, tld)) => !local.is_empty() && !host.is_empty() && !tld.is_empty(),
    None => false,
  }
}

impl RegistrationForm {
  pub fn validate(&self, password: &str) -> ClientResult<Value> {
    let first_name = required("first_name", &self.first_name, "First name is required")?;
    let last_name = required("last_name", &self.last_name, "Last name is required")?;
    let username = required("username", &self.username, "Username is required")?;
    let email = required("email", &self.email, "Email is required")?;
    if !is_valid_email(&email) {
      return Err(ClientError::validation("email", "Please enter a valid email address"));
    }
    if password.chars().count() < MIN_REGISTRATION_PASSWORD {
      return Err(ClientError::validation(
        "password",
        format!("Password must be at least {} characters long", MIN_REGISTRATION_PASSWORD),
      ));
    }

    Ok(json!({
      "firstName": first_name,
      "lastName": last_name,
      "username": username,
      "email": email,
      "password": password,
    }))
  }
}

/// Second step of the password reset flow.
#[derive(Debug, Clone, Default, Args)]
pub struct PasswordResetForm {
  /// Token from the reset email
  #[arg(long)]
  pub token: String,
  #[arg(long)]
  pub new_password: String,
  #[arg(long)]
  pub confirm_password: String,
}

impl PasswordResetForm {
  /// Returns `(token, new_password)`.
  pub fn validate(&self) -> ClientResult<(String, String)> {
    let new_password = self.new_password.trim();
    let confirm = self.confirm_password.trim();
    if new_password.is_empty() || confirm.is_empty() {
      return Err(ClientError::validation("new_password", "Please fill in all fields"));
    }
    if new_password != confirm {
      return Err(ClientError::validation("confirm_password", "Passwords do not match"));
    }
    if new_password.chars().count() < MIN_RESET_PASSWORD {
      return Err(ClientError::validation(
        "new_password",
        format!("Password must be at least {} characters long", MIN_RESET_PASSWORD),
      ));
    }
    let token = required("token", &self.token, "Invalid or missing reset token")?;
    Ok((token, new_password.to_string()))
  }
}
