use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{
    is_storable_date, parse_amount, Amount, ExpenseRecord, IncomeRecord, UserId, MAX_YEAR,
    MIN_YEAR,
};

use super::AppError;

/// Payment method recorded for income when the payload leaves it out.
pub const DEFAULT_INCOME_PAYMENT_METHOD: &str = "Bank Transfer";

/// An amount as submitted by a client: either a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl From<&str> for AmountInput {
    fn from(value: &str) -> Self {
        AmountInput::Text(value.to_string())
    }
}

impl From<f64> for AmountInput {
    fn from(value: f64) -> Self {
        AmountInput::Number(value)
    }
}

/// Raw income payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeInput {
    pub source: Option<String>,
    pub amount: Option<AmountInput>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub other_source: Option<String>,
}

/// Raw expense payload. Unlike income, the payment method is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseInput {
    pub category: Option<String>,
    pub amount: Option<AmountInput>,
    pub date: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub other_source: Option<String>,
}

impl IncomeInput {
    /// Check the payload and turn it into a record owned by `user_id`.
    pub fn validate(self, user_id: UserId) -> Result<IncomeRecord, AppError> {
        let source = required(self.source, "source")?;
        let amount = required_amount(self.amount)?;
        let date = required_date(self.date)?;
        let payment_method = non_blank(self.payment_method)
            .unwrap_or_else(|| DEFAULT_INCOME_PAYMENT_METHOD.to_string());

        let mut record = IncomeRecord::new(user_id, source, amount, date, payment_method);
        if let Some(notes) = non_blank(self.notes) {
            record = record.with_notes(notes);
        }
        if let Some(other_source) = non_blank(self.other_source) {
            record = record.with_other_source(other_source);
        }
        Ok(record)
    }
}

impl ExpenseInput {
    /// Check the payload and turn it into a record owned by `user_id`.
    pub fn validate(self, user_id: UserId) -> Result<ExpenseRecord, AppError> {
        let category = required(self.category, "category")?;
        let amount = required_amount(self.amount)?;
        let date = required_date(self.date)?;
        let payment_method = required(self.payment_method, "paymentMethod")?;

        let mut record = ExpenseRecord::new(user_id, category, amount, date, payment_method);
        if let Some(notes) = non_blank(self.notes) {
            record = record.with_notes(notes);
        }
        if let Some(other_source) = non_blank(self.other_source) {
            record = record.with_other_source(other_source);
        }
        Ok(record)
    }
}

/// Trimmed value, or `None` if absent or blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    non_blank(value)
        .ok_or_else(|| AppError::ValidationError(format!("Missing required field: {}", field)))
}

fn required_amount(value: Option<AmountInput>) -> Result<Amount, AppError> {
    let amount = match value {
        None => {
            return Err(AppError::ValidationError(
                "Missing required field: amount".to_string(),
            ));
        }
        Some(AmountInput::Number(n)) => n,
        Some(AmountInput::Text(text)) => parse_amount(&text).map_err(|e| {
            AppError::ValidationError(format!("Invalid amount '{}': {}", text.trim(), e))
        })?,
    };

    if !amount.is_finite() {
        return Err(AppError::ValidationError(format!("Invalid amount: {}", amount)));
    }
    Ok(amount)
}

fn required_date(value: Option<String>) -> Result<NaiveDate, AppError> {
    let text = required(value, "date")?;
    let date = NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|_| {
        AppError::ValidationError(format!("Invalid date '{}': expected YYYY-MM-DD", text))
    })?;

    if !is_storable_date(date) {
        return Err(AppError::ValidationError(format!(
            "Invalid date '{}': year must be between {} and {}",
            text, MIN_YEAR, MAX_YEAR
        )));
    }
    Ok(date)
}
