use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Amount, ExpenseRecord, IncomeRecord, LedgerRecord, MonthWindow, RecordKind, UserId,
};
use crate::storage::Repository;

use super::{AppError, Aggregator, DEFAULT_RECENT_LIMIT};

/// Everything a client needs for the dashboard, in one flat structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub user_id: UserId,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub gender: Option<String>,
    pub profile_pic: Option<String>,
    pub qualifications: Option<String>,
    pub created_at: DateTime<Utc>,
    pub month: u32,
    pub year: i32,
    pub total_monthly_income: Amount,
    pub total_monthly_expenses: Amount,
    /// Income minus expenses for the month
    pub account_balance: Amount,
    pub recent_income: Vec<IncomeEntry>,
    pub recent_expenses: Vec<ExpenseEntry>,
}

/// Income record as shown to clients (no owner reference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeEntry {
    pub source: String,
    pub amount: Amount,
    pub date: NaiveDate,
    pub payment_method: String,
    pub notes: Option<String>,
    pub other_source: Option<String>,
}

/// Expense record as shown to clients (no owner reference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseEntry {
    pub category: String,
    pub amount: Amount,
    pub date: NaiveDate,
    pub payment_method: String,
    pub notes: Option<String>,
    pub other_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeOverview {
    pub month: u32,
    pub year: i32,
    pub total_monthly_income: Amount,
    pub recent_income: Vec<IncomeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseOverview {
    pub month: u32,
    pub year: i32,
    pub total_monthly_expenses: Amount,
    pub recent_expenses: Vec<ExpenseEntry>,
}

impl From<&IncomeRecord> for IncomeEntry {
    fn from(record: &IncomeRecord) -> Self {
        Self {
            source: record.source.clone(),
            amount: record.amount,
            date: record.date,
            payment_method: record.payment_method.clone(),
            notes: record.notes.clone(),
            other_source: record.other_source.clone(),
        }
    }
}

impl From<&ExpenseRecord> for ExpenseEntry {
    fn from(record: &ExpenseRecord) -> Self {
        Self {
            category: record.category.clone(),
            amount: record.amount,
            date: record.date,
            payment_method: record.payment_method.clone(),
            notes: record.notes.clone(),
            other_source: record.other_source.clone(),
        }
    }
}

pub(crate) fn income_entries(records: &[LedgerRecord]) -> Vec<IncomeEntry> {
    records
        .iter()
        .filter_map(|record| match record {
            LedgerRecord::Income(income) => Some(IncomeEntry::from(income)),
            LedgerRecord::Expense(_) => None,
        })
        .collect()
}

pub(crate) fn expense_entries(records: &[LedgerRecord]) -> Vec<ExpenseEntry> {
    records
        .iter()
        .filter_map(|record| match record {
            LedgerRecord::Expense(expense) => Some(ExpenseEntry::from(expense)),
            LedgerRecord::Income(_) => None,
        })
        .collect()
}

/// Composes profile fields and monthly aggregates into a [`Summary`].
pub struct SummaryBuilder<'a> {
    repo: &'a Repository,
    recent_limit: usize,
}

impl<'a> SummaryBuilder<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self {
            repo,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    /// Build the summary for `user_id` as of `window`.
    pub async fn build(&self, user_id: UserId, window: MonthWindow) -> Result<Summary, AppError> {
        let user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))?;

        let aggregator = Aggregator::new(self.repo);
        let total_monthly_income = aggregator
            .monthly_total(user_id, RecordKind::Income, window)
            .await?;
        let total_monthly_expenses = aggregator
            .monthly_total(user_id, RecordKind::Expense, window)
            .await?;
        let recent_income = aggregator
            .recent_records(user_id, RecordKind::Income, self.recent_limit)
            .await?;
        let recent_expenses = aggregator
            .recent_records(user_id, RecordKind::Expense, self.recent_limit)
            .await?;

        Ok(Summary {
            user_id: user.id,
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            gender: user.gender,
            profile_pic: user.profile_pic,
            qualifications: user.qualifications,
            created_at: user.created_at,
            month: window.month(),
            year: window.year(),
            total_monthly_income,
            total_monthly_expenses,
            account_balance: total_monthly_income - total_monthly_expenses,
            recent_income: income_entries(&recent_income),
            recent_expenses: expense_entries(&recent_expenses),
        })
    }
}
