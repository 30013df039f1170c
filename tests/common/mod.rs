// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use spendsmart::application::{AmountInput, ExpenseInput, IncomeInput, LedgerService};
use spendsmart::domain::{ExpenseRecord, IncomeRecord, MonthWindow, NewUser, User, UserId};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a YYYY-MM-DD string
pub fn date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

pub fn month(month: u32, year: i32) -> MonthWindow {
    MonthWindow::new(month, year).unwrap()
}

/// Register a user with derived name and email
pub async fn register(service: &LedgerService, username: &str) -> Result<User> {
    Ok(service
        .register_user(NewUser {
            username: Some(username.to_string()),
            full_name: Some(format!("{} Tester", username)),
            email: Some(format!("{}@example.com", username)),
            ..Default::default()
        })
        .await?)
}

pub async fn add_income(
    service: &LedgerService,
    user_id: UserId,
    source: &str,
    amount: f64,
    on: &str,
) -> Result<IncomeRecord> {
    Ok(service
        .add_income(
            user_id,
            IncomeInput {
                source: Some(source.to_string()),
                amount: Some(AmountInput::Number(amount)),
                date: Some(on.to_string()),
                ..Default::default()
            },
        )
        .await?)
}

pub async fn add_expense(
    service: &LedgerService,
    user_id: UserId,
    category: &str,
    amount: f64,
    on: &str,
) -> Result<ExpenseRecord> {
    Ok(service
        .add_expense(
            user_id,
            ExpenseInput {
                category: Some(category.to_string()),
                amount: Some(AmountInput::Number(amount)),
                date: Some(on.to_string()),
                payment_method: Some("Card".to_string()),
                ..Default::default()
            },
        )
        .await?)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
