mod common;

use anyhow::Result;
use common::{add_expense, add_income, month, register, test_service};
use spendsmart::domain::RecordKind;
use spendsmart::io::{Exporter, LedgerSnapshot};
use uuid::Uuid;

#[tokio::test]
async fn test_export_expenses_to_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = register(&service, "csv").await?;

    add_expense(&service, user.id, "Groceries", 50.0, "2024-03-02").await?;
    add_expense(&service, user.id, "Subscription", 15.99, "2024-03-21").await?;
    add_income(&service, user.id, "Salary", 3000.0, "2024-03-01").await?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&service)
        .export_csv(user.id, RecordKind::Expense, &mut buffer)
        .await?;
    assert_eq!(count, 2);

    let output = String::from_utf8(buffer)?;
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "id,sequence,date,category,amount,payment_method,notes,other_source"
    );
    assert!(lines[1].contains("2024-03-02,Groceries,50.00,Card"));
    assert!(lines[2].contains("2024-03-21,Subscription,15.99,Card"));

    Ok(())
}

#[tokio::test]
async fn test_export_income_csv_uses_source_header() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = register(&service, "income").await?;
    add_income(&service, user.id, "Salary", 3000.0, "2024-03-01").await?;

    let mut buffer = Vec::new();
    Exporter::new(&service)
        .export_csv(user.id, RecordKind::Income, &mut buffer)
        .await?;

    let output = String::from_utf8(buffer)?;
    assert!(output.starts_with("id,sequence,date,source,amount"));
    assert!(output.contains("Salary,3000.00,Bank Transfer"));

    Ok(())
}

#[tokio::test]
async fn test_export_json_snapshot() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = register(&service, "snap").await?;

    add_income(&service, user.id, "Salary", 3000.0, "2024-03-01").await?;
    add_expense(&service, user.id, "Rent", 900.0, "2024-03-01").await?;
    add_expense(&service, user.id, "Food", 45.5, "2024-03-04").await?;
    service
        .create_budget(user.id, Some("Food".into()), 200.0, month(3, 2024))
        .await?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&service)
        .export_json(user.id, &mut buffer)
        .await?;
    assert_eq!(count, 3);

    let snapshot: LedgerSnapshot = serde_json::from_slice(&buffer)?;
    assert_eq!(snapshot.user.id, user.id);
    assert_eq!(snapshot.incomes.len(), 1);
    assert_eq!(snapshot.expenses.len(), 2);
    assert_eq!(snapshot.expenses[0].category, "Rent");
    assert_eq!(snapshot.expenses[1].amount, 45.5);
    assert_eq!(snapshot.budgets.len(), 1);
    assert_eq!(snapshot.budgets[0].category.as_deref(), Some("Food"));

    Ok(())
}

#[tokio::test]
async fn test_export_for_unknown_user_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let mut buffer = Vec::new();
    let result = Exporter::new(&service)
        .export_csv(Uuid::new_v4(), RecordKind::Expense, &mut buffer)
        .await;
    assert!(result.is_err());
    assert!(buffer.is_empty());

    Ok(())
}
