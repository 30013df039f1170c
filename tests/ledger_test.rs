mod common;

use anyhow::Result;
use common::{add_expense, add_income, date, month, register, test_service};
use spendsmart::application::{AppError, ExpenseInput, IncomeInput, DEFAULT_INCOME_PAYMENT_METHOD};
use spendsmart::domain::{
    ExpenseRecord, IncomeRecord, LedgerRecord, NewUser, ProfileUpdate, RecordKind,
};
use uuid::Uuid;

#[tokio::test]
async fn test_migrations_are_versioned_and_idempotent() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let repo = service.repository();

    assert_eq!(repo.schema_version().await?, 3);
    repo.migrate().await?;
    assert_eq!(repo.schema_version().await?, 3);

    Ok(())
}

#[tokio::test]
async fn test_reconnect_keeps_data() -> Result<()> {
    let temp_dir = tempfile::TempDir::new()?;
    let db_path = temp_dir.path().join("ledger.db");
    let db_path = db_path.to_str().unwrap();

    {
        let service = spendsmart::application::LedgerService::init(db_path).await?;
        let user = register(&service, "persist").await?;
        add_expense(&service, user.id, "Rent", 900.0, "2024-09-01").await?;
    }

    let service = spendsmart::application::LedgerService::connect(db_path).await?;
    let user = service.find_user("persist").await?;
    let records = service.list_records(user.id, RecordKind::Expense).await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].amount(), 900.0);

    Ok(())
}

#[tokio::test]
async fn test_connect_to_missing_database_fails() -> Result<()> {
    let temp_dir = tempfile::TempDir::new()?;
    let db_path = temp_dir.path().join("missing.db");

    let result = spendsmart::application::LedgerService::connect(db_path.to_str().unwrap()).await;
    assert!(result.is_err());

    Ok(())
}

#[tokio::test]
async fn test_register_user_and_lookup() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let user = service
        .register_user(NewUser {
            username: Some("ana".into()),
            full_name: Some("Ana Lima".into()),
            email: Some("ana@example.com".into()),
            gender: Some("female".into()),
            qualifications: Some("MSc Economics".into()),
        })
        .await?;

    assert_eq!(user.account_balance, 0.0);
    let by_id = service.get_user(user.id).await?;
    let by_name = service.find_user("ana").await?;
    assert_eq!(by_id, user);
    assert_eq!(by_name.id, user.id);
    assert_eq!(by_name.qualifications.as_deref(), Some("MSc Economics"));

    Ok(())
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_missing_fields() -> Result<()> {
    let (service, _temp) = test_service().await?;
    register(&service, "ana").await?;

    let dup_username = service
        .register_user(NewUser {
            username: Some("ana".into()),
            full_name: Some("Other Ana".into()),
            email: Some("other@example.com".into()),
            ..Default::default()
        })
        .await;
    assert!(matches!(dup_username, Err(AppError::UserAlreadyExists(_))));

    let dup_email = service
        .register_user(NewUser {
            username: Some("ana2".into()),
            full_name: Some("Ana Two".into()),
            email: Some("ana@example.com".into()),
            ..Default::default()
        })
        .await;
    assert!(matches!(dup_email, Err(AppError::UserAlreadyExists(_))));

    let missing = service
        .register_user(NewUser {
            username: Some("carl".into()),
            email: Some("carl@example.com".into()),
            ..Default::default()
        })
        .await;
    assert!(matches!(missing, Err(AppError::ValidationError(_))));

    assert_eq!(service.list_users().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_update_profile() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ana = register(&service, "ana").await?;
    register(&service, "ben").await?;

    let updated = service
        .update_profile(
            ana.id,
            ProfileUpdate {
                full_name: Some("Ana Maria Lima".into()),
                profile_pic: Some("static/uploads/ana.png".into()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.full_name, "Ana Maria Lima");
    assert_eq!(updated.email, ana.email);

    let stored = service.get_user(ana.id).await?;
    assert_eq!(stored.profile_pic.as_deref(), Some("static/uploads/ana.png"));

    let taken = service
        .update_profile(
            ana.id,
            ProfileUpdate {
                email: Some("ben@example.com".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(taken, Err(AppError::UserAlreadyExists(_))));

    let unknown = service
        .update_profile(Uuid::new_v4(), ProfileUpdate::default())
        .await;
    assert!(matches!(unknown, Err(AppError::UserNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_add_income_stores_all_fields() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = register(&service, "ana").await?;

    let income = service
        .add_income(
            user.id,
            IncomeInput {
                source: Some("Freelance".into()),
                amount: Some("450.25".into()),
                date: Some("2024-04-12".into()),
                payment_method: None,
                notes: Some("Logo design".into()),
                other_source: Some("Upwork".into()),
            },
        )
        .await?;
    assert!(income.sequence > 0);

    let records = service.list_records(user.id, RecordKind::Income).await?;
    assert_eq!(records.len(), 1);
    match &records[0] {
        LedgerRecord::Income(stored) => {
            assert_eq!(stored, &income);
            assert_eq!(stored.payment_method, DEFAULT_INCOME_PAYMENT_METHOD);
            assert_eq!(stored.date, date("2024-04-12"));
            assert_eq!(stored.notes.as_deref(), Some("Logo design"));
            assert_eq!(stored.other_source.as_deref(), Some("Upwork"));
        }
        other => panic!("expected income, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_sequence_is_shared_and_increasing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = register(&service, "seq").await?;

    let a = add_income(&service, user.id, "Salary", 1.0, "2024-01-01").await?;
    let b = add_expense(&service, user.id, "Food", 1.0, "2024-01-01").await?;
    let c = add_income(&service, user.id, "Gift", 1.0, "2024-01-01").await?;

    assert!(a.sequence < b.sequence);
    assert!(b.sequence < c.sequence);

    Ok(())
}

#[tokio::test]
async fn test_append_for_unknown_user_is_integrity_error() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ghost = Uuid::new_v4();

    let via_input = service
        .add_expense(
            ghost,
            ExpenseInput {
                category: Some("Food".into()),
                amount: Some("10".into()),
                date: Some("2024-01-05".into()),
                payment_method: Some("Cash".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(via_input, Err(AppError::IntegrityError(_))));

    let record = IncomeRecord::new(ghost, "Salary", 100.0, date("2024-01-05"), "Cash");
    let via_record = service.append(record.into()).await;
    assert!(matches!(via_record, Err(AppError::IntegrityError(_))));

    Ok(())
}

#[tokio::test]
async fn test_store_enforces_foreign_keys() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let mut record: LedgerRecord =
        ExpenseRecord::new(Uuid::new_v4(), "Food", 10.0, date("2024-01-05"), "Cash").into();
    let result = service.repository().append(&mut record).await;
    assert!(result.is_err());

    Ok(())
}

#[tokio::test]
async fn test_append_rejects_non_finite_amount() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = register(&service, "nan").await?;

    let record = ExpenseRecord::new(user.id, "Food", f64::NAN, date("2024-01-05"), "Cash");
    let result = service.append(record.into()).await;
    assert!(matches!(result, Err(AppError::IntegrityError(_))));

    let records = service.list_records(user.id, RecordKind::Expense).await?;
    assert!(records.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_malformed_payloads_are_validation_errors() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = register(&service, "strict").await?;

    let bad_date = service
        .add_income(
            user.id,
            IncomeInput {
                source: Some("Salary".into()),
                amount: Some("100".into()),
                date: Some("April 1st".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(bad_date, Err(AppError::ValidationError(_))));

    let bad_amount = service
        .add_expense(
            user.id,
            ExpenseInput {
                category: Some("Food".into()),
                amount: Some("twelve".into()),
                date: Some("2024-04-01".into()),
                payment_method: Some("Cash".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(bad_amount, Err(AppError::ValidationError(_))));

    let missing_method = service
        .add_expense(
            user.id,
            ExpenseInput {
                category: Some("Food".into()),
                amount: Some("12".into()),
                date: Some("2024-04-01".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(missing_method, Err(AppError::ValidationError(_))));

    let total = service
        .aggregator()
        .monthly_total(user.id, RecordKind::Expense, month(4, 2024))
        .await?;
    assert_eq!(total, 0.0);

    Ok(())
}

#[tokio::test]
async fn test_negative_amounts_are_accepted() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = register(&service, "refund").await?;

    add_expense(&service, user.id, "Shoes", 80.0, "2024-10-02").await?;
    add_expense(&service, user.id, "Shoes refund", -80.0, "2024-10-09").await?;

    let total = service
        .aggregator()
        .monthly_total(user.id, RecordKind::Expense, month(10, 2024))
        .await?;
    assert_eq!(total, 0.0);

    Ok(())
}

#[tokio::test]
async fn test_dates_beyond_four_digit_years_are_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let user = register(&service, "future").await?;

    let via_input = service
        .add_expense(
            user.id,
            ExpenseInput {
                category: Some("Time travel".into()),
                amount: Some("7".into()),
                date: Some("+10000-01-05".into()),
                payment_method: Some("Cash".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(via_input, Err(AppError::ValidationError(_))));

    let far_future = chrono::NaiveDate::from_ymd_opt(10000, 1, 5).unwrap();
    let record = ExpenseRecord::new(user.id, "Time travel", 7.0, far_future, "Cash");
    let via_record = service.append(record.into()).await;
    assert!(matches!(via_record, Err(AppError::IntegrityError(_))));

    for day in 1..=5 {
        add_expense(&service, user.id, "Lunch", 10.0, &format!("2024-01-{:02}", day)).await?;
    }
    let recent = service
        .aggregator()
        .recent_records(user.id, RecordKind::Expense, 5)
        .await?;
    assert_eq!(recent.len(), 5);
    assert_eq!(recent[0].date(), date("2024-01-05"));

    Ok(())
}
