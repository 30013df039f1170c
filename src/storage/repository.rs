use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    Amount, Budget, BudgetId, ExpenseRecord, IncomeRecord, LedgerRecord, MonthWindow, RecordKind,
    User, UserId,
};

use super::MIGRATIONS;

const USER_COLUMNS: &str = "id, username, email, full_name, gender, qualifications, profile_pic, account_balance, created_at";
const INCOME_COLUMNS: &str =
    "id, user_id, sequence, source, amount, date, payment_method, notes, other_source";
const EXPENSE_COLUMNS: &str =
    "id, user_id, sequence, category, amount, date, payment_method, notes, other_source";

const BUDGET_COLUMNS: &str = "id, user_id, category, amount, month, year, created_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Connection settings for the backing SQLite store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How long a connection waits on a locked database before failing
    pub busy_timeout: Duration,
    pub max_connections: u32,
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            max_connections: 5,
            create_if_missing: false,
        }
    }
}

/// Repository for persisting users and querying their income and expense ledger.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database with default settings.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with(database_url, &StoreConfig::default()).await
    }

    /// Connect to a SQLite database. Foreign keys are enforced on every connection.
    pub async fn connect_with(database_url: &str, config: &StoreConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(config.create_if_missing);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Apply every schema migration that has not been recorded yet.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY NOT NULL,
                applied_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create schema_migrations table")?;

        for &(version, sql) in MIGRATIONS {
            let applied = sqlx::query("SELECT version FROM schema_migrations WHERE version = ?")
                .bind(version)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to read schema_migrations")?;
            if applied.is_some() {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to run migration {:03}", version))?;
            sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
                .bind(version)
                .bind(Utc::now().to_rfc3339())
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to record migration {:03}", version))?;
            tx.commit().await?;

            debug!(version, "applied schema migration");
        }

        Ok(())
    }

    /// Highest applied migration version (0 for an empty database).
    pub async fn schema_version(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COALESCE(MAX(version), 0) as version FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .context("Failed to read schema version")?;
        Ok(row.get("version"))
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str, config: &StoreConfig) -> Result<Self> {
        let config = StoreConfig {
            create_if_missing: true,
            ..config.clone()
        };
        let repo = Self::connect_with(database_url, &config).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // User operations
    // ========================

    /// Save a new user to the database.
    pub async fn save_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, full_name, gender, qualifications, profile_pic, account_balance, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.gender)
        .bind(&user.qualifications)
        .bind(&user.profile_pic)
        .bind(user.account_balance)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save user")?;
        Ok(())
    }

    /// Overwrite the mutable profile fields of an existing user.
    pub async fn update_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET email = ?, full_name = ?, gender = ?, qualifications = ?, profile_pic = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.gender)
        .bind(&user.qualifications)
        .bind(&user.profile_pic)
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update user")?;
        Ok(())
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// Get a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by username")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// Get a user by email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by email")?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    /// List all users, ordered by username.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {} FROM users ORDER BY username", USER_COLUMNS);
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list users")?;

        rows.iter().map(Self::row_to_user).collect()
    }

    fn row_to_user(row: &SqliteRow) -> Result<User> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(User {
            id: Uuid::parse_str(&id_str).context("Invalid user ID")?,
            username: row.get("username"),
            email: row.get("email"),
            full_name: row.get("full_name"),
            gender: row.get("gender"),
            qualifications: row.get("qualifications"),
            profile_pic: row.get("profile_pic"),
            account_balance: row.get("account_balance"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Ledger operations
    // ========================

    /// Append a record to the ledger.
    /// Assigns the next sequence number and inserts the row in one transaction;
    /// fails if the owning user does not exist.
    pub async fn append(&self, record: &mut LedgerRecord) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin append transaction")?;

        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'ledger_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .context("Failed to get next sequence number")?;
        record.set_sequence(row.get("value"));

        match &*record {
            LedgerRecord::Income(income) => {
                sqlx::query(
                    r#"
                    INSERT INTO incomes (id, user_id, sequence, source, amount, date, payment_method, notes, other_source)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(income.id.to_string())
                .bind(income.user_id.to_string())
                .bind(income.sequence)
                .bind(&income.source)
                .bind(income.amount)
                .bind(income.date.format(DATE_FORMAT).to_string())
                .bind(&income.payment_method)
                .bind(&income.notes)
                .bind(&income.other_source)
                .execute(&mut *tx)
                .await
                .context("Failed to save income")?;
            }
            LedgerRecord::Expense(expense) => {
                sqlx::query(
                    r#"
                    INSERT INTO expenses (id, user_id, sequence, category, amount, date, payment_method, notes, other_source)
                    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(expense.id.to_string())
                .bind(expense.user_id.to_string())
                .bind(expense.sequence)
                .bind(&expense.category)
                .bind(expense.amount)
                .bind(expense.date.format(DATE_FORMAT).to_string())
                .bind(&expense.payment_method)
                .bind(&expense.notes)
                .bind(&expense.other_source)
                .execute(&mut *tx)
                .await
                .context("Failed to save expense")?;
            }
        }

        tx.commit().await.context("Failed to commit append")?;
        Ok(())
    }

    /// All records of `kind` owned by `user_id` dated within `window`.
    /// Callers must not rely on the order of the result.
    pub async fn query_by_user_and_month(
        &self,
        user_id: UserId,
        window: MonthWindow,
        kind: RecordKind,
    ) -> Result<Vec<LedgerRecord>> {
        let query = format!(
            "SELECT {} FROM {} WHERE user_id = ? AND date >= ? AND date <= ? ORDER BY sequence",
            Self::columns(kind),
            kind.table()
        );

        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .bind(window.start().format(DATE_FORMAT).to_string())
            .bind(window.last_day().format(DATE_FORMAT).to_string())
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to query monthly {} records", kind))?;

        rows.iter().map(|row| Self::row_to_record(kind, row)).collect()
    }

    /// Up to `limit` records of `kind` for `user_id`, newest date first.
    /// Records sharing a date come back most recently inserted first.
    pub async fn query_recent_by_user(
        &self,
        user_id: UserId,
        kind: RecordKind,
        limit: usize,
    ) -> Result<Vec<LedgerRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {} FROM {} WHERE user_id = ? ORDER BY date DESC, sequence DESC LIMIT ?",
            Self::columns(kind),
            kind.table()
        );

        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to query recent {} records", kind))?;

        rows.iter().map(|row| Self::row_to_record(kind, row)).collect()
    }

    /// Every record of `kind` for `user_id`, oldest first.
    pub async fn list_records_for_user(
        &self,
        user_id: UserId,
        kind: RecordKind,
    ) -> Result<Vec<LedgerRecord>> {
        let query = format!(
            "SELECT {} FROM {} WHERE user_id = ? ORDER BY date, sequence",
            Self::columns(kind),
            kind.table()
        );

        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {} records", kind))?;

        rows.iter().map(|row| Self::row_to_record(kind, row)).collect()
    }

    // ========================
    // Budget operations
    // ========================

    /// Save a new budget to the database.
    pub async fn save_budget(&self, budget: &Budget) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO budgets (id, user_id, category, amount, month, year, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(budget.id.to_string())
        .bind(budget.user_id.to_string())
        .bind(&budget.category)
        .bind(budget.amount)
        .bind(i64::from(budget.window.month()))
        .bind(budget.window.year())
        .bind(budget.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save budget")?;
        Ok(())
    }

    /// Change the limit of an existing budget.
    pub async fn update_budget_amount(&self, id: BudgetId, amount: Amount) -> Result<()> {
        sqlx::query("UPDATE budgets SET amount = ? WHERE id = ?")
            .bind(amount)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update budget")?;
        Ok(())
    }

    /// Get a budget by ID.
    pub async fn get_budget(&self, id: BudgetId) -> Result<Option<Budget>> {
        let query = format!("SELECT {} FROM budgets WHERE id = ?", BUDGET_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch budget")?;

        row.as_ref().map(Self::row_to_budget).transpose()
    }

    /// The user's budget for `category` (or the all-category budget when `None`) in `window`.
    pub async fn find_budget(
        &self,
        user_id: UserId,
        category: Option<&str>,
        window: MonthWindow,
    ) -> Result<Option<Budget>> {
        let query = format!(
            "SELECT {} FROM budgets WHERE user_id = ? AND month = ? AND year = ? AND category IS ?",
            BUDGET_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(user_id.to_string())
            .bind(i64::from(window.month()))
            .bind(window.year())
            .bind(category)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up budget")?;

        row.as_ref().map(Self::row_to_budget).transpose()
    }

    /// The user's budgets, optionally limited to one month.
    /// Ordered by period, then with the all-category budget ahead of named categories.
    pub async fn list_budgets(
        &self,
        user_id: UserId,
        window: Option<MonthWindow>,
    ) -> Result<Vec<Budget>> {
        let rows = match window {
            Some(window) => {
                let query = format!(
                    "SELECT {} FROM budgets WHERE user_id = ? AND month = ? AND year = ? \
                     ORDER BY category",
                    BUDGET_COLUMNS
                );
                sqlx::query(&query)
                    .bind(user_id.to_string())
                    .bind(i64::from(window.month()))
                    .bind(window.year())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let query = format!(
                    "SELECT {} FROM budgets WHERE user_id = ? ORDER BY year, month, category",
                    BUDGET_COLUMNS
                );
                sqlx::query(&query)
                    .bind(user_id.to_string())
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .context("Failed to list budgets")?;

        rows.iter().map(Self::row_to_budget).collect()
    }

    /// Delete a budget.
    pub async fn delete_budget(&self, id: BudgetId) -> Result<()> {
        sqlx::query("DELETE FROM budgets WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete budget")?;
        Ok(())
    }

    fn row_to_budget(row: &SqliteRow) -> Result<Budget> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let month: i64 = row.get("month");
        let year: i32 = row.get("year");
        let created_at_str: String = row.get("created_at");

        let window = u32::try_from(month)
            .ok()
            .and_then(|month| MonthWindow::new(month, year))
            .ok_or_else(|| anyhow!("Invalid budget period: {}/{}", month, year))?;

        Ok(Budget {
            id: Uuid::parse_str(&id_str).context("Invalid budget ID")?,
            user_id: Uuid::parse_str(&user_id_str).context("Invalid user ID")?,
            category: row.get("category"),
            amount: row.get("amount"),
            window,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    fn columns(kind: RecordKind) -> &'static str {
        match kind {
            RecordKind::Income => INCOME_COLUMNS,
            RecordKind::Expense => EXPENSE_COLUMNS,
        }
    }

    fn row_to_record(kind: RecordKind, row: &SqliteRow) -> Result<LedgerRecord> {
        let id_str: String = row.get("id");
        let user_id_str: String = row.get("user_id");
        let date_str: String = row.get("date");

        let id = Uuid::parse_str(&id_str).context("Invalid record ID")?;
        let user_id = Uuid::parse_str(&user_id_str).context("Invalid user ID")?;
        let date =
            NaiveDate::parse_from_str(&date_str, DATE_FORMAT).context("Invalid record date")?;

        Ok(match kind {
            RecordKind::Income => LedgerRecord::Income(IncomeRecord {
                id,
                user_id,
                sequence: row.get("sequence"),
                source: row.get("source"),
                amount: row.get("amount"),
                date,
                payment_method: row.get("payment_method"),
                notes: row.get("notes"),
                other_source: row.get("other_source"),
            }),
            RecordKind::Expense => LedgerRecord::Expense(ExpenseRecord {
                id,
                user_id,
                sequence: row.get("sequence"),
                category: row.get("category"),
                amount: row.get("amount"),
                date,
                payment_method: row.get("payment_method"),
                notes: row.get("notes"),
                other_source: row.get("other_source"),
            }),
        })
    }
}

/// True when `err` was caused by a foreign-key constraint failure.
pub fn is_foreign_key_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err.is_foreign_key_violation(),
        _ => false,
    }
}
