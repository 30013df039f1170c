use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{
    format_amount, Budget, ExpenseRecord, IncomeRecord, LedgerRecord, RecordKind, User, UserId,
};

/// Snapshot of one user's ledger for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub user: User,
    pub incomes: Vec<IncomeRecord>,
    pub expenses: Vec<ExpenseRecord>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
}

/// Exporter for converting a user's ledger to CSV or JSON
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export the user's records of one kind to CSV, oldest first.
    pub async fn export_csv<W: Write>(
        &self,
        user_id: UserId,
        kind: RecordKind,
        writer: W,
    ) -> Result<usize> {
        self.service.get_user(user_id).await?;
        let records = self.service.list_records(user_id, kind).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        let label = match kind {
            RecordKind::Income => "source",
            RecordKind::Expense => "category",
        };
        csv_writer.write_record([
            "id",
            "sequence",
            "date",
            label,
            "amount",
            "payment_method",
            "notes",
            "other_source",
        ])?;

        for record in &records {
            csv_writer.write_record([
                record.id().to_string(),
                record.sequence().to_string(),
                record.date().format("%Y-%m-%d").to_string(),
                record.label().to_string(),
                format_amount(record.amount()),
                record.payment_method().to_string(),
                record.notes().unwrap_or_default().to_string(),
                record.other_source().unwrap_or_default().to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(records.len())
    }

    /// Build a full snapshot of the user's ledger.
    pub async fn snapshot(&self, user_id: UserId) -> Result<LedgerSnapshot> {
        let user = self.service.get_user(user_id).await?;
        let incomes = self
            .service
            .list_records(user_id, RecordKind::Income)
            .await?
            .into_iter()
            .filter_map(|record| match record {
                LedgerRecord::Income(income) => Some(income),
                LedgerRecord::Expense(_) => None,
            })
            .collect();
        let expenses = self
            .service
            .list_records(user_id, RecordKind::Expense)
            .await?
            .into_iter()
            .filter_map(|record| match record {
                LedgerRecord::Expense(expense) => Some(expense),
                LedgerRecord::Income(_) => None,
            })
            .collect();

        let budgets = self.service.list_budgets(user_id, None).await?;

        Ok(LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            user,
            incomes,
            expenses,
            budgets,
        })
    }

    /// Export the user's whole ledger and budgets as pretty-printed JSON.
    /// Returns the number of ledger records written.
    pub async fn export_json<W: Write>(&self, user_id: UserId, writer: W) -> Result<usize> {
        let snapshot = self.snapshot(user_id).await?;
        let count = snapshot.incomes.len() + snapshot.expenses.len();
        serde_json::to_writer_pretty(writer, &snapshot)?;
        Ok(count)
    }
}
