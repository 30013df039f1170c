use tracing::debug;

use crate::domain::{Amount, LedgerRecord, MonthWindow, RecordKind, UserId};
use crate::storage::Repository;

use super::AppError;

/// How many records the "recent" views show unless told otherwise.
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Monthly totals and recency-ordered views over a user's ledger.
///
/// The aggregator never consults the clock: every monthly figure is computed
/// for an explicit [`MonthWindow`].
pub struct Aggregator<'a> {
    repo: &'a Repository,
}

impl<'a> Aggregator<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Sum of amounts over the user's records of `kind` dated within `window`.
    /// Returns 0.0 when nothing matches. No rounding is applied.
    pub async fn monthly_total(
        &self,
        user_id: UserId,
        kind: RecordKind,
        window: MonthWindow,
    ) -> Result<Amount, AppError> {
        let records = self
            .repo
            .query_by_user_and_month(user_id, window, kind)
            .await?;
        let total = sum_amounts(&records);

        debug!(%user_id, %kind, %window, count = records.len(), total, "computed monthly total");
        Ok(total)
    }

    /// Expense total for `window`, restricted to `category` when one is given.
    pub async fn monthly_spending(
        &self,
        user_id: UserId,
        category: Option<&str>,
        window: MonthWindow,
    ) -> Result<Amount, AppError> {
        let Some(category) = category else {
            return self.monthly_total(user_id, RecordKind::Expense, window).await;
        };

        let records: Vec<LedgerRecord> = self
            .repo
            .query_by_user_and_month(user_id, window, RecordKind::Expense)
            .await?
            .into_iter()
            .filter(|record| record.label() == category)
            .collect();
        let total = sum_amounts(&records);

        debug!(
            %user_id,
            category,
            %window,
            count = records.len(),
            total,
            "computed category spending"
        );
        Ok(total)
    }

    /// At most `limit` records of `kind`, newest date first.
    pub async fn recent_records(
        &self,
        user_id: UserId,
        kind: RecordKind,
        limit: usize,
    ) -> Result<Vec<LedgerRecord>, AppError> {
        let mut records = self.repo.query_recent_by_user(user_id, kind, limit).await?;

        // Newest date first, same-day records by latest insertion
        records.sort_by(|a, b| {
            b.date()
                .cmp(&a.date())
                .then_with(|| b.sequence().cmp(&a.sequence()))
        });
        records.truncate(limit);
        Ok(records)
    }
}

/// Floating-point accumulation of record amounts, starting from positive zero.
pub fn sum_amounts(records: &[LedgerRecord]) -> Amount {
    records.iter().fold(0.0, |total, record| total + record.amount())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExpenseRecord;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn test_sum_amounts_empty_is_positive_zero() {
        let total = sum_amounts(&[]);
        assert_eq!(total, 0.0);
        assert!(!total.is_sign_negative());
    }

    #[test]
    fn test_sum_amounts() {
        let user = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let records: Vec<LedgerRecord> = [50.0, 100.0, 15.99]
            .into_iter()
            .map(|amount| ExpenseRecord::new(user, "Misc", amount, date, "Cash").into())
            .collect();

        assert!((sum_amounts(&records) - 165.99).abs() < 1e-9);
    }
}
