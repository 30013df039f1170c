use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, UserId};

pub type RecordId = Uuid;

/// Which side of the ledger a record lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Income,
    Expense,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Income => "income",
            RecordKind::Expense => "expense",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "income" | "incomes" => Some(RecordKind::Income),
            "expense" | "expenses" => Some(RecordKind::Expense),
            _ => None,
        }
    }

    /// Backing table for this kind.
    pub(crate) fn table(&self) -> &'static str {
        match self {
            RecordKind::Income => "incomes",
            RecordKind::Expense => "expenses",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Money received by a user. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub id: RecordId,
    pub user_id: UserId,
    /// Insertion order across the whole ledger, assigned by the repository
    pub sequence: i64,
    pub source: String,
    pub amount: Amount,
    pub date: NaiveDate,
    pub payment_method: String,
    pub notes: Option<String>,
    pub other_source: Option<String>,
}

impl IncomeRecord {
    /// Create a new income record. Sequence number is assigned on append.
    pub fn new(
        user_id: UserId,
        source: impl Into<String>,
        amount: Amount,
        date: NaiveDate,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            sequence: 0,
            source: source.into(),
            amount,
            date,
            payment_method: payment_method.into(),
            notes: None,
            other_source: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_other_source(mut self, other_source: impl Into<String>) -> Self {
        self.other_source = Some(other_source.into());
        self
    }
}

/// Money spent by a user. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: RecordId,
    pub user_id: UserId,
    pub sequence: i64,
    pub category: String,
    pub amount: Amount,
    pub date: NaiveDate,
    pub payment_method: String,
    pub notes: Option<String>,
    pub other_source: Option<String>,
}

impl ExpenseRecord {
    /// Create a new expense record. Sequence number is assigned on append.
    pub fn new(
        user_id: UserId,
        category: impl Into<String>,
        amount: Amount,
        date: NaiveDate,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            sequence: 0,
            category: category.into(),
            amount,
            date,
            payment_method: payment_method.into(),
            notes: None,
            other_source: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_other_source(mut self, other_source: impl Into<String>) -> Self {
        self.other_source = Some(other_source.into());
        self
    }
}

/// A record of either kind, as returned by kind-parameterised queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LedgerRecord {
    Income(IncomeRecord),
    Expense(ExpenseRecord),
}

impl LedgerRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            LedgerRecord::Income(_) => RecordKind::Income,
            LedgerRecord::Expense(_) => RecordKind::Expense,
        }
    }

    pub fn id(&self) -> RecordId {
        match self {
            LedgerRecord::Income(r) => r.id,
            LedgerRecord::Expense(r) => r.id,
        }
    }

    pub fn user_id(&self) -> UserId {
        match self {
            LedgerRecord::Income(r) => r.user_id,
            LedgerRecord::Expense(r) => r.user_id,
        }
    }

    pub fn sequence(&self) -> i64 {
        match self {
            LedgerRecord::Income(r) => r.sequence,
            LedgerRecord::Expense(r) => r.sequence,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            LedgerRecord::Income(r) => r.amount,
            LedgerRecord::Expense(r) => r.amount,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            LedgerRecord::Income(r) => r.date,
            LedgerRecord::Expense(r) => r.date,
        }
    }

    /// Income source or expense category.
    pub fn label(&self) -> &str {
        match self {
            LedgerRecord::Income(r) => &r.source,
            LedgerRecord::Expense(r) => &r.category,
        }
    }

    pub fn payment_method(&self) -> &str {
        match self {
            LedgerRecord::Income(r) => &r.payment_method,
            LedgerRecord::Expense(r) => &r.payment_method,
        }
    }

    pub fn notes(&self) -> Option<&str> {
        match self {
            LedgerRecord::Income(r) => r.notes.as_deref(),
            LedgerRecord::Expense(r) => r.notes.as_deref(),
        }
    }

    pub fn other_source(&self) -> Option<&str> {
        match self {
            LedgerRecord::Income(r) => r.other_source.as_deref(),
            LedgerRecord::Expense(r) => r.other_source.as_deref(),
        }
    }

    pub(crate) fn set_sequence(&mut self, sequence: i64) {
        match self {
            LedgerRecord::Income(r) => r.sequence = sequence,
            LedgerRecord::Expense(r) => r.sequence = sequence,
        }
    }
}

impl From<IncomeRecord> for LedgerRecord {
    fn from(record: IncomeRecord) -> Self {
        LedgerRecord::Income(record)
    }
}

impl From<ExpenseRecord> for LedgerRecord {
    fn from(record: ExpenseRecord) -> Self {
        LedgerRecord::Expense(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_record_kind_roundtrip() {
        for kind in [RecordKind::Income, RecordKind::Expense] {
            assert_eq!(RecordKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(RecordKind::from_str("Expenses"), Some(RecordKind::Expense));
        assert_eq!(RecordKind::from_str("transfer"), None);
    }

    #[test]
    fn test_ledger_record_accessors() {
        let user = Uuid::new_v4();
        let record: LedgerRecord =
            ExpenseRecord::new(user, "Groceries", 50.0, date("2024-03-02"), "Card")
                .with_notes("weekly shop")
                .into();

        assert_eq!(record.kind(), RecordKind::Expense);
        assert_eq!(record.user_id(), user);
        assert_eq!(record.label(), "Groceries");
        assert_eq!(record.amount(), 50.0);
        assert_eq!(record.date(), date("2024-03-02"));
        assert_eq!(record.notes(), Some("weekly shop"));
        assert_eq!(record.other_source(), None);
    }

    #[test]
    fn test_ledger_record_serializes_with_kind_tag() {
        let record: LedgerRecord = IncomeRecord::new(
            Uuid::new_v4(),
            "Salary",
            3000.0,
            date("2024-03-01"),
            "Bank Transfer",
        )
        .into();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "income");
        assert_eq!(json["source"], "Salary");
        assert_eq!(json["date"], "2024-03-01");
    }
}
