// Application layer - use cases and orchestration over the ledger store.

mod aggregator;
pub mod error;
mod input;
mod service;
mod summary;

pub use aggregator::*;
pub use error::*;
pub use input::{AmountInput, ExpenseInput, IncomeInput, DEFAULT_INCOME_PAYMENT_METHOD};
pub use service::*;
pub use summary::{
    ExpenseEntry, ExpenseOverview, IncomeEntry, IncomeOverview, Summary, SummaryBuilder,
};
