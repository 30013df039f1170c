use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Budget not found: {0}")]
    BudgetNotFound(String),

    #[error("Budget already exists: {0}")]
    BudgetAlreadyExists(String),

    /// A write that would break ledger integrity (unknown owner, non-finite amount).
    /// Nothing is written; the caller must correct the input and resubmit.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// A malformed payload rejected before it reaches the ledger.
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
