mod repository;

pub use repository::*;

/// SQL migration for user accounts
pub const MIGRATION_001_USERS: &str = include_str!("migrations/001_users.sql");

/// SQL migration for income and expense tables
pub const MIGRATION_002_LEDGER: &str = include_str!("migrations/002_ledger.sql");

/// SQL migration for monthly budgets
pub const MIGRATION_003_BUDGETS: &str = include_str!("migrations/003_budgets.sql");

/// All schema migrations, in the order they must be applied.
pub const MIGRATIONS: &[(i64, &str)] = &[
    (1, MIGRATION_001_USERS),
    (2, MIGRATION_002_LEDGER),
    (3, MIGRATION_003_BUDGETS),
];
