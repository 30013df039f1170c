use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, MonthWindow, UserId};

pub type BudgetId = Uuid;

/// Label used for a budget that caps spending across every category.
pub const TOTAL_BUDGET_LABEL: &str = "Total";

/// A spending limit for one month, either for a single expense category
/// or for all expenses together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: BudgetId,
    pub user_id: UserId,
    /// `None` means the budget covers all categories
    pub category: Option<String>,
    pub amount: Amount,
    #[serde(flatten)]
    pub window: MonthWindow,
    pub created_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(
        user_id: UserId,
        category: Option<String>,
        amount: Amount,
        window: MonthWindow,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            category,
            amount,
            window,
            created_at: Utc::now(),
        }
    }

    /// Category name, or "Total" for an all-category budget.
    pub fn label(&self) -> &str {
        self.category.as_deref().unwrap_or(TOTAL_BUDGET_LABEL)
    }
}

/// Spending measured against a budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    pub budget: Budget,
    pub spent: Amount,
    /// Negative once the budget is overspent
    pub remaining: Amount,
    /// Spent as a percentage of the budget; 0 for a zero budget
    pub percentage: f64,
}

impl BudgetStatus {
    pub fn new(budget: Budget, spent: Amount) -> Self {
        let remaining = budget.amount - spent;
        let percentage = if budget.amount > 0.0 {
            spent / budget.amount * 100.0
        } else {
            0.0
        };

        Self {
            budget,
            spent,
            remaining,
            percentage,
        }
    }

    pub fn is_exceeded(&self) -> bool {
        self.spent > self.budget.amount
    }
}
