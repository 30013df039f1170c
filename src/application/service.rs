use tracing::{info, warn};

use crate::domain::{
    is_storable_date, Amount, Budget, BudgetId, BudgetStatus, ExpenseRecord, IncomeRecord,
    LedgerRecord, MonthWindow, NewUser, ProfileUpdate, RecordKind, User, UserId, MAX_YEAR,
    MIN_YEAR, TOTAL_BUDGET_LABEL,
};
use crate::storage::{is_foreign_key_violation, Repository, StoreConfig};

use super::input::{non_blank, required};
use super::summary::{expense_entries, income_entries};
use super::{
    Aggregator, AppError, ExpenseInput, ExpenseOverview, IncomeInput, IncomeOverview, Summary,
    SummaryBuilder, DEFAULT_RECENT_LIMIT,
};

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (CLI, API, etc.); callers
/// pass an already authenticated user ID.
pub struct LedgerService {
    repo: Repository,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        Self::init_with(database_path, &StoreConfig::default()).await
    }

    pub async fn init_with(database_path: &str, config: &StoreConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::init(&db_url, config).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database, applying any pending migrations.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        Self::connect_with(database_path, &StoreConfig::default()).await
    }

    pub async fn connect_with(
        database_path: &str,
        config: &StoreConfig,
    ) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect_with(&db_url, config).await?;
        repo.migrate().await?;
        Ok(Self::new(repo))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn aggregator(&self) -> Aggregator<'_> {
        Aggregator::new(&self.repo)
    }

    // ========================
    // User operations
    // ========================

    /// Register a new user. Username and email must be unique.
    pub async fn register_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let username = required(new_user.username, "username")?;
        let full_name = required(new_user.full_name, "fullName")?;
        let email = required(new_user.email, "email")?;

        if self.repo.get_user_by_username(&username).await?.is_some() {
            return Err(AppError::UserAlreadyExists(username));
        }
        if self.repo.get_user_by_email(&email).await?.is_some() {
            return Err(AppError::UserAlreadyExists(email));
        }

        let mut user = User::new(username, full_name, email);
        if let Some(gender) = non_blank(new_user.gender) {
            user = user.with_gender(gender);
        }
        if let Some(qualifications) = non_blank(new_user.qualifications) {
            user = user.with_qualifications(qualifications);
        }

        self.repo.save_user(&user).await?;
        info!(user_id = %user.id, username = %user.username, "registered user");
        Ok(user)
    }

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AppError> {
        self.repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(user_id.to_string()))
    }

    /// Get a user by username.
    pub async fn find_user(&self, username: &str) -> Result<User, AppError> {
        self.repo
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))
    }

    /// List all users.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.repo.list_users().await?)
    }

    /// Update profile fields. Fields left unset keep their current value.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, AppError> {
        let mut user = self.get_user(user_id).await?;

        let update = ProfileUpdate {
            full_name: non_blank(update.full_name),
            email: non_blank(update.email),
            gender: non_blank(update.gender),
            qualifications: non_blank(update.qualifications),
            profile_pic: non_blank(update.profile_pic),
        };
        if update.is_empty() {
            return Ok(user);
        }

        if let Some(email) = &update.email {
            if let Some(existing) = self.repo.get_user_by_email(email).await? {
                if existing.id != user.id {
                    return Err(AppError::UserAlreadyExists(email.clone()));
                }
            }
        }

        user.apply(update);
        self.repo.update_user(&user).await?;
        info!(user_id = %user.id, "updated profile");
        Ok(user)
    }

    // ========================
    // Ledger operations
    // ========================

    /// Validate an income payload and append it to the user's ledger.
    pub async fn add_income(
        &self,
        user_id: UserId,
        input: IncomeInput,
    ) -> Result<IncomeRecord, AppError> {
        let mut income = input.validate(user_id).inspect_err(|e| {
            warn!(%user_id, error = %e, "rejected income payload");
        })?;
        let appended = self.append(income.clone().into()).await?;
        income.sequence = appended.sequence();
        Ok(income)
    }

    /// Validate an expense payload and append it to the user's ledger.
    pub async fn add_expense(
        &self,
        user_id: UserId,
        input: ExpenseInput,
    ) -> Result<ExpenseRecord, AppError> {
        let mut expense = input.validate(user_id).inspect_err(|e| {
            warn!(%user_id, error = %e, "rejected expense payload");
        })?;
        let appended = self.append(expense.clone().into()).await?;
        expense.sequence = appended.sequence();
        Ok(expense)
    }

    /// Append an already constructed record.
    /// Fails with `IntegrityError` if the owner does not exist, the amount is not
    /// finite, or the date lies outside years 1..=9999.
    pub async fn append(&self, mut record: LedgerRecord) -> Result<LedgerRecord, AppError> {
        let user_id = record.user_id();

        if !record.amount().is_finite() {
            warn!(%user_id, amount = record.amount(), "rejected non-finite amount");
            return Err(AppError::IntegrityError(format!(
                "amount must be a finite number, got {}",
                record.amount()
            )));
        }

        if !is_storable_date(record.date()) {
            warn!(%user_id, date = %record.date(), "rejected out-of-range date");
            return Err(AppError::IntegrityError(format!(
                "date {} is outside the supported years {}..={}",
                record.date(),
                MIN_YEAR,
                MAX_YEAR
            )));
        }

        if self.repo.get_user(user_id).await?.is_none() {
            warn!(%user_id, kind = %record.kind(), "rejected append for unknown user");
            return Err(Self::unknown_owner(user_id));
        }

        match self.repo.append(&mut record).await {
            Ok(()) => {}
            Err(e) if is_foreign_key_violation(&e) => {
                warn!(%user_id, kind = %record.kind(), "append hit foreign key violation");
                return Err(Self::unknown_owner(user_id));
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            %user_id,
            kind = %record.kind(),
            sequence = record.sequence(),
            amount = record.amount(),
            date = %record.date(),
            "appended ledger record"
        );
        Ok(record)
    }

    fn unknown_owner(user_id: UserId) -> AppError {
        AppError::IntegrityError(format!("owning user {} does not exist", user_id))
    }

    // ========================
    // Aggregation operations
    // ========================

    /// Monthly income total plus the most recent income entries.
    pub async fn income_overview(
        &self,
        user_id: UserId,
        window: MonthWindow,
    ) -> Result<IncomeOverview, AppError> {
        self.get_user(user_id).await?;
        let aggregator = self.aggregator();
        let total_monthly_income = aggregator
            .monthly_total(user_id, RecordKind::Income, window)
            .await?;
        let recent = aggregator
            .recent_records(user_id, RecordKind::Income, DEFAULT_RECENT_LIMIT)
            .await?;

        Ok(IncomeOverview {
            month: window.month(),
            year: window.year(),
            total_monthly_income,
            recent_income: income_entries(&recent),
        })
    }

    /// Monthly expense total plus the most recent expense entries.
    pub async fn expense_overview(
        &self,
        user_id: UserId,
        window: MonthWindow,
    ) -> Result<ExpenseOverview, AppError> {
        self.get_user(user_id).await?;
        let aggregator = self.aggregator();
        let total_monthly_expenses = aggregator
            .monthly_total(user_id, RecordKind::Expense, window)
            .await?;
        let recent = aggregator
            .recent_records(user_id, RecordKind::Expense, DEFAULT_RECENT_LIMIT)
            .await?;

        Ok(ExpenseOverview {
            month: window.month(),
            year: window.year(),
            total_monthly_expenses,
            recent_expenses: expense_entries(&recent),
        })
    }

    /// Dashboard summary for `user_id` as of `window`.
    pub async fn summary(&self, user_id: UserId, window: MonthWindow) -> Result<Summary, AppError> {
        SummaryBuilder::new(&self.repo).build(user_id, window).await
    }

    /// Every record of `kind` for the user, oldest first.
    pub async fn list_records(
        &self,
        user_id: UserId,
        kind: RecordKind,
    ) -> Result<Vec<LedgerRecord>, AppError> {
        Ok(self.repo.list_records_for_user(user_id, kind).await?)
    }

    // ========================
    // Budget operations
    // ========================

    /// Create a budget for `window`. `category: None` caps all spending.
    /// Each user has at most one budget per category and month.
    pub async fn create_budget(
        &self,
        user_id: UserId,
        category: Option<String>,
        amount: Amount,
        window: MonthWindow,
    ) -> Result<Budget, AppError> {
        self.get_user(user_id).await?;
        check_budget_amount(amount)?;
        let category = non_blank(category);

        if self
            .repo
            .find_budget(user_id, category.as_deref(), window)
            .await?
            .is_some()
        {
            let label = category.as_deref().unwrap_or(TOTAL_BUDGET_LABEL);
            return Err(AppError::BudgetAlreadyExists(format!("{} for {}", label, window)));
        }

        let budget = Budget::new(user_id, category, amount, window);
        self.repo.save_budget(&budget).await?;
        info!(%user_id, budget = budget.label(), %window, amount, "created budget");
        Ok(budget)
    }

    /// Get one of the user's budgets.
    pub async fn get_budget(
        &self,
        user_id: UserId,
        budget_id: BudgetId,
    ) -> Result<Budget, AppError> {
        self.repo
            .get_budget(budget_id)
            .await?
            .filter(|budget| budget.user_id == user_id)
            .ok_or_else(|| AppError::BudgetNotFound(budget_id.to_string()))
    }

    /// Change a budget's limit.
    pub async fn update_budget(
        &self,
        user_id: UserId,
        budget_id: BudgetId,
        amount: Amount,
    ) -> Result<Budget, AppError> {
        check_budget_amount(amount)?;
        let mut budget = self.get_budget(user_id, budget_id).await?;
        self.repo.update_budget_amount(budget_id, amount).await?;
        budget.amount = amount;
        info!(%user_id, budget = budget.label(), amount, "updated budget");
        Ok(budget)
    }

    /// Delete a budget, returning what was removed.
    pub async fn delete_budget(
        &self,
        user_id: UserId,
        budget_id: BudgetId,
    ) -> Result<Budget, AppError> {
        let budget = self.get_budget(user_id, budget_id).await?;
        self.repo.delete_budget(budget_id).await?;
        info!(%user_id, budget = budget.label(), "deleted budget");
        Ok(budget)
    }

    /// The user's budgets, all months or just `window`.
    pub async fn list_budgets(
        &self,
        user_id: UserId,
        window: Option<MonthWindow>,
    ) -> Result<Vec<Budget>, AppError> {
        self.get_user(user_id).await?;
        Ok(self.repo.list_budgets(user_id, window).await?)
    }

    /// Spending against each of the user's budgets for `window`.
    pub async fn budget_analysis(
        &self,
        user_id: UserId,
        window: MonthWindow,
    ) -> Result<Vec<BudgetStatus>, AppError> {
        let budgets = self.list_budgets(user_id, Some(window)).await?;
        let aggregator = self.aggregator();

        let mut statuses = Vec::with_capacity(budgets.len());
        for budget in budgets {
            let spent = aggregator
                .monthly_spending(user_id, budget.category.as_deref(), window)
                .await?;
            let status = BudgetStatus::new(budget, spent);
            if status.is_exceeded() {
                warn!(
                    %user_id,
                    budget = status.budget.label(),
                    %window,
                    spent,
                    "budget exceeded"
                );
            }
            statuses.push(status);
        }

        Ok(statuses)
    }
}

fn check_budget_amount(amount: Amount) -> Result<(), AppError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::ValidationError(format!("Invalid budget amount: {}", amount)));
    }
    Ok(())
}
