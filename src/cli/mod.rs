use std::fs::File;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::application::{
    AmountInput, ExpenseEntry, ExpenseInput, IncomeEntry, IncomeInput, LedgerService, Summary,
};
use crate::domain::{
    format_amount, parse_amount, Budget, BudgetStatus, MonthWindow, NewUser, ProfileUpdate,
    RecordKind, User,
};
use crate::io::Exporter;
use crate::storage::StoreConfig;

/// SpendSmart - personal income and expense tracker
#[derive(Parser)]
#[command(name = "spendsmart")]
#[command(about = "Track income and expenses and summarise them by month")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "SPENDSMART_DATABASE", default_value = "spendsmart.db")]
    pub database: String,

    /// Seconds to wait on a locked database before giving up
    #[arg(long, env = "SPENDSMART_BUSY_TIMEOUT_SECS", default_value_t = 5, global = true)]
    pub busy_timeout_secs: u64,

    /// Enable verbose (debug) logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// User account commands
    #[command(subcommand)]
    User(UserCommands),

    /// Income commands
    #[command(subcommand)]
    Income(IncomeCommands),

    /// Expense commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Monthly budget commands
    #[command(subcommand)]
    Budget(BudgetCommands),

    /// Show the monthly summary for a user
    Summary {
        /// Username
        #[arg(short, long)]
        user: String,

        /// Month (1-12, defaults to the current month)
        #[arg(short, long)]
        month: Option<u32>,

        /// Year (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Export a user's ledger to CSV or JSON
    Export {
        /// Username
        #[arg(short, long)]
        user: String,

        /// What to export: income, expense, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Create {
        /// Username (must be unique)
        username: String,

        #[arg(long)]
        full_name: String,

        /// Email address (must be unique)
        #[arg(long)]
        email: String,

        #[arg(long)]
        gender: Option<String>,

        #[arg(long)]
        qualifications: Option<String>,
    },

    /// Show a user's profile
    Show { username: String },

    /// Update profile fields
    Update {
        username: String,

        #[arg(long)]
        full_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        gender: Option<String>,

        #[arg(long)]
        qualifications: Option<String>,

        /// Path or URL of the profile picture
        #[arg(long)]
        profile_pic: Option<String>,
    },

    /// List all users
    List,
}

#[derive(Subcommand)]
pub enum IncomeCommands {
    /// Record income
    Add {
        /// Username
        #[arg(short, long)]
        user: String,

        /// Amount received (e.g., "2500.00" or "2500")
        amount: String,

        /// Where the money came from (e.g., "Salary")
        #[arg(short, long)]
        source: String,

        /// Date received (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Defaults to "Bank Transfer"
        #[arg(long)]
        payment_method: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,

        #[arg(long)]
        other_source: Option<String>,
    },

    /// Show monthly income total and recent income
    Show {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        month: Option<u32>,

        #[arg(short, long)]
        year: Option<i32>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense
    Add {
        /// Username
        #[arg(short, long)]
        user: String,

        /// Amount spent (e.g., "15.99")
        amount: String,

        /// Spending category (e.g., "Groceries")
        #[arg(short, long)]
        category: String,

        /// Date spent (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        #[arg(short, long)]
        payment_method: String,

        #[arg(short, long)]
        notes: Option<String>,

        #[arg(long)]
        other_source: Option<String>,
    },

    /// Show monthly expense total and recent expenses
    Show {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        month: Option<u32>,

        #[arg(short, long)]
        year: Option<i32>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Set a spending limit for a month
    Set {
        #[arg(short, long)]
        user: String,

        /// Limit (e.g., "400" or "400.00")
        amount: String,

        /// Expense category to cap (all categories if omitted)
        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        month: Option<u32>,

        #[arg(short, long)]
        year: Option<i32>,
    },

    /// List budgets, optionally for one month
    List {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        month: Option<u32>,

        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Change a budget's limit
    Update {
        #[arg(short, long)]
        user: String,

        /// Budget ID
        id: String,

        amount: String,
    },

    /// Delete a budget
    Delete {
        #[arg(short, long)]
        user: String,

        /// Budget ID
        id: String,
    },

    /// Show spending against each budget for a month
    Status {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        month: Option<u32>,

        #[arg(short, long)]
        year: Option<i32>,

        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// What `export` writes: one record kind as CSV, or the whole ledger as JSON.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExportTarget {
    Records(RecordKind),
    Full,
}

impl ExportTarget {
    fn parse(export_type: &str) -> Result<Self> {
        match export_type.to_lowercase().as_str() {
            "full" => Ok(ExportTarget::Full),
            other => RecordKind::from_str(other)
                .map(ExportTarget::Records)
                .ok_or_else(|| {
                    anyhow!(
                        "Unknown export type '{}'. Use: income, expense, full",
                        export_type
                    )
                }),
        }
    }
}

impl Cli {
    fn store_config(&self) -> StoreConfig {
        StoreConfig {
            busy_timeout: Duration::from_secs(self.busy_timeout_secs),
            ..StoreConfig::default()
        }
    }

    pub async fn run(self) -> Result<()> {
        let config = self.store_config();

        if matches!(self.command, Commands::Init) {
            LedgerService::init_with(&self.database, &config).await?;
            println!("Database initialized: {}", self.database);
            return Ok(());
        }

        let service = LedgerService::connect_with(&self.database, &config)
            .await
            .with_context(|| {
                format!(
                    "Failed to open database '{}'. Run `spendsmart init` first",
                    self.database
                )
            })?;

        match self.command {
            Commands::Init => {}
            Commands::User(cmd) => run_user_command(&service, cmd).await?,
            Commands::Income(cmd) => run_income_command(&service, cmd).await?,
            Commands::Expense(cmd) => run_expense_command(&service, cmd).await?,
            Commands::Budget(cmd) => run_budget_command(&service, cmd).await?,
            Commands::Summary {
                user,
                month,
                year,
                format,
            } => {
                let user = service.find_user(&user).await?;
                let window = resolve_window(month, year)?;
                let summary = service.summary(user.id, window).await?;
                match format {
                    OutputFormat::Json => print_json(&summary)?,
                    OutputFormat::Text => print_summary(&summary),
                }
            }
            Commands::Export {
                user,
                export_type,
                output,
            } => run_export_command(&service, &user, &export_type, output).await?,
        }

        Ok(())
    }
}

async fn run_user_command(service: &LedgerService, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::Create {
            username,
            full_name,
            email,
            gender,
            qualifications,
        } => {
            let user = service
                .register_user(NewUser {
                    username: Some(username),
                    full_name: Some(full_name),
                    email: Some(email),
                    gender,
                    qualifications,
                })
                .await?;
            println!("Created user '{}' ({})", user.username, user.id);
        }

        UserCommands::Show { username } => {
            let user = service.find_user(&username).await?;
            print_user(&user);
        }

        UserCommands::Update {
            username,
            full_name,
            email,
            gender,
            qualifications,
            profile_pic,
        } => {
            let user = service.find_user(&username).await?;
            let user = service
                .update_profile(
                    user.id,
                    ProfileUpdate {
                        full_name,
                        email,
                        gender,
                        qualifications,
                        profile_pic,
                    },
                )
                .await?;
            println!("Updated user '{}'", user.username);
            print_user(&user);
        }

        UserCommands::List => {
            let users = service.list_users().await?;
            if users.is_empty() {
                println!("No users found.");
            } else {
                println!("{:<20} {:<25} {:<30}", "USERNAME", "NAME", "EMAIL");
                println!("{}", "-".repeat(77));
                for user in users {
                    println!(
                        "{:<20} {:<25} {:<30}",
                        truncate(&user.username, 20),
                        truncate(&user.full_name, 25),
                        truncate(&user.email, 30)
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_income_command(service: &LedgerService, cmd: IncomeCommands) -> Result<()> {
    match cmd {
        IncomeCommands::Add {
            user,
            amount,
            source,
            date,
            payment_method,
            notes,
            other_source,
        } => {
            let user = service.find_user(&user).await?;
            let income = service
                .add_income(
                    user.id,
                    IncomeInput {
                        source: Some(source),
                        amount: Some(AmountInput::Text(amount)),
                        date: Some(date.unwrap_or_else(today)),
                        payment_method,
                        notes,
                        other_source,
                    },
                )
                .await?;
            println!(
                "Recorded income: {} from {} on {} ({})",
                format_amount(income.amount),
                income.source,
                income.date,
                income.id
            );
        }

        IncomeCommands::Show {
            user,
            month,
            year,
            format,
        } => {
            let user = service.find_user(&user).await?;
            let window = resolve_window(month, year)?;
            let overview = service.income_overview(user.id, window).await?;
            match format {
                OutputFormat::Json => print_json(&overview)?,
                OutputFormat::Text => {
                    println!(
                        "Income for {}: {}",
                        window,
                        format_amount(overview.total_monthly_income)
                    );
                    println!();
                    print_income_entries(&overview.recent_income);
                }
            }
        }
    }
    Ok(())
}

async fn run_expense_command(service: &LedgerService, cmd: ExpenseCommands) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            user,
            amount,
            category,
            date,
            payment_method,
            notes,
            other_source,
        } => {
            let user = service.find_user(&user).await?;
            let expense = service
                .add_expense(
                    user.id,
                    ExpenseInput {
                        category: Some(category),
                        amount: Some(AmountInput::Text(amount)),
                        date: Some(date.unwrap_or_else(today)),
                        payment_method: Some(payment_method),
                        notes,
                        other_source,
                    },
                )
                .await?;
            println!(
                "Recorded expense: {} on {} ({}) [{}]",
                format_amount(expense.amount),
                expense.category,
                expense.date,
                expense.id
            );
        }

        ExpenseCommands::Show {
            user,
            month,
            year,
            format,
        } => {
            let user = service.find_user(&user).await?;
            let window = resolve_window(month, year)?;
            let overview = service.expense_overview(user.id, window).await?;
            match format {
                OutputFormat::Json => print_json(&overview)?,
                OutputFormat::Text => {
                    println!(
                        "Expenses for {}: {}",
                        window,
                        format_amount(overview.total_monthly_expenses)
                    );
                    println!();
                    print_expense_entries(&overview.recent_expenses);
                }
            }
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    username: &str,
    export_type: &str,
    output: Option<String>,
) -> Result<()> {
    let target = ExportTarget::parse(export_type)?;
    let user = service.find_user(username).await?;
    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            File::create(path)
                .with_context(|| format!("Failed to create output file '{}'", path))?,
        ),
        None => Box::new(io::stdout()),
    };

    let count = match target {
        ExportTarget::Full => exporter.export_json(user.id, writer).await?,
        ExportTarget::Records(kind) => exporter.export_csv(user.id, kind, writer).await?,
    };

    if let Some(path) = output {
        eprintln!("Exported {} record(s) to {}", count, path);
    }
    Ok(())
}

async fn run_budget_command(service: &LedgerService, cmd: BudgetCommands) -> Result<()> {
    match cmd {
        BudgetCommands::Set {
            user,
            amount,
            category,
            month,
            year,
        } => {
            let user = service.find_user(&user).await?;
            let amount = parse_amount(&amount)
                .with_context(|| format!("Invalid amount '{}'. Use '400.00' or '400'", amount))?;
            let window = resolve_window(month, year)?;
            let budget = service
                .create_budget(user.id, category, amount, window)
                .await?;
            println!(
                "Set budget: {} {} for {} ({})",
                budget.label(),
                format_amount(budget.amount),
                budget.window,
                budget.id
            );
        }

        BudgetCommands::List { user, month, year } => {
            let user = service.find_user(&user).await?;
            let window = match (month, year) {
                (None, None) => None,
                _ => Some(resolve_window(month, year)?),
            };
            let budgets = service.list_budgets(user.id, window).await?;
            print_budgets(&budgets);
        }

        BudgetCommands::Update { user, id, amount } => {
            let user = service.find_user(&user).await?;
            let budget_id = Uuid::parse_str(&id).context("Invalid budget ID")?;
            let amount = parse_amount(&amount)
                .with_context(|| format!("Invalid amount '{}'. Use '400.00' or '400'", amount))?;
            let budget = service.update_budget(user.id, budget_id, amount).await?;
            println!(
                "Updated budget: {} {} for {}",
                budget.label(),
                format_amount(budget.amount),
                budget.window
            );
        }

        BudgetCommands::Delete { user, id } => {
            let user = service.find_user(&user).await?;
            let budget_id = Uuid::parse_str(&id).context("Invalid budget ID")?;
            let budget = service.delete_budget(user.id, budget_id).await?;
            println!("Deleted budget: {} for {}", budget.label(), budget.window);
        }

        BudgetCommands::Status {
            user,
            month,
            year,
            format,
        } => {
            let user = service.find_user(&user).await?;
            let window = resolve_window(month, year)?;
            let statuses = service.budget_analysis(user.id, window).await?;
            match format {
                OutputFormat::Json => print_json(&statuses)?,
                OutputFormat::Text => print_budget_statuses(window, &statuses),
            }
        }
    }
    Ok(())
}

/// Month to report on. Missing parts come from the local calendar.
fn resolve_window(month: Option<u32>, year: Option<i32>) -> Result<MonthWindow> {
    let current = MonthWindow::current_local();
    let month = month.unwrap_or(current.month());
    let year = year.unwrap_or(current.year());
    MonthWindow::new(month, year)
        .ok_or_else(|| anyhow!("Invalid month {}/{}: month must be 1-12", month, year))
}

fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_user(user: &User) {
    println!("Username:       {}", user.username);
    println!("Name:           {}", user.full_name);
    println!("Email:          {}", user.email);
    println!("Gender:         {}", user.gender.as_deref().unwrap_or("-"));
    println!(
        "Qualifications: {}",
        user.qualifications.as_deref().unwrap_or("-")
    );
    println!("Profile pic:    {}", user.profile_pic.as_deref().unwrap_or("-"));
    println!("Member since:   {}", user.created_at.format("%Y-%m-%d"));
}

fn print_summary(summary: &Summary) {
    println!(
        "{} ({}) - {:04}-{:02}",
        summary.full_name, summary.email, summary.year, summary.month
    );
    println!();
    println!("Income:    {:>12}", format_amount(summary.total_monthly_income));
    println!("Expenses:  {:>12}", format_amount(summary.total_monthly_expenses));
    println!("Balance:   {:>12}", format_amount(summary.account_balance));
    println!();
    println!("Recent income");
    print_income_entries(&summary.recent_income);
    println!();
    println!("Recent expenses");
    print_expense_entries(&summary.recent_expenses);
}

fn print_income_entries(entries: &[IncomeEntry]) {
    if entries.is_empty() {
        println!("  (none)");
        return;
    }
    println!(
        "{:<12} {:>10} {:<20} {:<15}",
        "DATE", "AMOUNT", "SOURCE", "PAYMENT"
    );
    println!("{}", "-".repeat(60));
    for entry in entries {
        println!(
            "{:<12} {:>10} {:<20} {:<15}",
            entry.date.format("%Y-%m-%d"),
            format_amount(entry.amount),
            truncate(&entry.source, 20),
            truncate(&entry.payment_method, 15)
        );
    }
}

fn print_expense_entries(entries: &[ExpenseEntry]) {
    if entries.is_empty() {
        println!("  (none)");
        return;
    }
    println!(
        "{:<12} {:>10} {:<20} {:<15}",
        "DATE", "AMOUNT", "CATEGORY", "PAYMENT"
    );
    println!("{}", "-".repeat(60));
    for entry in entries {
        println!(
            "{:<12} {:>10} {:<20} {:<15}",
            entry.date.format("%Y-%m-%d"),
            format_amount(entry.amount),
            truncate(&entry.category, 20),
            truncate(&entry.payment_method, 15)
        );
    }
}

fn print_budgets(budgets: &[Budget]) {
    if budgets.is_empty() {
        println!("No budgets found.");
        return;
    }
    println!(
        "{:<36} {:<8} {:<20} {:>12}",
        "ID", "MONTH", "CATEGORY", "LIMIT"
    );
    println!("{}", "-".repeat(79));
    for budget in budgets {
        println!(
            "{:<36} {:<8} {:<20} {:>12}",
            budget.id,
            budget.window.to_string(),
            truncate(budget.label(), 20),
            format_amount(budget.amount)
        );
    }
}

fn print_budget_statuses(window: MonthWindow, statuses: &[BudgetStatus]) {
    if statuses.is_empty() {
        println!("No budgets for {}.", window);
        return;
    }
    println!("Budgets for {}", window);
    println!();
    println!(
        "{:<20} {:>12} {:>12} {:>12} {:>6}",
        "CATEGORY", "LIMIT", "SPENT", "REMAINING", "USED"
    );
    println!("{}", "-".repeat(66));
    for status in statuses {
        println!(
            "{:<20} {:>12} {:>12} {:>12} {:>5.0}%{}",
            truncate(status.budget.label(), 20),
            format_amount(status.budget.amount),
            format_amount(status.spent),
            format_amount(status.remaining),
            status.percentage,
            if status.is_exceeded() { "  over" } else { "" }
        );
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_export_target_parse() {
        assert_eq!(ExportTarget::parse("full").unwrap(), ExportTarget::Full);
        assert_eq!(
            ExportTarget::parse("Expenses").unwrap(),
            ExportTarget::Records(RecordKind::Expense)
        );
        assert!(ExportTarget::parse("budgets").is_err());
    }

    #[tokio::test]
    async fn test_unknown_export_type_leaves_output_file_untouched() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("cli.db");
        let service = LedgerService::init(db_path.to_str().unwrap()).await?;
        service
            .register_user(NewUser {
                username: Some("ana".into()),
                full_name: Some("Ana Lima".into()),
                email: Some("ana@example.com".into()),
                ..Default::default()
            })
            .await?;

        let out = temp_dir.path().join("out.csv");
        std::fs::write(&out, "previous export")?;

        let output = Some(out.to_str().unwrap().to_string());
        let result = run_export_command(&service, "ana", "bogus", output).await;
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&out)?, "previous export");

        Ok(())
    }
}
