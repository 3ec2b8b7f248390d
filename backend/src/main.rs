use anyhow::{bail, Result};
use budgetit_backend::config::AppConfig;
use budgetit_backend::domain::stats::{self, ExpenseQuery, ExpenseSort, YearMonth};
use budgetit_backend::domain::validation::{self, ExpenseInput};
use budgetit_backend::domain::{LoginResult, Outcome, SettingKey};
use budgetit_backend::{initialize_backend, BudgetApp, FileStorage};
use chrono::Local;
use clap::{Parser, Subcommand};
use log::debug;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "budgetit")]
#[command(about = "Track expenses and monthly budgets across profiles")]
#[command(version)]
struct Cli {
    /// Data directory (overrides BUDGETIT_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Manage expenses of the active profile
    #[command(subcommand)]
    Expense(ExpenseCommand),
    #[command(subcommand)]
    Category(CategoryCommand),
    #[command(subcommand)]
    Budget(BudgetCommand),
    #[command(subcommand)]
    Setting(SettingCommand),
    /// Monthly summary of the active profile
    Stats {
        /// Month as YYYY-MM, defaults to the current month
        #[arg(long)]
        month: Option<YearMonth>,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    List,
    Create {
        name: String,
        /// 4 to 8 digits
        #[arg(long)]
        pin: Option<String>,
    },
    /// Log in to a profile
    Use {
        id: String,
        #[arg(long, default_value = "")]
        pin: String,
    },
    Logout,
    Rename {
        id: String,
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    List {
        #[arg(long)]
        month: Option<YearMonth>,
        #[arg(long)]
        category: Option<String>,
        /// date-desc, date-asc, amount-desc or amount-asc
        #[arg(long, default_value = "date-desc")]
        sort: ExpenseSort,
    },
    Add {
        name: String,
        amount: String,
        #[arg(long, default_value = shared::FALLBACK_CATEGORY)]
        category: String,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    List,
    Add {
        name: String,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a category, moving its expenses to the fallback category
    Remove {
        name: String,
    },
}

#[derive(Subcommand, Debug)]
enum BudgetCommand {
    List {
        #[arg(long)]
        month: Option<YearMonth>,
    },
    Set {
        category: String,
        amount: String,
    },
}

#[derive(Subcommand, Debug)]
enum SettingCommand {
    Get { key: SettingKey },
    Set { key: SettingKey, value: String },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    debug!("Parsed arguments: {:?}", cli);

    let config = match &cli.data_dir {
        Some(dir) => AppConfig::load_from(dir)?,
        None => AppConfig::load()?,
    };
    let mut app = initialize_backend(&config)?;

    match cli.command {
        Command::Profile(command) => run_profile(&mut app, command),
        Command::Expense(command) => run_expense(&mut app, command),
        Command::Category(command) => run_category(&mut app, command),
        Command::Budget(command) => run_budget(&mut app, command),
        Command::Setting(command) => run_setting(&mut app, command),
        Command::Stats { month } => run_stats(&app, month.unwrap_or_else(current_month)),
    }
}

fn current_month() -> YearMonth {
    YearMonth::of(Local::now().date_naive())
}

/// Turn a non-applied outcome into a user-facing error
fn require<T>(outcome: Outcome<T>, subject: &str) -> Result<T> {
    match outcome {
        Outcome::Applied(value) => Ok(value),
        Outcome::Unchanged => bail!("{}: nothing changed", subject),
        Outcome::NoActiveProfile => bail!("No active profile. Run `budgetit profile use <id>` first."),
        Outcome::NotFound => bail!("{}: not found", subject),
    }
}

fn currency(app: &BudgetApp<FileStorage>) -> String {
    app.store()
        .get_setting(SettingKey::Currency)
        .unwrap_or_else(|| shared::DEFAULT_CURRENCY.to_string())
}

fn require_active(app: &BudgetApp<FileStorage>) -> Result<()> {
    if app.store().active_profile().is_none() {
        bail!("No active profile. Run `budgetit profile use <id>` first.");
    }
    Ok(())
}

fn run_profile(app: &mut BudgetApp<FileStorage>, command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::List => {
            let active = app.store().active_profile_id().map(str::to_string);
            for profile in app.store().profiles() {
                let marker = if active.as_deref() == Some(profile.id.as_str()) { "*" } else { " " };
                let lock = if profile.has_pin { " [pin]" } else { "" };
                println!(
                    "{} {}  {}{}  ({} expenses)",
                    marker, profile.id, profile.name, lock, profile.expense_count
                );
            }
        }
        ProfileCommand::Create { name, pin } => {
            let name = validation::validate_profile_name(&name)?;
            let pin = validation::validate_pin(pin.as_deref())?;
            let id = app.create_profile(&name, pin.as_deref())?;
            println!("Created profile {} ({})", name, id);
        }
        ProfileCommand::Use { id, pin } => match app.login(&id, &pin)? {
            LoginResult::Granted => println!("Switched to profile {}", id),
            LoginResult::WrongPin => bail!("Wrong pin"),
            LoginResult::UnknownProfile => bail!("Profile {} not found", id),
        },
        ProfileCommand::Logout => {
            require(app.logout()?, "Logout")?;
            println!("Logged out");
        }
        ProfileCommand::Rename { id, name } => {
            let name = validation::validate_profile_name(&name)?;
            match app.rename_profile(&id, &name)? {
                Outcome::Unchanged => println!("Profile already named {}", name),
                outcome => {
                    require(outcome, &format!("Profile {}", id))?;
                    println!("Renamed profile {} to {}", id, name);
                }
            }
        }
    }
    Ok(())
}

fn run_expense(app: &mut BudgetApp<FileStorage>, command: ExpenseCommand) -> Result<()> {
    require_active(app)?;

    match command {
        ExpenseCommand::List {
            month,
            category,
            sort,
        } => {
            let currency = currency(app);
            let query = ExpenseQuery {
                month,
                category,
                sort,
            };
            for expense in query.apply(app.store().expenses()) {
                println!(
                    "{}  {}  {:>10.2} {}  {}  [{}]",
                    expense.id, expense.date, expense.amount, currency, expense.name, expense.category
                );
            }
        }
        ExpenseCommand::Add {
            name,
            amount,
            category,
            date,
            notes,
        } => {
            let today = Local::now().date_naive();
            let input = ExpenseInput {
                name,
                amount,
                category,
                date: date.unwrap_or_else(|| today.format(shared::DATE_FORMAT).to_string()),
                notes,
            };
            let expense = validation::validate_expense(&input, today)?;
            let id = require(app.add_expense(expense)?, "Expense")?;
            println!("Added expense {}", id);
        }
        ExpenseCommand::Delete { id } => {
            require(app.delete_expense(&id)?, &format!("Expense {}", id))?;
            println!("Deleted expense {}", id);
        }
    }
    Ok(())
}

fn run_category(app: &mut BudgetApp<FileStorage>, command: CategoryCommand) -> Result<()> {
    let Some(profile) = app.store().active_profile() else {
        bail!("No active profile. Run `budgetit profile use <id>` first.");
    };

    match command {
        CategoryCommand::List => {
            for category in &profile.categories {
                println!("{}", category);
            }
        }
        CategoryCommand::Add { name, icon } => {
            let (name, icon) = validation::validate_new_category(profile, &name, icon.as_deref())?;
            require(app.add_category(&name, Some(&icon))?, &format!("Category {}", name))?;
            println!("Added category {} {}", icon, name);
        }
        CategoryCommand::Remove { name } => {
            let removal = require(app.remove_category(&name)?, &format!("Category {}", name))?;
            println!(
                "Removed category {} ({} expenses moved to {})",
                name,
                removal.reassigned_expenses,
                shared::FALLBACK_CATEGORY
            );
        }
    }
    Ok(())
}

fn run_budget(app: &mut BudgetApp<FileStorage>, command: BudgetCommand) -> Result<()> {
    require_active(app)?;

    match command {
        BudgetCommand::List { month } => {
            let month = month.unwrap_or_else(current_month);
            let currency = currency(app);
            let budgets = app.store().valid_budgets();
            for progress in stats::budget_progress(app.store().expenses(), &budgets, month) {
                println!(
                    "{:<16} {:>10.2} / {:>10.2} {}  {:>5.1}%  {:?}",
                    progress.category,
                    progress.spent,
                    progress.limit,
                    currency,
                    progress.percent,
                    progress.status
                );
            }
        }
        BudgetCommand::Set { category, amount } => {
            let amount = validation::validate_budget_amount(validation::parse_amount(&amount)?)?;
            require(app.set_budget(&category, amount)?, "Budget")?;
            println!("Budget for {} set to {:.2}", category, amount);
        }
    }
    Ok(())
}

fn run_setting(app: &mut BudgetApp<FileStorage>, command: SettingCommand) -> Result<()> {
    match command {
        SettingCommand::Get { key } => match app.store().get_setting(key) {
            Some(value) => println!("{}", value),
            None => bail!("No active profile. Run `budgetit profile use <id>` first."),
        },
        SettingCommand::Set { key, value } => match app.set_setting(key, &value)? {
            Outcome::Unchanged => println!("{} already {}", key, value),
            outcome => {
                require(outcome, "Setting")?;
                println!("{} set to {}", key, app.store().get_setting(key).unwrap_or(value));
            }
        },
    }
    Ok(())
}

fn run_stats(app: &BudgetApp<FileStorage>, month: YearMonth) -> Result<()> {
    require_active(app)?;

    let currency = currency(app);
    let expenses = app.store().expenses();
    let in_month = stats::expenses_in_month(expenses, month);
    let summary = stats::summarize(in_month.iter().copied());

    println!("{}", month);
    println!(
        "  Total: {:.2} {} over {} expenses (average {:.2})",
        summary.total, currency, summary.count, summary.average
    );
    match stats::month_over_month(expenses, month) {
        Some(change) => println!("  vs {}: {:+.1}%", month.previous(), change),
        None => println!("  vs {}: no spending", month.previous()),
    }

    for share in stats::category_breakdown(in_month.iter().copied()) {
        println!("  {:<16} {:>10.2} {}  {:>5.1}%", share.category, share.total, currency, share.percent);
    }

    let budgets = app.store().valid_budgets();
    if !budgets.is_empty() {
        let overall = stats::overall_budget(expenses, &budgets, month);
        println!(
            "  Budget: {:.2} of {:.2} {} used ({:.1}%), {:.2} left",
            overall.spent, overall.limit, currency, overall.percent, overall.remaining
        );
    }
    Ok(())
}
