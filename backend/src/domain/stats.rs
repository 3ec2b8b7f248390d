//! Monthly statistics over a profile's expenses: totals, category shares,
//! month-over-month change and budget progress.
//!
//! Everything here is a pure function of the expense slice and budget map
//! handed in, so callers decide which profile and month to look at.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use shared::{Expense, FALLBACK_CATEGORY};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Budget usage at which a category is flagged
pub const WARNING_PERCENT: f64 = 80.0;

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// `None` when `month` is not 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| anyhow::anyhow!("Invalid month {:?}. Use YYYY-MM.", s))?;
        let year: i32 = year
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid year in {:?}", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid month in {:?}", s))?;

        YearMonth::new(year, month).ok_or_else(|| anyhow::anyhow!("Month must be between 1 and 12"))
    }
}

/// Totals for a set of expenses
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub total: f64,
    pub count: usize,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub total: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BudgetStatus {
    Ok,
    Warning,
    Exceeded,
}

impl BudgetStatus {
    /// Classify raw (uncapped) usage
    pub fn from_percent(percent: f64) -> Self {
        if percent >= 100.0 {
            BudgetStatus::Exceeded
        } else if percent >= WARNING_PERCENT {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Ok
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetProgress {
    pub category: String,
    pub limit: f64,
    pub spent: f64,
    /// Usage capped at 100
    pub percent: f64,
    pub status: BudgetStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverallBudget {
    pub limit: f64,
    pub spent: f64,
    pub remaining: f64,
    /// Capped at 100; `status` reflects the uncapped usage
    pub percent: f64,
    pub status: BudgetStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpenseSort {
    #[default]
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
}

impl FromStr for ExpenseSort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "date-desc" => Ok(ExpenseSort::DateDesc),
            "date-asc" => Ok(ExpenseSort::DateAsc),
            "amount-desc" => Ok(ExpenseSort::AmountDesc),
            "amount-asc" => Ok(ExpenseSort::AmountAsc),
            _ => Err(anyhow::anyhow!("Unknown sort order: {}", s)),
        }
    }
}

/// Filter and order for an expense listing
#[derive(Debug, Clone, Default)]
pub struct ExpenseQuery {
    pub month: Option<YearMonth>,
    pub category: Option<String>,
    pub sort: ExpenseSort,
}

impl ExpenseQuery {
    pub fn apply<'a>(&self, expenses: &'a [Expense]) -> Vec<&'a Expense> {
        let mut result: Vec<&Expense> = expenses
            .iter()
            .filter(|e| self.month.map_or(true, |m| m.contains(e.date)))
            .filter(|e| self.category.as_deref().map_or(true, |c| e.category == c))
            .collect();

        // Stable sorts keep insertion order among equal keys
        match self.sort {
            ExpenseSort::DateDesc => result.sort_by(|a, b| b.date.cmp(&a.date)),
            ExpenseSort::DateAsc => result.sort_by(|a, b| a.date.cmp(&b.date)),
            ExpenseSort::AmountDesc => result.sort_by(|a, b| b.amount.total_cmp(&a.amount)),
            ExpenseSort::AmountAsc => result.sort_by(|a, b| a.amount.total_cmp(&b.amount)),
        }
        result
    }
}

pub fn expenses_in_month(expenses: &[Expense], month: YearMonth) -> Vec<&Expense> {
    expenses.iter().filter(|e| month.contains(e.date)).collect()
}

pub fn summarize<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> Summary {
    let (total, count) = expenses
        .into_iter()
        .fold((0.0, 0), |(total, count), e| (total + e.amount, count + 1));

    Summary {
        total,
        count,
        average: if count == 0 { 0.0 } else { total / count as f64 },
    }
}

/// Per-category totals in order of first appearance.
/// Expenses with a blank category are counted under the fallback category.
pub fn category_breakdown<'a>(expenses: impl IntoIterator<Item = &'a Expense>) -> Vec<CategoryShare> {
    let mut shares: Vec<CategoryShare> = Vec::new();
    for expense in expenses {
        let category = match expense.category.trim() {
            "" => FALLBACK_CATEGORY,
            _ => expense.category.as_str(),
        };
        match shares.iter_mut().find(|s| s.category == category) {
            Some(share) => share.total += expense.amount,
            None => shares.push(CategoryShare {
                category: category.to_string(),
                total: expense.amount,
                percent: 0.0,
            }),
        }
    }

    let total: f64 = shares.iter().map(|s| s.total).sum();
    if total > 0.0 {
        for share in &mut shares {
            share.percent = share.total / total * 100.0;
        }
    }
    shares
}

/// Percent change of `month` against the month before.
/// `None` when nothing was spent the month before.
pub fn month_over_month(expenses: &[Expense], month: YearMonth) -> Option<f64> {
    let current = summarize(expenses_in_month(expenses, month)).total;
    let previous = summarize(expenses_in_month(expenses, month.previous())).total;

    if previous == 0.0 {
        None
    } else {
        Some((current - previous) / previous * 100.0)
    }
}

fn spent_in(expenses: &[Expense], month: YearMonth, category: &str) -> f64 {
    expenses
        .iter()
        .filter(|e| e.category == category && month.contains(e.date))
        .map(|e| e.amount)
        .sum()
}

fn usage_percent(spent: f64, limit: f64) -> f64 {
    if limit > 0.0 {
        spent / limit * 100.0
    } else {
        0.0
    }
}

/// Progress of every budget in `budgets` for `month`.
/// Pass the valid budgets so deleted categories are not reported.
pub fn budget_progress(
    expenses: &[Expense],
    budgets: &BTreeMap<String, f64>,
    month: YearMonth,
) -> Vec<BudgetProgress> {
    budgets
        .iter()
        .map(|(category, &limit)| {
            let spent = spent_in(expenses, month, category);
            let raw = usage_percent(spent, limit);
            BudgetProgress {
                category: category.clone(),
                limit,
                spent,
                percent: raw.min(100.0),
                status: BudgetStatus::from_percent(raw),
            }
        })
        .collect()
}

/// Everything spent in `month` against the sum of all budgets,
/// including categories that have no budget of their own.
pub fn overall_budget(
    expenses: &[Expense],
    budgets: &BTreeMap<String, f64>,
    month: YearMonth,
) -> OverallBudget {
    let limit: f64 = budgets.values().sum();
    let spent = summarize(expenses_in_month(expenses, month)).total;
    let raw = usage_percent(spent, limit);

    OverallBudget {
        limit,
        spent,
        remaining: (limit - spent).max(0.0),
        percent: raw.min(100.0),
        status: BudgetStatus::from_percent(raw),
    }
}
