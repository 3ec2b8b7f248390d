//! Input checks run by adapters before calling the store.
//!
//! The store accepts whatever it is given; these functions turn raw user
//! input into the values it expects, or say what is wrong with it.

use chrono::NaiveDate;
use shared::{encode_category, NewExpense, Profile, DATE_FORMAT, DEFAULT_CATEGORY_ICON};

pub const MAX_NAME_LENGTH: usize = 100;
pub const MIN_PIN_LENGTH: usize = 4;
pub const MAX_PIN_LENGTH: usize = 8;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Name cannot exceed 100 characters")]
    NameTooLong,
    #[error("Amount is not a number: {0:?}")]
    InvalidAmount(String),
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,
    #[error("Invalid date {0:?}. Use YYYY-MM-DD.")]
    InvalidDate(String),
    #[error("Date {0} is in the future")]
    FutureDate(NaiveDate),
    #[error("Select a category")]
    MissingCategory,
    #[error("Category name cannot be empty")]
    EmptyCategoryName,
    #[error("Category {0:?} already exists")]
    DuplicateCategory(String),
    #[error("Pin must be 4 to 8 digits")]
    InvalidPin,
}

/// Raw expense form fields as typed by the user
#[derive(Debug, Clone, Default)]
pub struct ExpenseInput {
    pub name: String,
    pub amount: String,
    pub category: String,
    pub date: String,
    pub notes: String,
}

/// Trimmed profile name
pub fn validate_profile_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong);
    }
    Ok(name.to_string())
}

/// A blank pin means the profile is unprotected
pub fn validate_pin(pin: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(pin) = pin.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(None);
    };

    let valid_length = (MIN_PIN_LENGTH..=MAX_PIN_LENGTH).contains(&pin.len());
    if !valid_length || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidPin);
    }
    Ok(Some(pin.to_string()))
}

/// Parse a user-entered amount. A decimal comma is accepted.
pub fn parse_amount(raw: &str) -> Result<f64, ValidationError> {
    let cleaned = raw.trim().replace(',', ".");
    let amount: f64 = cleaned
        .parse()
        .map_err(|_| ValidationError::InvalidAmount(raw.to_string()))?;

    if !amount.is_finite() {
        return Err(ValidationError::InvalidAmount(raw.to_string()));
    }
    if amount <= 0.0 {
        return Err(ValidationError::NonPositiveAmount);
    }
    Ok(amount)
}

pub fn validate_budget_amount(amount: f64) -> Result<f64, ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::InvalidAmount(amount.to_string()));
    }
    if amount <= 0.0 {
        return Err(ValidationError::NonPositiveAmount);
    }
    Ok(amount)
}

/// Parse a `YYYY-MM-DD` date that is not after `today`
pub fn validate_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let date = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))?;

    if date > today {
        return Err(ValidationError::FutureDate(date));
    }
    Ok(date)
}

pub fn validate_expense(input: &ExpenseInput, today: NaiveDate) -> Result<NewExpense, ValidationError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let amount = parse_amount(&input.amount)?;
    let date = validate_date(&input.date, today)?;

    let category = input.category.trim();
    if category.is_empty() {
        return Err(ValidationError::MissingCategory);
    }

    let notes = input.notes.trim();

    Ok(NewExpense {
        name: name.to_string(),
        amount,
        category: category.to_string(),
        date,
        notes: (!notes.is_empty()).then(|| notes.to_string()),
    })
}

/// Check a new category against the profile's list.
/// Returns the trimmed name and the icon to store with it.
pub fn validate_new_category(
    profile: &Profile,
    name: &str,
    icon: Option<&str>,
) -> Result<(String, String), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyCategoryName);
    }

    let icon = icon
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .unwrap_or(DEFAULT_CATEGORY_ICON);

    if profile.has_category_named(&encode_category(Some(icon), name)) {
        return Err(ValidationError::DuplicateCategory(name.to_string()));
    }
    Ok((name.to_string(), icon.to_string()))
}
