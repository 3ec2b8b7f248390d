//! Forgiving deserializers for records written by older app versions.
//!
//! Older builds stored whatever the form fields produced, so amounts can show
//! up as strings, dates as full timestamps or not at all, and categories as
//! `{ "name", "emoji" }` objects. A single odd field never rejects the record:
//! it falls back to a default and the rest of the profile loads.

use chrono::{DateTime, Local, NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::{
    default_categories, encode_category, Expense, Profile, DATE_FORMAT, DEFAULT_CURRENCY,
    FALLBACK_CATEGORY,
};

/// Coerce a JSON value into an amount the way the UI always did:
/// numbers pass through, numeric strings are parsed, anything else is 0.
pub fn coerce_amount(value: &Value) -> f64 {
    let amount = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };

    if amount.is_finite() {
        amount
    } else {
        0.0
    }
}

pub fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(coerce_amount).unwrap_or(0.0))
}

pub fn amount_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(category, value)| (category, coerce_amount(&value)))
        .collect())
}

/// Parse `YYYY-MM-DD`, falling back to the date part of an RFC 3339 timestamp
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(date);
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }

    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok())
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Serde adapter: writes `YYYY-MM-DD`, reads anything [`parse_date`] accepts.
///
/// Missing, null or unreadable dates load as today.
pub mod date {
    use super::*;

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&date.format(DATE_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        let parsed = match &value {
            Some(Value::String(raw)) => parse_date(raw),
            _ => None,
        };

        Ok(parsed.unwrap_or_else(|| {
            let fallback = today();
            warn!("Unreadable expense date {:?}, using {}", value, fallback);
            fallback
        }))
    }
}

/// Strings pass through, numbers are written out, anything else is empty
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn non_empty_or(value: Option<Value>, fallback: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        _ => fallback.to_string(),
    }
}

/// Expense category; null or blank means the fallback category
pub fn category<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(non_empty_or(value, FALLBACK_CATEGORY))
}

pub fn currency<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(non_empty_or(value, DEFAULT_CURRENCY))
}

/// Null reads as the type's default
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// RFC 3339 strings or epoch milliseconds; anything else is now
pub fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match &value {
        Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Some(Value::Number(n)) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    };
    Ok(parsed.unwrap_or_else(Utc::now))
}

/// Turn one stored category entry into its `"icon name"` form
pub fn category_entry(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(fields) => {
            let name = fields
                .get("name")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|n| !n.is_empty())?;
            let icon = fields
                .get("emoji")
                .or_else(|| fields.get("icon"))
                .and_then(Value::as_str);
            Some(encode_category(icon, name))
        }
        _ => None,
    }
}

/// Category list that accepts plain strings and `{ "name", "emoji" }` objects.
///
/// Null means the default categories; entries that are neither are dropped.
pub fn categories<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(items) = Option::<Vec<Value>>::deserialize(deserializer)? else {
        return Ok(default_categories());
    };

    let mut categories = Vec::with_capacity(items.len());
    for item in &items {
        match category_entry(item) {
            Some(category) if !categories.contains(&category) => categories.push(category),
            Some(_) => {}
            None => warn!("Dropping unreadable category {}", item),
        }
    }
    Ok(categories)
}

/// Expense list where an entry that cannot be read is dropped instead of the profile
pub fn expenses<'de, D>(deserializer: D) -> Result<Vec<Expense>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Expense>(item) {
            Ok(expense) => Some(expense),
            Err(e) => {
                warn!("Dropping unreadable expense: {}", e);
                None
            }
        })
        .collect())
}

/// Profile map where a profile that cannot be read is dropped instead of the record
pub fn profiles<'de, D>(deserializer: D) -> Result<BTreeMap<String, Profile>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_value::<Profile>(value) {
            Ok(profile) => Some((key, profile)),
            Err(e) => {
                warn!("Dropping unreadable profile {}: {}", key, e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Expense;
    use serde_json::json;

    #[test]
    fn test_coerce_amount() {
        assert_eq!(coerce_amount(&json!(12.5)), 12.5);
        assert_eq!(coerce_amount(&json!("12.50")), 12.5);
        assert_eq!(coerce_amount(&json!(" 7 ")), 7.0);
        assert_eq!(coerce_amount(&json!("abc")), 0.0);
        assert_eq!(coerce_amount(&json!(null)), 0.0);
        assert_eq!(coerce_amount(&json!("inf")), 0.0);
        assert_eq!(coerce_amount(&json!(true)), 1.0);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date("2024-03-09"), Some(expected));
        assert_eq!(parse_date("2024-03-09T08:15:00Z"), Some(expected));
        assert_eq!(parse_date("2024-03-09T08:15:00.000"), Some(expected));
        assert_eq!(parse_date("09/03/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_legacy_expense_with_string_amount() {
        let expense: Expense = serde_json::from_value(json!({
            "id": "exp_1",
            "name": "Cinema",
            "amount": "9.90",
            "date": "2023-11-02T20:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(expense.amount, 9.9);
        assert_eq!(expense.category, crate::FALLBACK_CATEGORY);
        assert_eq!(expense.date, NaiveDate::from_ymd_opt(2023, 11, 2).unwrap());
        assert_eq!(expense.notes, None);
    }

    #[test]
    fn test_budget_map_coercion() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(default, deserialize_with = "amount_map")]
            budgets: BTreeMap<String, f64>,
        }

        let holder: Holder =
            serde_json::from_value(json!({"budgets": {"Casa": "300", "Svago": 50}})).unwrap();
        assert_eq!(holder.budgets.get("Casa"), Some(&300.0));
        assert_eq!(holder.budgets.get("Svago"), Some(&50.0));

        let holder: Holder = serde_json::from_value(json!({"budgets": null})).unwrap();
        assert!(holder.budgets.is_empty());
    }
}
