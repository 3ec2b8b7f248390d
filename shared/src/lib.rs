//! Data model shared between the BudgetIT store and the components that consume it.
//!
//! Everything in here maps one to one onto the persisted JSON document:
//!
//! ```text
//! AppData
//! └── profiles: { "<id>": Profile }
//!     ├── expenses: [Expense]
//!     ├── categories: ["Alimentari", ...]
//!     ├── budgets: { "<category>": amount }
//!     └── settings: { theme, currency }
//! ```
//!
//! Field names are camelCase on the wire so records written by earlier
//! versions of the app load without conversion.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub mod lenient;

/// Version stamped into every persisted record
pub const APP_VERSION: &str = "2.0.0";

/// Category that expenses fall back to when their category is deleted
pub const FALLBACK_CATEGORY: &str = "Altro";

/// Categories every new profile starts with
pub const DEFAULT_CATEGORIES: [&str; 6] = [
    "Alimentari",
    "Trasporti",
    "Casa",
    "Svago",
    "Salute",
    FALLBACK_CATEGORY,
];

/// ISO 4217 code used when nothing else is configured
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Icon prefixed to user-created categories when none is given
pub const DEFAULT_CATEGORY_ICON: &str = "📦";

/// Calendar date format used for expense dates (YYYY-MM-DD)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

fn default_app_version() -> String {
    APP_VERSION.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn fallback_category() -> String {
    FALLBACK_CATEGORY.to_string()
}

/// The single persisted root record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    #[serde(default = "default_app_version")]
    pub app_version: String,
    /// Currently selected profile, `None` when nobody is logged in
    #[serde(default)]
    pub active_profile_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::profiles")]
    pub profiles: BTreeMap<String, Profile>,
    /// Updated on every save
    #[serde(default = "Utc::now", deserialize_with = "lenient::timestamp")]
    pub last_modified: DateTime<Utc>,
}

impl AppData {
    /// First-run state: no profiles and nobody active
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            app_version: default_app_version(),
            active_profile_id: None,
            profiles: BTreeMap::new(),
            last_modified: now,
        }
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        self.active_profile_id
            .as_deref()
            .and_then(|id| self.profiles.get(id))
    }

    pub fn active_profile_mut(&mut self) -> Option<&mut Profile> {
        match self.active_profile_id.as_deref() {
            Some(id) => self.profiles.get_mut(id),
            None => None,
        }
    }
}

/// A local user of the app with its own expenses, categories, budgets and settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    /// Obfuscated pin; `None` means the profile is not protected
    #[serde(default)]
    pub pin: Option<String>,
    #[serde(default = "Utc::now", deserialize_with = "lenient::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient::expenses")]
    pub expenses: Vec<Expense>,
    /// Display strings, `"icon name"` or just `"name"`
    #[serde(default = "default_categories", deserialize_with = "lenient::categories")]
    pub categories: Vec<String>,
    /// Monthly limit per category name
    #[serde(default, deserialize_with = "lenient::amount_map")]
    pub budgets: BTreeMap<String, f64>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub settings: Settings,
}

impl Profile {
    /// Build a fresh profile seeded with the default categories
    pub fn new(
        id: String,
        name: String,
        pin: Option<String>,
        created_at: DateTime<Utc>,
        settings: Settings,
    ) -> Self {
        Self {
            id,
            name,
            pin,
            created_at,
            expenses: Vec::new(),
            categories: default_categories(),
            budgets: BTreeMap::new(),
            settings,
        }
    }

    /// An empty stored pin counts as no pin
    pub fn has_pin(&self) -> bool {
        self.pin.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Whether a category with the same display name (icon ignored) exists
    pub fn has_category_named(&self, name: &str) -> bool {
        let wanted = category_display_name(name);
        self.categories
            .iter()
            .any(|c| category_display_name(c) == wanted)
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            has_pin: self.has_pin(),
            created_at: self.created_at,
            expense_count: self.expenses.len(),
            category_count: self.categories.len(),
        }
    }
}

/// Lightweight view of a profile for pickers and lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub id: String,
    pub name: String,
    pub has_pin: bool,
    pub created_at: DateTime<Utc>,
    pub expense_count: usize,
    pub category_count: usize,
}

/// A single recorded expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    /// Always positive for expenses created through the validation layer
    #[serde(default, deserialize_with = "lenient::amount")]
    pub amount: f64,
    /// Name of a category; may point at a category deleted later on
    #[serde(default = "fallback_category", deserialize_with = "lenient::category")]
    pub category: String,
    #[serde(default = "lenient::today", with = "lenient::date")]
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Expense {
    pub fn from_new(id: String, new: NewExpense) -> Self {
        Self {
            id,
            name: new.name,
            amount: new.amount,
            category: new.category,
            date: new.date,
            notes: new.notes,
        }
    }
}

/// Input for recording an expense; the store assigns the id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub name: String,
    pub amount: f64,
    pub category: String,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

/// Per-profile preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_currency", deserialize_with = "lenient::currency")]
    pub currency: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            currency: default_currency(),
        }
    }
}

/// Colour scheme preference
///
/// Unknown or missing stored values load as [`Theme::Auto`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    Auto,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Auto => "auto",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "auto" => Ok(Theme::Auto),
            _ => Err(format!("Invalid theme: {}", s)),
        }
    }
}

impl From<Option<String>> for Theme {
    fn from(value: Option<String>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store a category with its display icon, e.g. `"🍕 Pizza"`
pub fn encode_category(icon: Option<&str>, name: &str) -> String {
    match icon.map(str::trim).filter(|i| !i.is_empty()) {
        Some(icon) => format!("{} {}", icon, name.trim()),
        None => name.trim().to_string(),
    }
}

/// Split a stored category into its optional icon and display name.
///
/// The first word only counts as an icon when it is made of non-ASCII symbols,
/// so plain names such as `"Casa"`, `"Spesa casa"` or `"& Co"` are returned whole.
pub fn split_category(stored: &str) -> (Option<&str>, &str) {
    let stored = stored.trim();
    if let Some((first, rest)) = stored.split_once(char::is_whitespace) {
        let rest = rest.trim_start();
        if !rest.is_empty() && is_icon(first) {
            return (Some(first), rest);
        }
    }
    (None, stored)
}

fn is_icon(token: &str) -> bool {
    token
        .chars()
        .all(|c| !c.is_ascii() && !c.is_alphanumeric())
}

pub fn category_display_name(stored: &str) -> &str {
    split_category(stored).1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_category_with_icon() {
        assert_eq!(split_category("🍕 Pizza"), (Some("🍕"), "Pizza"));
        assert_eq!(split_category("📦 Spesa casa"), (Some("📦"), "Spesa casa"));
    }

    #[test]
    fn test_split_category_plain_names() {
        assert_eq!(split_category("Alimentari"), (None, "Alimentari"));
        assert_eq!(split_category("Spesa casa"), (None, "Spesa casa"));
        assert_eq!(split_category("🍕"), (None, "🍕"));
        assert_eq!(split_category("& Co"), (None, "& Co"));
        assert_eq!(split_category("- Varie"), (None, "- Varie"));
        assert_eq!(split_category("Ça va"), (None, "Ça va"));
    }

    #[test]
    fn test_encode_category() {
        assert_eq!(encode_category(Some("🍕"), " Pizza "), "🍕 Pizza");
        assert_eq!(encode_category(Some("  "), "Pizza"), "Pizza");
        assert_eq!(encode_category(None, "Pizza"), "Pizza");
    }

    #[test]
    fn test_has_category_named_ignores_icon() {
        let mut profile = Profile::new(
            "profile_1".to_string(),
            "Alice".to_string(),
            None,
            Utc::now(),
            Settings::default(),
        );
        profile.categories.push("📦 Regali".to_string());

        assert!(profile.has_category_named("Regali"));
        assert!(profile.has_category_named("🎁 Regali"));
        assert!(profile.has_category_named("Casa"));
        assert!(!profile.has_category_named("Viaggi"));

        profile.categories.push("& Co".to_string());
        assert!(profile.has_category_named("& Co"));
        assert!(!profile.has_category_named("Co"));
    }

    #[test]
    fn test_theme_parsing() {
        assert_eq!("dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!(" Light ".parse::<Theme>().unwrap(), Theme::Light);
        assert!("neon".parse::<Theme>().is_err());
        assert_eq!(Theme::from(Some("neon".to_string())), Theme::Auto);
        assert_eq!(Theme::from(None), Theme::Auto);
    }

    #[test]
    fn test_profile_wire_format() {
        let json = r#"{
            "id": "profile_1700000000000",
            "name": "Alice",
            "pin": null,
            "createdAt": "2024-01-15T10:30:00Z",
            "expenses": [
                {"id": "exp_1700000000001", "name": "Pane", "amount": 2.5,
                 "category": "Alimentari", "date": "2024-01-15"}
            ],
            "categories": ["Alimentari", "Altro"],
            "budgets": {"Alimentari": 200},
            "settings": {"theme": "dark", "currency": "EUR"}
        }"#;

        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.name, "Alice");
        assert!(!profile.has_pin());
        assert_eq!(profile.expenses.len(), 1);
        assert_eq!(profile.expenses[0].date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(profile.budgets.get("Alimentari"), Some(&200.0));
        assert_eq!(profile.settings.theme, Theme::Dark);

        let written = serde_json::to_value(&profile).unwrap();
        assert_eq!(written["createdAt"], "2024-01-15T10:30:00Z");
        assert_eq!(written["expenses"][0]["date"], "2024-01-15");
        assert!(written["expenses"][0].get("notes").is_none());
        assert_eq!(written["settings"]["theme"], "dark");
    }

    #[test]
    fn test_profile_with_category_objects() {
        let json = r#"{
            "id": "profile_1",
            "name": "Alice",
            "categories": ["Alimentari", "Altro", {"name": "Regali", "emoji": "🎁"}]
        }"#;

        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.categories, vec!["Alimentari", "Altro", "🎁 Regali"]);
        assert!(profile.has_category_named("Regali"));

        let written = serde_json::to_value(&profile).unwrap();
        assert_eq!(written["categories"][2], "🎁 Regali");
    }

    #[test]
    fn test_profile_with_null_fields_loads_defaults() {
        let json = r#"{
            "id": "profile_1",
            "name": null,
            "createdAt": null,
            "expenses": null,
            "categories": null,
            "budgets": null,
            "settings": null
        }"#;

        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.name, "");
        assert!(profile.expenses.is_empty());
        assert_eq!(profile.categories, default_categories());
        assert!(profile.budgets.is_empty());
        assert_eq!(profile.settings, Settings::default());

        let settings: Settings =
            serde_json::from_str(r#"{"theme": null, "currency": null}"#).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_expense_without_date_or_category() {
        let json = r#"[
            {"id": "exp_1", "name": "Pane", "amount": 2},
            {"id": "exp_2", "name": null, "amount": 3, "category": null, "date": null},
            {"id": "exp_3", "name": "Latte", "amount": 1, "category": "", "date": ""}
        ]"#;

        let before = lenient::today();
        let expenses: Vec<Expense> = serde_json::from_str(json).unwrap();
        let after = lenient::today();

        assert_eq!(expenses.len(), 3);
        for expense in &expenses {
            assert_eq!(expense.category, FALLBACK_CATEGORY);
            assert!(expense.date == before || expense.date == after);
        }
        assert_eq!(expenses[1].name, "");
    }

    #[test]
    fn test_unreadable_entries_are_dropped_not_the_profile() {
        let json = r#"{
            "profiles": {
                "profile_1": {
                    "id": "profile_1",
                    "name": "Alice",
                    "expenses": [
                        {"id": "exp_1", "name": "Pane", "amount": 2, "date": "2024-01-15"},
                        "not an expense"
                    ],
                    "categories": ["Casa", 7, {"emoji": "🎁"}]
                },
                "profile_2": 42
            }
        }"#;

        let data: AppData = serde_json::from_str(json).unwrap();
        assert_eq!(data.profiles.len(), 1);
        let profile = &data.profiles["profile_1"];
        assert_eq!(profile.expenses.len(), 1);
        assert_eq!(profile.categories, vec!["Casa"]);
    }

    #[test]
    fn test_app_data_serializes_null_active_profile() {
        let data = AppData::new(Utc::now());
        let written = serde_json::to_value(&data).unwrap();
        assert!(written["activeProfileId"].is_null());
        assert_eq!(written["appVersion"], APP_VERSION);
        assert!(written["profiles"].as_object().unwrap().is_empty());
    }
}
