//! # Legacy Migration
//!
//! Before profiles existed the app kept a single flat record:
//!
//! ```json
//! { "name": "Mario", "expenses": [...], "categories": [...], "budgets": {...}, "settings": {...} }
//! ```
//!
//! Some installs were also caught half way, with a `profiles` map already
//! written under the legacy key. Both shapes are turned into an [`AppData`]
//! here. Anything else produces the empty first-run state.
//!
//! This module also repairs records loaded from the current key
//! (see [`normalize`]), since both paths can carry data written by old builds.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use shared::{default_categories, lenient, AppData, Expense, Profile, Settings, FALLBACK_CATEGORY};
use std::collections::{BTreeMap, HashSet};

use super::ids::IdGenerator;

const DEFAULT_PROFILE_NAME: &str = "Default";

/// Fields of the legacy record, kept loose so malformed parts can be skipped
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    expenses: Option<Value>,
    #[serde(default = "default_categories", deserialize_with = "lenient::categories")]
    categories: Vec<String>,
    #[serde(default)]
    budgets: Option<Value>,
    #[serde(default)]
    settings: Option<Value>,
    #[serde(default)]
    profiles: Option<Value>,
    #[serde(default)]
    active_profile_id: Option<String>,
}

/// Which legacy shape was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationKind {
    /// Flat single-profile record turned into one profile
    SingleProfile { profile_id: String },
    /// Record that already had a profiles map
    AdoptedProfiles { count: usize },
    /// Neither shape; the result is the empty state
    Unrecognized,
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub data: AppData,
    pub kind: MigrationKind,
}

/// Turn a raw legacy record into the current format.
///
/// Fails only when the record is not a JSON object or its `profiles` entry is
/// not a map; the caller decides how to recover. Single profiles that cannot
/// be read are dropped with a warning.
pub fn migrate_legacy(
    raw: &str,
    ids: &mut IdGenerator,
    defaults: &Settings,
    now: DateTime<Utc>,
) -> Result<Migration> {
    let legacy: LegacyRecord =
        serde_json::from_str(raw).context("Legacy record is not a JSON object")?;
    let mut data = AppData::new(now);

    let kind = match legacy.expenses {
        Some(Value::Array(items)) => {
            let today = now.date_naive();
            let expenses: Vec<Expense> = items
                .iter()
                .map(|item| legacy_expense(item, today))
                .collect();
            for expense in &expenses {
                ids.observe(&expense.id);
            }

            let profile_id = ids.next_profile_id();
            let settings = match legacy.settings {
                Some(value) if !value.is_null() => {
                    serde_json::from_value(value).unwrap_or_else(|e| {
                        warn!("Ignoring malformed legacy settings: {}", e);
                        defaults.clone()
                    })
                }
                _ => defaults.clone(),
            };

            let profile = Profile {
                id: profile_id.clone(),
                name: legacy
                    .name
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| DEFAULT_PROFILE_NAME.to_string()),
                pin: None,
                created_at: now,
                expenses,
                categories: legacy.categories,
                budgets: legacy
                    .budgets
                    .as_ref()
                    .map(amount_map_from_value)
                    .unwrap_or_default(),
                settings,
            };

            info!(
                "Migrating legacy single-profile record into {} ({} expenses)",
                profile_id,
                profile.expenses.len()
            );
            data.profiles.insert(profile_id.clone(), profile);
            data.active_profile_id = Some(profile_id.clone());
            MigrationKind::SingleProfile { profile_id }
        }
        _ => match legacy.profiles {
            Some(profiles) if !profiles.is_null() => {
                let profiles: BTreeMap<String, Profile> =
                    lenient::profiles(profiles).context("Legacy profiles map is malformed")?;
                data.profiles = profiles;
                data.active_profile_id = legacy
                    .active_profile_id
                    .filter(|id| data.profiles.contains_key(id))
                    .or_else(|| data.profiles.keys().next().cloned());

                info!("Adopting {} profiles from legacy record", data.profiles.len());
                MigrationKind::AdoptedProfiles {
                    count: data.profiles.len(),
                }
            }
            _ => {
                warn!("Legacy record has neither expenses nor profiles, starting empty");
                MigrationKind::Unrecognized
            }
        },
    };

    normalize(&mut data, ids);
    Ok(Migration { data, kind })
}

/// Repair a loaded record in place and seed `ids` with every id it contains.
///
/// - profile ids follow their map key
/// - expenses without an id, or sharing one, get a fresh id
/// - an active id that names no profile is cleared
///
/// Returns how many repairs were made.
pub fn normalize(data: &mut AppData, ids: &mut IdGenerator) -> usize {
    for (key, profile) in &data.profiles {
        ids.observe(key);
        ids.observe(&profile.id);
        for expense in &profile.expenses {
            ids.observe(&expense.id);
        }
    }

    let mut repairs = 0;

    for (key, profile) in data.profiles.iter_mut() {
        if profile.id != *key {
            warn!("Profile stored under {} carried id {:?}, using the key", key, profile.id);
            profile.id = key.clone();
            repairs += 1;
        }

        let mut seen = HashSet::new();
        for expense in profile.expenses.iter_mut() {
            if expense.id.is_empty() || !seen.insert(expense.id.clone()) {
                expense.id = ids.next_expense_id();
                seen.insert(expense.id.clone());
                repairs += 1;
            }
        }
    }

    if let Some(active) = data.active_profile_id.as_deref() {
        if !data.profiles.contains_key(active) {
            warn!("Active profile {} does not exist, clearing it", active);
            data.active_profile_id = None;
            repairs += 1;
        }
    }

    repairs
}

fn legacy_expense(item: &Value, today: NaiveDate) -> Expense {
    let field = |name: &str| item.get(name).and_then(text);

    let date = match field("date") {
        Some(raw) => lenient::parse_date(&raw).unwrap_or_else(|| {
            warn!("Unreadable legacy expense date {:?}, using {}", raw, today);
            today
        }),
        None => today,
    };

    Expense {
        id: field("id").unwrap_or_default(),
        name: field("name").unwrap_or_default(),
        amount: item.get("amount").map(lenient::coerce_amount).unwrap_or(0.0),
        category: field("category")
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_CATEGORY.to_string()),
        date,
        notes: field("notes").filter(|n| !n.trim().is_empty()),
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn amount_map_from_value(value: &Value) -> BTreeMap<String, f64> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(category, amount)| (category.clone(), lenient::coerce_amount(amount)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::Theme;

    fn migrate(raw: &str) -> Result<Migration> {
        migrate_legacy(raw, &mut IdGenerator::new(), &Settings::default(), Utc::now())
    }

    #[test]
    fn test_single_profile_record() {
        let raw = json!({
            "name": "Mario",
            "expenses": [
                {"id": "exp_100", "name": "Pane", "amount": 2.5, "category": "X", "date": "2024-01-05"},
                {"id": "exp_101", "name": "Bus", "amount": "1.70", "category": "X", "date": "2024-01-06", "notes": ""}
            ],
            "categories": ["X"],
            "budgets": {"X": "80"},
            "settings": {"theme": "dark", "currency": "EUR"}
        })
        .to_string();

        let migration = migrate(&raw).unwrap();
        let data = migration.data;
        assert_eq!(data.profiles.len(), 1);

        let profile = data.active_profile().unwrap();
        assert!(matches!(migration.kind, MigrationKind::SingleProfile { ref profile_id } if *profile_id == profile.id));
        assert_eq!(profile.name, "Mario");
        assert_eq!(profile.pin, None);
        assert_eq!(profile.categories, vec!["X"]);
        assert_eq!(profile.expenses.len(), 2);
        assert_eq!(profile.expenses[1].amount, 1.7);
        assert_eq!(profile.expenses[1].notes, None);
        assert_eq!(profile.budgets.get("X"), Some(&80.0));
        assert_eq!(profile.settings.theme, Theme::Dark);
    }

    #[test]
    fn test_single_profile_defaults() {
        let migration = migrate(r#"{"expenses": []}"#).unwrap();
        let profile = migration.data.active_profile().unwrap();

        assert_eq!(profile.name, DEFAULT_PROFILE_NAME);
        assert_eq!(profile.categories, default_categories());
        assert!(profile.budgets.is_empty());
        assert_eq!(profile.settings, Settings::default());
    }

    #[test]
    fn test_legacy_expenses_get_ids_and_fallbacks() {
        let raw = json!({
            "expenses": [
                {"name": "Senza id", "amount": 3, "date": "not a date"},
                {"id": "exp_5", "name": "Doppio", "amount": 1, "category": "Casa", "date": "2024-02-01"},
                {"id": "exp_5", "name": "Doppio", "amount": 1, "category": "Casa", "date": "2024-02-01"}
            ]
        })
        .to_string();

        let now = Utc::now();
        let migration =
            migrate_legacy(&raw, &mut IdGenerator::new(), &Settings::default(), now).unwrap();
        let expenses = &migration.data.active_profile().unwrap().expenses;

        assert_eq!(expenses.len(), 3);
        assert!(!expenses[0].id.is_empty());
        assert_eq!(expenses[0].category, FALLBACK_CATEGORY);
        assert_eq!(expenses[0].date, now.date_naive());

        let unique: HashSet<_> = expenses.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_adopts_profiles_map() {
        let raw = json!({
            "activeProfileId": "profile_2",
            "profiles": {
                "profile_1": {"id": "profile_1", "name": "Anna", "createdAt": "2024-01-01T00:00:00Z"},
                "profile_2": {"id": "profile_2", "name": "Luca", "createdAt": "2024-01-02T00:00:00Z"}
            }
        })
        .to_string();

        let migration = migrate(&raw).unwrap();
        assert_eq!(migration.kind, MigrationKind::AdoptedProfiles { count: 2 });
        assert_eq!(migration.data.active_profile_id.as_deref(), Some("profile_2"));
        assert_eq!(
            migration.data.profiles["profile_1"].categories,
            default_categories()
        );
    }

    #[test]
    fn test_adopted_profiles_fall_back_to_first() {
        let raw = json!({
            "activeProfileId": "profile_gone",
            "profiles": {
                "profile_1": {"id": "profile_1", "name": "Anna"}
            }
        })
        .to_string();

        let migration = migrate(&raw).unwrap();
        assert_eq!(migration.data.active_profile_id.as_deref(), Some("profile_1"));
    }

    #[test]
    fn test_unrecognized_record_is_empty_state() {
        let migration = migrate(r#"{"something": "else"}"#).unwrap();
        assert_eq!(migration.kind, MigrationKind::Unrecognized);
        assert!(migration.data.profiles.is_empty());
        assert_eq!(migration.data.active_profile_id, None);
    }

    #[test]
    fn test_malformed_records_fail() {
        assert!(migrate("not json").is_err());
        assert!(migrate("[1, 2, 3]").is_err());
        assert!(migrate(r#"{"profiles": [1, 2]}"#).is_err());
    }

    #[test]
    fn test_adopted_profiles_keep_app_written_shapes() {
        let raw = json!({
            "activeProfileId": "profile_1",
            "profiles": {
                "profile_1": {
                    "id": "profile_1",
                    "name": "Anna",
                    "categories": ["Alimentari", {"name": "Regali", "emoji": "🎁"}],
                    "expenses": [
                        {"id": "exp_1", "name": "Fiori", "amount": "12", "category": null},
                        {"id": "exp_2", "name": "Pane", "amount": 2, "category": "Alimentari", "date": "2024-01-05"}
                    ],
                    "settings": null
                },
                "profile_broken": 42
            }
        })
        .to_string();

        let now = Utc::now();
        let migration =
            migrate_legacy(&raw, &mut IdGenerator::new(), &Settings::default(), now).unwrap();
        assert_eq!(migration.kind, MigrationKind::AdoptedProfiles { count: 1 });

        let profile = migration.data.active_profile().unwrap();
        assert_eq!(profile.categories, vec!["Alimentari", "🎁 Regali"]);
        assert_eq!(profile.expenses.len(), 2);
        assert_eq!(profile.expenses[0].category, FALLBACK_CATEGORY);
        assert_eq!(profile.expenses[0].amount, 12.0);
        assert_eq!(profile.settings, Settings::default());
    }

    #[test]
    fn test_single_profile_category_objects() {
        let migration = migrate(
            r#"{"expenses": [], "categories": ["Casa", {"name": "Viaggi", "emoji": "✈️"}, null]}"#,
        )
        .unwrap();
        let profile = migration.data.active_profile().unwrap();
        assert_eq!(profile.categories, vec!["Casa", "✈️ Viaggi"]);
    }

    #[test]
    fn test_normalize_repairs_loaded_data() {
        let mut data: AppData = serde_json::from_value(json!({
            "activeProfileId": "profile_missing",
            "profiles": {
                "profile_7": {
                    "name": "Anna",
                    "expenses": [
                        {"id": "exp_50", "name": "a", "amount": 1, "date": "2024-01-01"},
                        {"name": "b", "amount": 2, "date": "2024-01-02"}
                    ]
                }
            }
        }))
        .unwrap();

        let mut ids = IdGenerator::new();
        let repairs = normalize(&mut data, &mut ids);

        assert_eq!(repairs, 3);
        assert_eq!(data.active_profile_id, None);
        let profile = &data.profiles["profile_7"];
        assert_eq!(profile.id, "profile_7");
        assert_ne!(profile.expenses[1].id, "");
        assert_ne!(profile.expenses[1].id, "exp_50");
    }
}
