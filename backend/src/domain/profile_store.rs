//! # Profile Store
//!
//! Single source of truth for everything BudgetIT persists: profiles and their
//! expenses, categories, budgets and settings.
//!
//! ## Contract
//!
//! - The whole [`AppData`] record is written to storage before any mutation
//!   returns `Outcome::Applied`. There is no write queue or batching.
//! - If that write fails the in-memory state is rolled back and the error is
//!   returned, so memory and storage never disagree.
//! - Reads never write. The exceptions happen while loading: a migrated
//!   legacy record is persisted straight away, and a corrupt record is
//!   copied aside before anything can overwrite it.
//! - Unknown ids, a missing active profile and duplicate categories are not
//!   errors; they come back as [`Outcome`] variants.
//! - Input validation (non-empty names, positive amounts, no future dates)
//!   is the caller's job, see `validation`.
//!
//! ## Loading
//!
//! 1. Parse the record under the storage key.
//! 2. If it is corrupt, copy it to `<storage key>.corrupt`.
//! 3. If it is missing or corrupt, migrate the record under the legacy key,
//!    persist the result and drop the legacy key.
//! 4. If that is missing or fails too, start from the empty state.

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, error, info, warn};
use shared::{
    encode_category, AppData, Expense, NewExpense, Profile, ProfileSummary, Settings, Theme,
    FALLBACK_CATEGORY,
};
use std::collections::BTreeMap;

use super::ids::IdGenerator;
use super::migration::{self, MigrationKind};
use super::outcome::Outcome;
use super::pin;
use super::settings::{SettingError, SettingKey};
use crate::storage::KeyValueStorage;

/// Key of the current record
pub const STORAGE_KEY: &str = "budgetit_v2";

/// Key of the pre-profiles record
pub const LEGACY_KEY: &str = "budgetit_data";

/// Where an unreadable record under `storage_key` is kept
pub fn corrupt_backup_key(storage_key: &str) -> String {
    format!("{}.corrupt", storage_key)
}

static EMPTY_BUDGETS: BTreeMap<String, f64> = BTreeMap::new();

/// Where the store keeps its records and what new profiles start with
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    pub storage_key: String,
    pub legacy_key: String,
    pub profile_defaults: Settings,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            legacy_key: LEGACY_KEY.to_string(),
            profile_defaults: Settings::default(),
        }
    }
}

/// How the store obtained its state when it was opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Parsed from the storage key
    Stored,
    /// Migrated from the legacy key
    Migrated(MigrationKind),
    /// Nothing usable was stored
    Fresh,
}

/// What deleting a category touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRemoval {
    /// Expenses moved to the fallback category
    pub reassigned_expenses: usize,
    /// Whether a budget entry for the category was dropped
    pub budget_removed: bool,
}

/// The store. Owns its storage and the in-memory copy of the record.
pub struct ProfileStore<S: KeyValueStorage> {
    storage: S,
    options: StoreOptions,
    data: AppData,
    ids: IdGenerator,
    source: LoadSource,
}

impl<S: KeyValueStorage> ProfileStore<S> {
    /// Open a store with the default keys and profile defaults
    pub fn open(storage: S) -> Result<Self> {
        Self::open_with(storage, StoreOptions::default())
    }

    /// Open a store, loading or migrating whatever `storage` holds.
    ///
    /// Corrupt or unrecognised records never fail this call; only errors
    /// reading from storage itself are returned.
    pub fn open_with(mut storage: S, options: StoreOptions) -> Result<Self> {
        let mut ids = IdGenerator::new();
        let (data, source) = Self::load(&mut storage, &options, &mut ids)?;

        info!(
            "Opened profile store: {} profiles, active: {:?}, source: {:?}",
            data.profiles.len(),
            data.active_profile_id,
            source
        );

        Ok(Self {
            storage,
            options,
            data,
            ids,
            source,
        })
    }

    fn load(
        storage: &mut S,
        options: &StoreOptions,
        ids: &mut IdGenerator,
    ) -> Result<(AppData, LoadSource)> {
        let stored = storage
            .get(&options.storage_key)
            .with_context(|| format!("Failed to read {}", options.storage_key))?;

        match stored {
            Some(raw) => match serde_json::from_str::<AppData>(&raw) {
                Ok(mut data) => {
                    let repairs = migration::normalize(&mut data, ids);
                    if repairs > 0 {
                        warn!("Repaired {} inconsistencies in stored record", repairs);
                    }
                    return Ok((data, LoadSource::Stored));
                }
                Err(e) => {
                    warn!(
                        "Stored record under {} is corrupt ({}), trying legacy record",
                        options.storage_key, e
                    );
                    let backup = corrupt_backup_key(&options.storage_key);
                    match storage.set(&backup, &raw) {
                        Ok(()) => info!("Kept corrupt record as {}", backup),
                        Err(e) => error!("Could not keep corrupt record as {}: {:#}", backup, e),
                    }
                }
            },
            None => debug!("No record under {}", options.storage_key),
        }

        let legacy = storage
            .get(&options.legacy_key)
            .with_context(|| format!("Failed to read {}", options.legacy_key))?;

        let Some(raw) = legacy else {
            debug!("No legacy record, starting fresh");
            return Ok((AppData::new(Utc::now()), LoadSource::Fresh));
        };

        let now = Utc::now();
        let migration =
            match migration::migrate_legacy(&raw, ids, &options.profile_defaults, now) {
                Ok(migration) => migration,
                Err(e) => {
                    error!("Migration failed: {:#}", e);
                    return Ok((AppData::new(now), LoadSource::Fresh));
                }
            };

        let mut data = migration.data;
        data.last_modified = now;

        // Persist immediately; the legacy key only goes once the new record is safe
        let persisted = serde_json::to_string(&data)
            .context("Failed to serialize migrated record")
            .and_then(|json| storage.set(&options.storage_key, &json));

        match persisted {
            Ok(()) => {
                info!("Migrated legacy record to {}", options.storage_key);
                if let Err(e) = storage.remove(&options.legacy_key) {
                    warn!("Could not remove legacy record {}: {:#}", options.legacy_key, e);
                }
            }
            Err(e) => {
                error!(
                    "Failed to persist migrated record, legacy record kept for next start: {:#}",
                    e
                );
            }
        }

        Ok((data, LoadSource::Migrated(migration.kind)))
    }

    /// Write the whole record, stamping `last_modified`
    fn persist(&mut self) -> Result<()> {
        self.data.last_modified = Utc::now();
        let json = serde_json::to_string(&self.data).context("Failed to serialize app data")?;
        self.storage
            .set(&self.options.storage_key, &json)
            .with_context(|| format!("Failed to persist {}", self.options.storage_key))
    }

    /// Apply a mutation and persist it when it reports `Applied`.
    /// On a failed write the previous state is restored.
    fn commit<T>(
        &mut self,
        mutation: impl FnOnce(&mut AppData, &mut IdGenerator) -> Outcome<T>,
    ) -> Result<Outcome<T>> {
        let snapshot = self.data.clone();
        let outcome = mutation(&mut self.data, &mut self.ids);

        if outcome.is_applied() {
            if let Err(e) = self.persist() {
                error!("Rolling back mutation after failed write: {:#}", e);
                self.data = snapshot;
                return Err(e);
            }
        }

        Ok(outcome)
    }

    /// Like [`commit`](Self::commit), scoped to the active profile
    fn commit_active<T>(
        &mut self,
        mutation: impl FnOnce(&mut Profile, &mut IdGenerator) -> Outcome<T>,
    ) -> Result<Outcome<T>> {
        self.commit(|data, ids| match data.active_profile_mut() {
            Some(profile) => mutation(profile, ids),
            None => Outcome::NoActiveProfile,
        })
    }

    // ---------------------------------------------------------------------
    // Record access
    // ---------------------------------------------------------------------

    /// Read-only view of the whole record
    pub fn data(&self) -> &AppData {
        &self.data
    }

    pub fn load_source(&self) -> &LoadSource {
        &self.source
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Give the storage back, e.g. to reopen a store on it
    pub fn into_storage(self) -> S {
        self.storage
    }

    // ---------------------------------------------------------------------
    // Profiles
    // ---------------------------------------------------------------------

    /// All profiles, oldest first
    pub fn profiles(&self) -> Vec<ProfileSummary> {
        let mut profiles: Vec<&Profile> = self.data.profiles.values().collect();
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        profiles.into_iter().map(Profile::summary).collect()
    }

    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.data.profiles.get(id)
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        self.data.active_profile()
    }

    pub fn active_profile_id(&self) -> Option<&str> {
        self.data.active_profile_id.as_deref()
    }

    /// Make `id` the active profile. Unknown ids leave the selection untouched.
    pub fn set_active_profile(&mut self, id: &str) -> Result<Outcome> {
        let outcome = self.commit(|data, _| {
            if !data.profiles.contains_key(id) {
                return Outcome::NotFound;
            }
            data.active_profile_id = Some(id.to_string());
            Outcome::Applied(())
        })?;

        match &outcome {
            Outcome::Applied(()) => info!("Active profile set to {}", id),
            _ => warn!("Cannot activate unknown profile {}", id),
        }
        Ok(outcome)
    }

    pub fn clear_active_profile(&mut self) -> Result<Outcome> {
        let outcome = self.commit(|data, _| {
            data.active_profile_id = None;
            Outcome::Applied(())
        })?;
        info!("Active profile cleared");
        Ok(outcome)
    }

    /// Create a profile with the default categories and settings and make it
    /// active. An empty pin means no pin. Returns the new profile id.
    pub fn create_profile(&mut self, name: &str, pin: Option<&str>) -> Result<String> {
        let defaults = self.options.profile_defaults.clone();
        let outcome = self.commit(|data, ids| {
            let id = ids.next_profile_id();
            let encoded = pin.filter(|p| !p.is_empty()).map(pin::obfuscate);
            let profile = Profile::new(id.clone(), name.to_string(), encoded, Utc::now(), defaults);

            data.profiles.insert(id.clone(), profile);
            data.active_profile_id = Some(id.clone());
            Outcome::Applied(id)
        })?;

        let id = outcome
            .applied()
            .ok_or_else(|| anyhow::anyhow!("Profile creation did not apply"))?;
        info!("Created profile {} ({})", name, id);
        Ok(id)
    }

    /// True when the profile has no pin or `candidate` matches it.
    /// Unknown profiles never verify.
    pub fn verify_pin(&self, id: &str, candidate: &str) -> bool {
        match self.profile(id) {
            Some(profile) => {
                let verified = pin::matches(profile.pin.as_deref(), candidate);
                debug!(
                    "Pin check for {} (candidate length {}): {}",
                    id,
                    candidate.len(),
                    verified
                );
                verified
            }
            None => {
                warn!("Pin check for unknown profile {}", id);
                false
            }
        }
    }

    pub fn rename_profile(&mut self, id: &str, name: &str) -> Result<Outcome> {
        let outcome = self.commit(|data, _| match data.profiles.get_mut(id) {
            Some(profile) if profile.name == name => Outcome::Unchanged,
            Some(profile) => {
                profile.name = name.to_string();
                Outcome::Applied(())
            }
            None => Outcome::NotFound,
        })?;

        if outcome.is_applied() {
            info!("Renamed profile {} to {}", id, name);
        }
        Ok(outcome)
    }

    // ---------------------------------------------------------------------
    // Expenses
    // ---------------------------------------------------------------------

    /// Expenses of the active profile in insertion order
    pub fn expenses(&self) -> &[Expense] {
        self.active_profile()
            .map(|p| p.expenses.as_slice())
            .unwrap_or(&[])
    }

    /// Append an expense to the active profile; returns its new id
    pub fn add_expense(&mut self, expense: NewExpense) -> Result<Outcome<String>> {
        let outcome = self.commit_active(|profile, ids| {
            let id = ids.next_expense_id();
            profile.expenses.push(Expense::from_new(id.clone(), expense));
            Outcome::Applied(id)
        })?;

        if let Outcome::Applied(id) = &outcome {
            info!("Added expense {}", id);
        }
        Ok(outcome)
    }

    pub fn delete_expense(&mut self, id: &str) -> Result<Outcome> {
        let outcome = self.commit_active(|profile, _| {
            let before = profile.expenses.len();
            profile.expenses.retain(|e| e.id != id);
            if profile.expenses.len() == before {
                Outcome::NotFound
            } else {
                Outcome::Applied(())
            }
        })?;

        debug!("Delete expense {}: {}", id, outcome.describe());
        Ok(outcome)
    }

    // ---------------------------------------------------------------------
    // Budgets
    // ---------------------------------------------------------------------

    /// Budget map of the active profile, including stale entries
    pub fn budgets(&self) -> &BTreeMap<String, f64> {
        self.active_profile()
            .map(|p| &p.budgets)
            .unwrap_or(&EMPTY_BUDGETS)
    }

    /// Budgets whose category still exists
    pub fn valid_budgets(&self) -> BTreeMap<String, f64> {
        let categories = self.categories();
        self.budgets()
            .iter()
            .filter(|(category, _)| categories.contains(*category))
            .map(|(category, amount)| (category.clone(), *amount))
            .collect()
    }

    /// Set the monthly limit for `category`; the last write wins.
    /// Non-finite amounts are stored as 0.
    pub fn set_budget(&mut self, category: &str, amount: f64) -> Result<Outcome> {
        let amount = if amount.is_finite() { amount } else { 0.0 };
        let outcome = self.commit_active(|profile, _| {
            profile.budgets.insert(category.to_string(), amount);
            Outcome::Applied(())
        })?;

        if outcome.is_applied() {
            info!("Budget for {} set to {}", category, amount);
        }
        Ok(outcome)
    }

    // ---------------------------------------------------------------------
    // Categories
    // ---------------------------------------------------------------------

    pub fn categories(&self) -> &[String] {
        self.active_profile()
            .map(|p| p.categories.as_slice())
            .unwrap_or(&[])
    }

    /// Append a category, optionally with a display icon stored as
    /// `"<icon> <name>"`. A category with the same display name already
    /// present leaves the list untouched.
    pub fn add_category(&mut self, name: &str, icon: Option<&str>) -> Result<Outcome> {
        let stored = encode_category(icon, name);
        let outcome = self.commit_active(|profile, _| {
            if stored.is_empty() || profile.has_category_named(&stored) {
                return Outcome::Unchanged;
            }
            profile.categories.push(stored.clone());
            Outcome::Applied(())
        })?;

        debug!("Add category {}: {}", stored, outcome.describe());
        Ok(outcome)
    }

    /// Delete a category: its expenses move to the fallback category (which
    /// is re-created if missing) and its budget entry is dropped.
    ///
    /// The fallback category itself cannot be deleted. A name that is not in
    /// the list still has stale expense and budget references cleaned up.
    pub fn remove_category(&mut self, name: &str) -> Result<Outcome<CategoryRemoval>> {
        if name == FALLBACK_CATEGORY {
            warn!("Refusing to delete the fallback category {}", FALLBACK_CATEGORY);
            return Ok(self
                .active_profile()
                .map(|_| Outcome::Unchanged)
                .unwrap_or(Outcome::NoActiveProfile));
        }

        let outcome = self.commit_active(|profile, _| {
            let listed = profile.categories.iter().any(|c| c == name);
            let reassigned = profile
                .expenses
                .iter()
                .filter(|e| e.category == name)
                .count();
            let has_budget = profile.budgets.contains_key(name);

            if !listed && reassigned == 0 && !has_budget {
                return Outcome::NotFound;
            }

            if !profile.categories.iter().any(|c| c == FALLBACK_CATEGORY) {
                profile.categories.push(FALLBACK_CATEGORY.to_string());
            }
            for expense in profile.expenses.iter_mut().filter(|e| e.category == name) {
                expense.category = FALLBACK_CATEGORY.to_string();
            }
            let budget_removed = profile.budgets.remove(name).is_some();
            profile.categories.retain(|c| c != name);

            Outcome::Applied(CategoryRemoval {
                reassigned_expenses: reassigned,
                budget_removed,
            })
        })?;

        if let Outcome::Applied(removal) = &outcome {
            info!(
                "Removed category {}: {} expenses moved to {}, budget removed: {}",
                name, removal.reassigned_expenses, FALLBACK_CATEGORY, removal.budget_removed
            );
        }
        Ok(outcome)
    }

    // ---------------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------------

    pub fn settings(&self) -> Option<&Settings> {
        self.active_profile().map(|p| &p.settings)
    }

    pub fn get_setting(&self, key: SettingKey) -> Option<String> {
        self.settings().map(|settings| key.read(settings))
    }

    /// Update one setting of the active profile.
    /// Invalid values are rejected before anything changes.
    pub fn set_setting(&mut self, key: SettingKey, value: &str) -> Result<Outcome> {
        let mut result: Result<(), SettingError> = Ok(());
        let outcome = self.commit_active(|profile, _| match key.write(&mut profile.settings, value) {
            Ok(true) => Outcome::Applied(()),
            Ok(false) => Outcome::Unchanged,
            Err(e) => {
                result = Err(e);
                Outcome::Unchanged
            }
        })?;

        result?;
        if outcome.is_applied() {
            info!("Setting {} changed to {}", key, value);
        }
        Ok(outcome)
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<Outcome> {
        self.set_setting(SettingKey::Theme, theme.as_str())
    }
}
