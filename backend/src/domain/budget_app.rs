//! Composition root tying the profile store to the change notifier.
//!
//! Adapters talk to [`BudgetApp`] rather than the store so every applied
//! mutation is followed by the matching [`StateEvent`]. Reads go straight
//! through [`BudgetApp::store`].

use anyhow::Result;
use log::{info, warn};
use shared::{NewExpense, Theme};

use super::notifier::{StateEvent, StateNotifier, SubscriptionId};
use super::outcome::Outcome;
use super::profile_store::{CategoryRemoval, ProfileStore};
use super::settings::SettingKey;
use crate::storage::KeyValueStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginResult {
    Granted,
    WrongPin,
    UnknownProfile,
}

pub struct BudgetApp<S: KeyValueStorage> {
    store: ProfileStore<S>,
    notifier: StateNotifier,
}

impl<S: KeyValueStorage> BudgetApp<S> {
    pub fn new(store: ProfileStore<S>) -> Self {
        Self {
            store,
            notifier: StateNotifier::new(),
        }
    }

    pub fn store(&self) -> &ProfileStore<S> {
        &self.store
    }

    pub fn into_store(self) -> ProfileStore<S> {
        self.store
    }

    pub fn subscribe(&mut self, listener: impl Fn(&StateEvent) + 'static) -> SubscriptionId {
        self.notifier.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    fn emit_if_applied<T>(&self, outcome: &Outcome<T>, event: impl FnOnce() -> StateEvent) {
        if outcome.is_applied() {
            self.notifier.emit(event());
        }
    }

    /// Switch profiles. Listeners first drop their cached state, then learn
    /// which profile is now active.
    pub fn change_active_profile(&mut self, profile_id: &str) -> Result<Outcome> {
        let outcome = self.store.set_active_profile(profile_id)?;
        if outcome.is_applied() {
            self.announce_profile(profile_id);
        }
        Ok(outcome)
    }

    fn announce_profile(&self, profile_id: &str) {
        self.notifier.emit(StateEvent::StateReset);
        self.notifier.emit(StateEvent::ProfileChanged {
            profile_id: profile_id.to_string(),
        });
    }

    /// Verify the pin and switch to the profile on success.
    /// A wrong pin leaves the active profile alone.
    pub fn login(&mut self, profile_id: &str, pin: &str) -> Result<LoginResult> {
        if self.store.profile(profile_id).is_none() {
            warn!("Login attempt for unknown profile {}", profile_id);
            return Ok(LoginResult::UnknownProfile);
        }

        if !self.store.verify_pin(profile_id, pin) {
            warn!("Wrong pin for profile {}", profile_id);
            return Ok(LoginResult::WrongPin);
        }

        let outcome = self.change_active_profile(profile_id)?;
        if !outcome.is_applied() {
            return Ok(LoginResult::UnknownProfile);
        }

        info!("Logged in to profile {}", profile_id);
        Ok(LoginResult::Granted)
    }

    pub fn logout(&mut self) -> Result<Outcome> {
        let outcome = self.store.clear_active_profile()?;
        self.emit_if_applied(&outcome, || StateEvent::StateReset);
        Ok(outcome)
    }

    /// Create a profile and switch to it
    pub fn create_profile(&mut self, name: &str, pin: Option<&str>) -> Result<String> {
        let id = self.store.create_profile(name, pin)?;
        self.announce_profile(&id);
        Ok(id)
    }

    pub fn rename_profile(&mut self, profile_id: &str, name: &str) -> Result<Outcome> {
        let outcome = self.store.rename_profile(profile_id, name)?;
        self.emit_if_applied(&outcome, || StateEvent::ProfileRenamed {
            profile_id: profile_id.to_string(),
            name: name.to_string(),
        });
        Ok(outcome)
    }

    pub fn add_expense(&mut self, expense: NewExpense) -> Result<Outcome<String>> {
        let outcome = self.store.add_expense(expense)?;
        self.emit_if_applied(&outcome, || StateEvent::ExpensesChanged);
        Ok(outcome)
    }

    pub fn delete_expense(&mut self, expense_id: &str) -> Result<Outcome> {
        let outcome = self.store.delete_expense(expense_id)?;
        self.emit_if_applied(&outcome, || StateEvent::ExpensesChanged);
        Ok(outcome)
    }

    pub fn set_budget(&mut self, category: &str, amount: f64) -> Result<Outcome> {
        let outcome = self.store.set_budget(category, amount)?;
        self.emit_if_applied(&outcome, || StateEvent::BudgetUpdated {
            category: category.to_string(),
        });
        Ok(outcome)
    }

    pub fn add_category(&mut self, name: &str, icon: Option<&str>) -> Result<Outcome> {
        let outcome = self.store.add_category(name, icon)?;
        self.emit_if_applied(&outcome, || StateEvent::CategoriesChanged);
        Ok(outcome)
    }

    pub fn remove_category(&mut self, name: &str) -> Result<Outcome<CategoryRemoval>> {
        let outcome = self.store.remove_category(name)?;
        if let Outcome::Applied(removal) = &outcome {
            self.notifier.emit(StateEvent::CategoriesChanged);
            if removal.reassigned_expenses > 0 {
                self.notifier.emit(StateEvent::ExpensesChanged);
            }
        }
        Ok(outcome)
    }

    pub fn set_setting(&mut self, key: SettingKey, value: &str) -> Result<Outcome> {
        let outcome = self.store.set_setting(key, value)?;
        self.emit_if_applied(&outcome, || StateEvent::SettingsChanged);
        Ok(outcome)
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<Outcome> {
        self.set_setting(SettingKey::Theme, theme.as_str())
    }
}
