//! # Domain Module
//!
//! Contains the business logic of BudgetIT.
//!
//! Everything a user records (profiles, expenses, categories, budgets and
//! settings) lives in one [`AppData`](shared::AppData) record owned by the
//! [`ProfileStore`]. The store persists the whole record through a
//! [`KeyValueStorage`](crate::storage::KeyValueStorage) after every change.
//!
//! ## Module Organization
//!
//! - **profile_store**: the store and its load/migrate logic
//! - **migration**: converting legacy single-profile records
//! - **budget_app**: store plus change notifications, login orchestration
//! - **notifier**: `StateEvent` subscriptions
//! - **validation**: checks run on raw user input
//! - **stats**: monthly totals, category shares and budget progress
//! - **settings**: the per-profile settings record by key
//! - **ids**: identifier generation
//! - **pin**: pin encoding and verification
//! - **outcome**: result type for mutations that may not apply
//!
//! ## Rules
//!
//! - At most one profile is active; profile-scoped operations act on it
//! - Every profile keeps the fallback category `Altro`, expenses of a
//!   deleted category move there
//! - Budgets for deleted categories are ignored
//! - Identifiers are never reused

pub mod budget_app;
pub mod ids;
pub mod migration;
pub mod notifier;
pub mod outcome;
pub mod pin;
pub mod profile_store;
pub mod settings;
pub mod stats;
pub mod validation;

pub use budget_app::{BudgetApp, LoginResult};
pub use notifier::{StateEvent, StateNotifier, SubscriptionId};
pub use outcome::Outcome;
pub use profile_store::{
    corrupt_backup_key, CategoryRemoval, LoadSource, ProfileStore, StoreOptions, LEGACY_KEY,
    STORAGE_KEY,
};
pub use settings::{SettingError, SettingKey};
pub use validation::ValidationError;
