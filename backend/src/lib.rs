//! # BudgetIT Backend
//!
//! Domain logic and persistence for BudgetIT, a personal budget tracker with
//! multiple profiles. Everything runs synchronously; the storage layer is a
//! plain key-value surface so the same store works on files or in memory.
//!
//! ## Layers
//!
//! - **storage**: `KeyValueStorage` and its file and in-memory backends
//! - **domain**: the profile store, validation, statistics, notifications
//! - **config**: data directory and YAML overrides
//!
//! ```no_run
//! use budgetit_backend::{config::AppConfig, initialize_backend};
//!
//! let config = AppConfig::load()?;
//! let app = initialize_backend(&config)?;
//! println!("{} profiles", app.store().profiles().len());
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use log::info;

pub mod config;
pub mod domain;
pub mod storage;

pub use domain::{BudgetApp, Outcome, ProfileStore};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};

/// Open the file-backed store described by `config`
pub fn initialize_backend(config: &config::AppConfig) -> Result<BudgetApp<FileStorage>> {
    info!("Initializing backend in {}", config.data_directory.display());

    let storage = FileStorage::new(&config.data_directory).with_context(|| {
        format!(
            "Failed to open data directory {}",
            config.data_directory.display()
        )
    })?;
    let store = ProfileStore::open_with(storage, config.store_options()?)?;

    Ok(BudgetApp::new(store))
}
