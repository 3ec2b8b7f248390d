//! Application configuration.
//!
//! The data directory comes from [`resolve_data_directory`]; everything else
//! can be overridden by a `config.yaml` in that directory:
//!
//! ```yaml
//! storage_key: budgetit_v2
//! legacy_key: budgetit_data
//! default_currency: EUR
//! default_theme: auto
//! ```

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use shared::{Settings, DEFAULT_CURRENCY};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{SettingKey, StoreOptions, LEGACY_KEY, STORAGE_KEY};
use crate::storage::resolve_data_directory;

pub const CONFIG_FILE_NAME: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    #[serde(skip)]
    pub data_directory: PathBuf,
    pub storage_key: String,
    pub legacy_key: String,
    pub default_currency: String,
    pub default_theme: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_directory: PathBuf::new(),
            storage_key: STORAGE_KEY.to_string(),
            legacy_key: LEGACY_KEY.to_string(),
            default_currency: DEFAULT_CURRENCY.to_string(),
            default_theme: "auto".to_string(),
        }
    }
}

impl AppConfig {
    /// Resolve the data directory and read its config file, if any
    pub fn load() -> Result<Self> {
        let data_directory = resolve_data_directory()?;
        Self::load_from(&data_directory)
    }

    /// Read `<data_directory>/config.yaml`, falling back to defaults when it
    /// does not exist. A file that exists but does not parse is an error.
    pub fn load_from(data_directory: &Path) -> Result<Self> {
        let path = data_directory.join(CONFIG_FILE_NAME);

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: AppConfig = serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid configuration in {}", path.display()))?;
            info!("Loaded configuration from {}", path.display());
            config
        } else {
            debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, data_directory.display());
            AppConfig::default()
        };

        config.data_directory = data_directory.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() || self.legacy_key.trim().is_empty() {
            anyhow::bail!("storage_key and legacy_key cannot be empty");
        }
        if self.storage_key == self.legacy_key {
            anyhow::bail!("storage_key and legacy_key must differ");
        }
        self.profile_defaults()?;
        Ok(())
    }

    /// Settings every new profile starts with
    pub fn profile_defaults(&self) -> Result<Settings> {
        let mut settings = Settings::default();
        SettingKey::Theme
            .write(&mut settings, &self.default_theme)
            .context("Invalid default_theme")?;
        SettingKey::Currency
            .write(&mut settings, &self.default_currency)
            .context("Invalid default_currency")?;
        Ok(settings)
    }

    pub fn store_options(&self) -> Result<StoreOptions> {
        Ok(StoreOptions {
            storage_key: self.storage_key.clone(),
            legacy_key: self.legacy_key.clone(),
            profile_defaults: self.profile_defaults()?,
        })
    }
}
