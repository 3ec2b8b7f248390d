//! # File Storage
//!
//! Key-value storage backed by one JSON file per key inside the data directory.
//!
//! ## File Structure
//!
//! ```text
//! data/
//! ├── config.yaml          ← optional, see `config`
//! ├── budgetit_v2.json     ← current AppData record
//! └── budgetit_data.json   ← legacy single-profile record (until migrated)
//! ```
//!
//! Writes go to a temp file that is then renamed over the target, so a crash
//! mid-write never leaves a half written record behind.

use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

use super::traits::KeyValueStorage;

const FILE_EXTENSION: &str = "json";

/// File-backed key-value storage rooted at a data directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_directory: PathBuf,
}

impl FileStorage {
    /// Open storage in `base_directory`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .with_context(|| format!("Failed to create data directory {:?}", base_path))?;
            info!("Created data directory: {:?}", base_path);
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Path of the file backing `key`
    pub fn path_for_key(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self
            .base_directory
            .join(format!("{}.{}", key, FILE_EXTENSION)))
    }
}

/// Keys become file names, so only a conservative character set is allowed
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));

    if valid {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Invalid storage key: {:?}", key))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for_key(key)?;

        if !path.exists() {
            debug!("No stored value for key {} at {:?}", key, path);
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        Ok(Some(content))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for_key(key)?;

        if !self.base_directory.exists() {
            fs::create_dir_all(&self.base_directory)?;
        }

        // Atomic write using temp file
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, value)
            .with_context(|| format!("Failed to write {:?}", temp_path))?;
        fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to replace {:?}", path))?;

        debug!("Stored {} bytes under key {}", value.len(), key);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        let path = self.path_for_key(key)?;

        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
        info!("Removed stored key {}", key);
        Ok(true)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        if !self.base_directory.exists() {
            return Ok(keys);
        }

        for entry in fs::read_dir(&self.base_directory)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }

        keys.sort();
        Ok(keys)
    }
}
