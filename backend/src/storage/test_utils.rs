/// Test utilities module for automatic cleanup and consistent test infrastructure
///
/// The temporary data directory lives as long as the `TestEnvironment`, so test
/// data is removed even if a test panics.
use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::file_storage::FileStorage;

/// RAII test environment around a temporary data directory
pub struct TestEnvironment {
    /// Kept alive until drop so the directory is not removed early
    _temp_dir: TempDir,
    pub base_path: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::with_prefix("budgetit_test_")?;
        let base_path = temp_dir.path().to_path_buf();

        Ok(TestEnvironment {
            _temp_dir: temp_dir,
            base_path,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_path
    }

    /// A fresh file storage handle on this environment's directory.
    /// Handles are independent, so a second call simulates an app restart.
    pub fn storage(&self) -> FileStorage {
        FileStorage::new(&self.base_path).expect("Failed to open test storage")
    }
}

impl Drop for TestEnvironment {
    fn drop(&mut self) {
        if std::env::var("BUDGETIT_DEBUG_TESTS").is_ok() {
            println!("Cleaning up test environment: {:?}", self.base_path);
        }
    }
}
