//! Resolution of the directory that holds all persisted BudgetIT data.

use anyhow::Result;
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory outright
pub const DATA_DIR_ENV: &str = "BUDGETIT_DATA_DIR";

/// File inside the default directory that points storage somewhere else
pub const REDIRECT_FILE: &str = ".budgetit_redirect";

const APP_DIRECTORY_NAME: &str = "BudgetIT";

/// Resolve the data directory
///
/// `BUDGETIT_DATA_DIR` wins when set. Otherwise the platform data directory
/// (falling back to the home directory) joined with `BudgetIT` is used, after
/// following a redirect file if one is present.
pub fn resolve_data_directory() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        let dir = dir.trim();
        if !dir.is_empty() {
            info!("Using data directory from {}: {}", DATA_DIR_ENV, dir);
            return Ok(PathBuf::from(dir));
        }
    }

    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow::anyhow!("Could not determine a data directory"))?;

    Ok(follow_redirect(&base.join(APP_DIRECTORY_NAME)))
}

/// Follow `<default_dir>/.budgetit_redirect` if it names an existing directory
pub fn follow_redirect(default_dir: &Path) -> PathBuf {
    let redirect_file = default_dir.join(REDIRECT_FILE);

    if !redirect_file.exists() {
        info!("No redirect file found, using data directory: {}", default_dir.display());
        return default_dir.to_path_buf();
    }

    match fs::read_to_string(&redirect_file) {
        Ok(redirected_path) => {
            let redirected_path = redirected_path.trim();
            let path = PathBuf::from(redirected_path);

            if !redirected_path.is_empty() && path.is_dir() {
                info!("Found redirect file, using data directory: {}", path.display());
                path
            } else {
                warn!(
                    "Redirect file points to non-existent directory: {}. Using default.",
                    redirected_path
                );
                default_dir.to_path_buf()
            }
        }
        Err(e) => {
            error!("Failed to read redirect file: {}. Using default directory.", e);
            default_dir.to_path_buf()
        }
    }
}
