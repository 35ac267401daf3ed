mod config;
pub mod database;
pub mod migrations;

pub use config::{EngineConfig, StoreConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::CoreError;

/// Overrides the data directory outright.
pub const DATA_DIR_ENV_VAR: &str = "REFOCUS_DATA_DIR";

/// Set to `dev` to use the development data directory.
pub const ENV_VAR: &str = "REFOCUS_ENV";

/// Returns `$REFOCUS_DATA_DIR` if set, else `~/.config/refocus[-dev]/` based on REFOCUS_ENV.
///
/// The directory is created if missing.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    let dir = match std::env::var_os(DATA_DIR_ENV_VAR) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var(ENV_VAR).unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("refocus-dev")
            } else {
                base_dir.join("refocus")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
