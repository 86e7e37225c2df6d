//! Path resolution utilities.

use crate::error::ConfigError;
use std::fs;
use std::path::PathBuf;

/// Get the Herald base directory (~/.herald).
pub fn base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::Validation("Could not determine home directory".to_string())
    })?;
    Ok(home.join(".herald"))
}

/// Get the main config file path (~/.herald/herald.json5).
pub fn config_file() -> Result<PathBuf, ConfigError> {
    Ok(base_dir()?.join("herald.json5"))
}

/// Ensure the base directory exists.
pub fn ensure_dirs() -> Result<(), ConfigError> {
    fs::create_dir_all(base_dir()?)?;
    Ok(())
}
