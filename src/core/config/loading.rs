//! Reads `ConfigFile` values from disk.

use super::file::ConfigFile;
use crate::core::error::{AppError, Result};
use std::fs;
use std::path::Path;

/// Loads and parses a TOML configuration file.
pub(crate) fn load_config_file(path: &Path) -> Result<ConfigFile> {
    tracing::debug!("Loading configuration file: {}", path.display());
    let contents = fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    let file: ConfigFile = toml::from_str(&contents)?;
    Ok(file)
}
