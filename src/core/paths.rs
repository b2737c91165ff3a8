// src/core/paths.rs

use crate::constants::{CHAIN_CONFIG_FILENAME, CONFIG_DIR_NAME, CONFIG_PATH_ENV};
use lazy_static::lazy_static;
use std::env;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

lazy_static! {
    static ref CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// Failures locating the configuration file.
#[derive(Error, Debug)]
pub enum PathError {
    /// The platform has no config directory (no `$HOME`, for instance).
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    /// A `~` or `$VAR` in the path could not be expanded.
    #[error("Failed to expand path '{template}': {message}")]
    Expansion {
        /// The path as given.
        template: String,
        /// What went wrong.
        message: String,
    },
}

/// Returns the path to the dropchain configuration directory (`~/.config/dropchain`).
///
/// This function is memoized: the first call computes and caches the path,
/// subsequent calls return the cached value instantly.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    let mut cached_path_guard = CONFIG_DIR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(path) = &*cached_path_guard {
        return Ok(path.clone());
    }

    let config_path = dirs::config_dir()
        .ok_or(PathError::ConfigDirNotFound)?
        .join(CONFIG_DIR_NAME);

    *cached_path_guard = Some(config_path.clone());
    Ok(config_path)
}

/// Returns the path of the default `chain.toml`.
pub fn get_default_config_path() -> Result<PathBuf, PathError> {
    get_config_dir().map(|dir| dir.join(CHAIN_CONFIG_FILENAME))
}

/// Expands home directory (`~`) and environment variables (`$VAR`) in a user-given path.
pub fn expand_path(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        message: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Picks the configuration file to load, by priority: explicit argument,
/// then `$DROPCHAIN_CONFIG`, then the default location.
pub fn resolve_config_path(explicit: Option<&str>) -> Result<PathBuf, PathError> {
    resolve_config_path_from(explicit, env::var(CONFIG_PATH_ENV).ok())
}

/// [`resolve_config_path`] with the `$DROPCHAIN_CONFIG` value passed in. Blank values
/// count as unset.
pub fn resolve_config_path_from(
    explicit: Option<&str>,
    from_env: Option<String>,
) -> Result<PathBuf, PathError> {
    if let Some(path) = explicit {
        return expand_path(path);
    }
    if let Some(from_env) = from_env.filter(|p| !p.trim().is_empty()) {
        log::debug!("Using config path from ${}: {}", CONFIG_PATH_ENV, from_env);
        return expand_path(&from_env);
    }
    get_default_config_path()
}
