//! # Config Loader
//!
//! Reads a `chain.toml`, applies environment overrides and validates it into something
//! [`Chain`]s can be built from. A file holds one or more form groups, each an
//! independent chain. Structural rules on indices live in [`Chain::new`]; this module adds
//! the checks that only make sense for a file written by hand.

use crate::{
    constants::LOOKUP_URL_ENV,
    core::chain::{Chain, ChainError},
    models::{ChainConfig, GroupDecl},
};
use lazy_static::lazy_static;
use regex::Regex;
use std::{
    collections::HashSet,
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use thiserror::Error;

lazy_static! {
    /// Column and table names end up in SQL on the backend; keep them plain identifiers,
    /// optionally schema-qualified.
    static ref IDENTIFIER: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
            .expect("identifier pattern is valid");
    static ref GROUP_NAME: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("group name pattern is valid");
}

/// Everything that can be wrong with a chain configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file does not exist.
    #[error("No chain configuration found at '{0}'.")]
    NotFound(PathBuf),
    /// The file exists but could not be read.
    #[error("Could not read '{path}': {source}")]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for this format.
    #[error("Could not parse '{path}': {source}")]
    Parse {
        /// The file being parsed.
        path: PathBuf,
        /// The TOML error, with line and column.
        #[source]
        source: toml::de::Error,
    },
    /// A value is out of range or malformed.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    /// A group's selectors do not form a valid chain.
    #[error("Invalid chain in group '{group}': {source}")]
    Chain {
        /// The offending group.
        group: String,
        /// What is wrong with its selectors.
        #[source]
        source: ChainError,
    },
    /// `--group` named a group the file does not declare.
    #[error("No group named '{name}'. Declared groups: {known}")]
    UnknownGroup {
        /// The requested name.
        name: String,
        /// Comma-separated declared names.
        known: String,
    },
    /// Several groups are declared and none was chosen.
    #[error("Several groups are declared ({0}); pick one with --group.")]
    AmbiguousGroup(String),
}

/// Reads, overrides and validates the configuration at `path`, taking the lookup URL
/// override from `$DROPCHAIN_LOOKUP_URL`.
pub fn load_config(path: &Path) -> Result<ChainConfig, ConfigError> {
    load_config_with_override(path, env::var(LOOKUP_URL_ENV).ok())
}

/// [`load_config`] with the lookup URL override passed in rather than read from the
/// environment.
pub fn load_config_with_override(
    path: &Path,
    lookup_url: Option<String>,
) -> Result<ChainConfig, ConfigError> {
    log::debug!("Loading chain configuration from '{}'", path.display());

    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
        _ => ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let mut config = parse_config(&content, path)?;
    apply_lookup_url_override(&mut config, lookup_url);
    validate(&config)?;
    Ok(config)
}

/// Parses `content` and folds top-level selectors into the `default` group.
pub fn parse_config(content: &str, origin: &Path) -> Result<ChainConfig, ConfigError> {
    let mut config: ChainConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
        path: origin.to_path_buf(),
        source: e,
    })?;
    config.normalize();
    Ok(config)
}

/// Replaces `lookup.base_url` when an override is present and non-blank.
pub fn apply_lookup_url_override(config: &mut ChainConfig, url: Option<String>) {
    if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
        log::debug!("Lookup base URL overridden by ${}: {}", LOOKUP_URL_ENV, url);
        config.lookup.base_url = url;
    }
}

/// Checks a parsed (and normalized) configuration, building every group's chain once.
pub fn validate(config: &ChainConfig) -> Result<(), ConfigError> {
    let base_url = config.lookup.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::Invalid(format!(
            "lookup.base_url must be an http(s) URL, got '{}'",
            config.lookup.base_url
        )));
    }
    if config.lookup.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "lookup.timeout_secs must be greater than zero".to_string(),
        ));
    }
    if config.groups.is_empty() {
        return Err(ConfigError::Invalid(
            "no selectors declared; add [[selector]] or [[group]] tables".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for group in &config.groups {
        if !GROUP_NAME.is_match(&group.name) {
            return Err(ConfigError::Invalid(format!(
                "group name '{}' must start with a letter or '_' and contain only letters, digits, '_' or '-'",
                group.name
            )));
        }
        if !seen.insert(group.name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "group '{}' is declared more than once",
                group.name
            )));
        }

        for decl in &group.selectors {
            for (key, value) in [
                ("value_field", &decl.value_field),
                ("display_field", &decl.display_field),
                ("table", &decl.table),
            ] {
                if !IDENTIFIER.is_match(value) {
                    return Err(ConfigError::Invalid(format!(
                        "selector '{}' in group '{}': {} '{}' is not a valid identifier",
                        decl.name, group.name, key, value
                    )));
                }
            }
        }
    }

    build_chains(config).map(|_| ())
}

/// Picks the group to drive: the named one, or the only one when no name is given.
pub fn select_group<'a>(
    config: &'a ChainConfig,
    name: Option<&str>,
) -> Result<&'a GroupDecl, ConfigError> {
    let known = || config.group_names().join(", ");

    match name {
        Some(name) => config.group(name).ok_or_else(|| ConfigError::UnknownGroup {
            name: name.to_string(),
            known: known(),
        }),
        None => match config.groups.as_slice() {
            [only] => Ok(only),
            [] => Err(ConfigError::Invalid("no groups declared".to_string())),
            _ => Err(ConfigError::AmbiguousGroup(known())),
        },
    }
}

/// Builds a fresh, unloaded chain from one group's selectors.
pub fn build_chain(group: &GroupDecl) -> Result<Chain, ConfigError> {
    Chain::new(group.selectors.clone()).map_err(|source| ConfigError::Chain {
        group: group.name.clone(),
        source,
    })
}

/// One fresh chain per group, in declaration order.
pub fn build_chains(config: &ChainConfig) -> Result<Vec<(&GroupDecl, Chain)>, ConfigError> {
    config
        .groups
        .iter()
        .map(|group| build_chain(group).map(|chain| (group, chain)))
        .collect()
}
