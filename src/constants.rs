// src/constants.rs

/// The name of the directory (under the system config dir) holding dropchain configuration.
pub const CONFIG_DIR_NAME: &str = "dropchain";

/// The name of the default chain configuration file (inside the config dir).
pub const CHAIN_CONFIG_FILENAME: &str = "chain.toml";

/// Environment variable pointing at an explicit chain configuration file.
pub const CONFIG_PATH_ENV: &str = "DROPCHAIN_CONFIG";

/// Environment variable overriding `lookup.base_url` from the configuration file.
pub const LOOKUP_URL_ENV: &str = "DROPCHAIN_LOOKUP_URL";

/// Name given to the group formed by top-level `[[selector]]` entries.
pub const DEFAULT_GROUP_NAME: &str = "default";

/// The application prefix mounted in front of every lookup path.
pub const DEFAULT_SCRIPT_ROOT: &str = "checker";

/// The route serving dependent option lists.
pub const DEFAULT_LOOKUP_PATH: &str = "login_values";

/// Seconds before a lookup request is abandoned.
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;

/// The value carried by the hidden, disabled first entry of every populated option list.
pub const PLACEHOLDER_VALUE: &str = "none";

/// Index shared by every root (independent) selector.
pub const ROOT_INDEX: usize = 0;
