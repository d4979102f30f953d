//! Standard locations for synthdesk configuration files

use std::path::PathBuf;

/// Get the default configuration directory
///
/// Returns: `<platform config dir>/synthdesk`, falling back to `./synthdesk`
/// when the platform has no config directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("synthdesk")
}

/// Get the default path for a config file
///
/// # Arguments
/// * `filename` - Config file name (e.g., "session.yaml")
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}
