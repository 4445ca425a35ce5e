//! Standard locations for Scribe files

use std::path::PathBuf;

/// Scribe's configuration directory
///
/// Returns: `<platform config dir>/scribe`, or `~/.scribe` when the platform
/// has no config dir.
pub fn default_config_dir() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("scribe"),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".scribe"),
    }
}

/// Returns: `<config dir>/scribe/config.yaml`
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}
