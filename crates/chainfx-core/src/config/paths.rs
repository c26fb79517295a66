//! Standard locations for ChainFx files

use std::path::PathBuf;

/// Get the default config directory
///
/// Returns: `~/.config/chainfx` (or the platform equivalent)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chainfx")
}

/// Get the default config file path for a given app
///
/// # Arguments
/// * `filename` - Config file name (e.g., "standalone.yaml")
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}

/// Get the default path of the saved chain state
pub fn default_state_path() -> PathBuf {
    default_config_dir().join("state.json")
}
