//! Standalone host configuration
//!
//! Stored as YAML (default `~/.config/chainfx/standalone.yaml`). Every
//! section has defaults so a missing or partial file still starts the host.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use chainfx_core::config::{default_config_path, default_state_path, EngineConfig};

/// Config file name inside the ChainFx config directory
pub const CONFIG_FILENAME: &str = "standalone.yaml";

/// Default buffer size when the config doesn't name one (frames)
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Top-level standalone configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandaloneConfig {
    /// Engine tuning
    pub engine: EngineConfig,
    /// Audio device settings
    pub audio: AudioSettings,
    /// Where to load/save engine state (default: `~/.config/chainfx/state.json`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_path: Option<PathBuf>,
}

impl StandaloneConfig {
    /// State file path, falling back to the default location
    pub fn state_path(&self) -> PathBuf {
        self.state_path.clone().unwrap_or_else(default_state_path)
    }
}

/// Audio device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Requested sample rate; `None` uses the output device default
    pub sample_rate: Option<u32>,
    /// Requested buffer size in frames
    pub buffer_size: u32,
    /// Input device name; `None` uses the system default
    pub input_device: Option<String>,
    /// Output device name; `None` uses the system default
    pub output_device: Option<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            input_device: None,
            output_device: None,
        }
    }
}

/// Default config file location
pub fn default_config_file() -> PathBuf {
    default_config_path(CONFIG_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainfx_core::config::{load_config, save_config};

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "audio:\n  buffer_size: 128\nengine:\n  process_general_filter: true\n";
        let config: StandaloneConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.audio.buffer_size, 128);
        assert_eq!(config.audio.sample_rate, None);
        assert!(config.engine.process_general_filter);
        assert_eq!(config.engine.max_sub_block_size, 64);
        assert_eq!(config.state_path, None);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        let config = StandaloneConfig {
            audio: AudioSettings {
                sample_rate: Some(44100),
                output_device: Some("Scarlett 2i2".to_string()),
                ..Default::default()
            },
            state_path: Some(dir.path().join("state.json")),
            ..Default::default()
        };
        save_config(&config, &path).unwrap();
        let loaded: StandaloneConfig = load_config(&path);
        assert_eq!(loaded, config);
        assert_eq!(loaded.state_path(), dir.path().join("state.json"));
    }

    #[test]
    fn test_default_state_path() {
        let config = StandaloneConfig::default();
        assert!(config.state_path().ends_with("state.json"));
        assert!(default_config_file().ends_with(CONFIG_FILENAME));
    }
}
