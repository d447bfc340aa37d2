use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for the Sotto application.
///
/// Loaded from `~/.sotto/config.toml` by default. Each section corresponds
/// to one subsystem. Missing sections and fields fall back to defaults; a
/// malformed document falls back to all-defaults rather than failing
/// startup (see [`Config::load_or_default`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub injection: InjectionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            model: ModelConfig::default(),
            audio: AudioConfig::default(),
            injection: InjectionConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Selects which audio input device a capture stream opens.
///
/// Serialized untagged so the config file accepts either a device index or
/// a device name; an absent field means the system default device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceSelector {
    /// Device index as reported by enumeration.
    Index(usize),
    /// Device name (case-insensitive substring match).
    Name(String),
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Play audible cues when recording starts and stops.
    pub play_sounds: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            play_sounds: true,
        }
    }
}

/// Speech model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model size identifier: "tiny", "base", "small", ...
    pub size: String,
    /// Transcription language code (e.g., "en").
    pub language: String,
    /// Compute precision: "int8" or "float16".
    pub precision: String,
    /// Inference device: "auto" (probe for an accelerator), "cpu", or "gpu".
    pub device: String,
    /// Conditioning prompt biasing the model's vocabulary and style.
    pub initial_prompt: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            size: "small".to_string(),
            language: "en".to_string(),
            precision: "int8".to_string(),
            device: "auto".to_string(),
            initial_prompt: "Transcription of voice dictation for emails, messages, \
                             code comments, and notes. Uses proper punctuation, \
                             capitalization, and natural sentence structure."
                .to_string(),
        }
    }
}

/// Microphone capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Number of capture channels (1 = mono).
    pub channels: u16,
    /// Input device; absent means the system default.
    pub input_device: Option<DeviceSelector>,
    /// Maximum recording duration in seconds (0 = unlimited).
    pub max_duration_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            input_device: None,
            max_duration_secs: 300,
        }
    }
}

/// Text injection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionConfig {
    /// Injection method: "sendinput" (Unicode input events) or "keystroke"
    /// (simulated keystrokes; may trigger shortcuts in some applications).
    pub method: String,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            method: "sendinput".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert!(config.general.play_sounds);
        assert_eq!(config.model.size, "small");
        assert_eq!(config.model.language, "en");
        assert_eq!(config.model.precision, "int8");
        assert_eq!(config.model.device, "auto");
        assert!(config.model.initial_prompt.contains("voice dictation"));
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.channels, 1);
        assert_eq!(config.audio.input_device, None);
        assert_eq!(config.audio.max_duration_secs, 300);
        assert_eq!(config.injection.method, "sendinput");
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"
play_sounds = false

[model]
size = "base"
device = "cpu"

[audio]
sample_rate = 48000
channels = 2
max_duration_secs = 60

[injection]
method = "keystroke"
"#;
        let file = create_temp_config(content);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert!(!config.general.play_sounds);
        assert_eq!(config.model.size, "base");
        assert_eq!(config.model.device, "cpu");
        // Fields absent from the file keep their defaults.
        assert_eq!(config.model.language, "en");
        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.audio.channels, 2);
        assert_eq!(config.audio.max_duration_secs, 60);
        assert_eq!(config.injection.method, "keystroke");
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[general]
log_level = "warn"
"#;
        let file = create_temp_config(content);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert!(config.general.play_sounds);
        assert_eq!(config.model.size, "small");
        assert_eq!(config.audio.sample_rate, 16000);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.model.device, "auto");
    }

    #[test]
    fn test_load_or_default_malformed_file() {
        let content = "this is {{ not valid TOML";
        let file = create_temp_config(content);
        let config = Config::load_or_default(file.path());
        // Malformed document falls back to all-defaults.
        assert_eq!(config.model.size, "small");
        assert_eq!(config.audio.max_duration_secs, 300);
    }

    #[test]
    fn test_load_invalid_toml_errors() {
        let content = "broken = [[[";
        let file = create_temp_config(content);
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.injection.method, "sendinput");
    }

    #[test]
    fn test_device_selector_index() {
        let content = r#"
[audio]
input_device = 3
"#;
        let file = create_temp_config(content);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.audio.input_device, Some(DeviceSelector::Index(3)));
    }

    #[test]
    fn test_device_selector_name() {
        let content = r#"
[audio]
input_device = "Yeti Stereo Microphone"
"#;
        let file = create_temp_config(content);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.audio.input_device,
            Some(DeviceSelector::Name("Yeti Stereo Microphone".to_string()))
        );
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.general.play_sounds = false;
        config.model.size = "base".to_string();
        config.model.initial_prompt = "Medical terminology.".to_string();
        config.audio.input_device = Some(DeviceSelector::Name("USB Mic".to_string()));
        config.audio.max_duration_secs = 0;
        config.injection.method = "keystroke".to_string();
        config.save(&path).unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.general.log_level, config.general.log_level);
        assert_eq!(reloaded.general.play_sounds, config.general.play_sounds);
        assert_eq!(reloaded.model.size, config.model.size);
        assert_eq!(reloaded.model.language, config.model.language);
        assert_eq!(reloaded.model.precision, config.model.precision);
        assert_eq!(reloaded.model.device, config.model.device);
        assert_eq!(reloaded.model.initial_prompt, config.model.initial_prompt);
        assert_eq!(reloaded.audio.sample_rate, config.audio.sample_rate);
        assert_eq!(reloaded.audio.channels, config.audio.channels);
        assert_eq!(reloaded.audio.input_device, config.audio.input_device);
        assert_eq!(
            reloaded.audio.max_duration_secs,
            config.audio.max_duration_secs
        );
        assert_eq!(reloaded.injection.method, config.injection.method);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("dir").join("config.toml");

        let config = Config::default();
        config.save(&path).unwrap();

        assert!(path.exists());
        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.general.log_level, "info");
    }

    #[test]
    fn test_serialization_round_trip_with_index_selector() {
        let mut config = Config::default();
        config.audio.input_device = Some(DeviceSelector::Index(1));
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            deserialized.audio.input_device,
            Some(DeviceSelector::Index(1))
        );
    }
}
