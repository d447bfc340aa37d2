//! CLI argument definitions for the Sotto application.
//!
//! Uses `clap` with derive macros. Priority resolution: CLI args > env
//! vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Sotto — push-to-talk dictation: hold a hotkey, speak, release to type.
#[derive(Parser, Debug)]
#[command(name = "sotto", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Push-to-talk key (e.g. "F9", "Ctrl+Shift+D").
    #[arg(long = "hotkey")]
    pub hotkey: Option<String>,

    /// Directory containing speech model files.
    #[arg(long = "models-dir")]
    pub models_dir: Option<PathBuf>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SOTTO_CONFIG env var > ~/.sotto/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SOTTO_CONFIG") {
            return PathBuf::from(p);
        }
        sotto_dir().join("config.toml")
    }

    /// Resolve the log level. Priority: --log-level flag > config file.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        match self.log_level {
            Some(ref level) => level.clone(),
            None => config_level.to_string(),
        }
    }

    /// Resolve the speech model directory.
    ///
    /// Priority: --models-dir flag > ~/.sotto/models.
    pub fn resolve_models_dir(&self) -> PathBuf {
        match self.models_dir {
            Some(ref dir) => dir.clone(),
            None => sotto_dir().join("models"),
        }
    }
}

/// The per-user Sotto directory (`~/.sotto`).
fn sotto_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".sotto")
}
