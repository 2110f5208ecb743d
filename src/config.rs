//! Configuration module for the watch supervisor.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.watchrun/settings.toml`)
//! - Environment variable overrides
//! - CLI argument overrides (applied by the commands)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `WATCHRUN_` and use double
//! underscores to separate nested levels:
//! - `WATCHRUN_WATCH__DEBOUNCE_MS=250` sets `watch.debounce_ms`
//! - `WATCHRUN_WATCH__CLEAR_SCREEN=false` sets `watch.clear_screen`
//! - `WATCHRUN_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::watcher::DEFAULT_DEBOUNCE_MS;

/// Directory holding the settings file.
pub const CONFIG_DIR: &str = ".watchrun";
/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "WATCHRUN_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Restart behavior
    #[serde(default)]
    pub watch: WatchConfig,

    /// Diagnostic logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What happens when the child exits without a file change.
#[derive(
    Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CrashPolicy {
    /// Leave it down until a qualifying change.
    #[default]
    Wait,
    /// Respawn (debounced) after a non-zero exit.
    Restart,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Quiet period before a restart fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Reset the terminal before each restart
    #[serde(default = "default_true")]
    pub clear_screen: bool,

    /// Extra paths that always trigger a restart
    #[serde(default)]
    pub include: Vec<PathBuf>,

    /// Glob patterns that never trigger a restart
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Behavior after the child exits unsuccessfully
    #[serde(default)]
    pub crash_policy: CrashPolicy,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `supervisor = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_exclude() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/.git/**".to_string(),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            watch: WatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            clear_screen: true,
            include: Vec::new(),
            exclude: default_exclude(),
            crash_policy: CrashPolicy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the settings file by walking up from the current directory
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.watch.debounce_ms, 100);
        assert!(settings.watch.clear_screen);
        assert_eq!(settings.watch.crash_policy, CrashPolicy::Wait);
        assert!(settings.watch.include.is_empty());
        assert_eq!(settings.logging.default, "warn");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
version = 2

[watch]
debounce_ms = 250
clear_screen = false
include = ["src/main.ts"]
exclude = ["**/dist/**"]
crash_policy = "restart"

[logging]
default = "info"

[logging.modules]
supervisor = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.version, 2);
        assert_eq!(settings.watch.debounce_ms, 250);
        assert!(!settings.watch.clear_screen);
        assert_eq!(settings.watch.include, vec![PathBuf::from("src/main.ts")]);
        // Default exclude patterns are replaced by custom ones
        assert_eq!(settings.watch.exclude, vec!["**/dist/**"]);
        assert_eq!(settings.watch.crash_policy, CrashPolicy::Restart);
        assert_eq!(settings.logging.default, "info");
        assert_eq!(settings.logging.modules["supervisor"], "debug");
    }

    #[test]
    fn test_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        fs::write(&config_path, "[watch]\ndebounce_ms = 40\n").unwrap();

        let settings = Settings::load_from(&config_path).unwrap();

        // Modified value
        assert_eq!(settings.watch.debounce_ms, 40);

        // Default values should still be present
        assert_eq!(settings.version, 1);
        assert!(settings.watch.clear_screen);
        assert!(!settings.watch.exclude.is_empty());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings::load_from(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.watch, WatchConfig::default());
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(".watchrun").join("settings.toml");

        let mut settings = Settings::default();
        settings.watch.debounce_ms = 500;
        settings.watch.crash_policy = CrashPolicy::Restart;

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.watch.debounce_ms, 500);
        assert_eq!(loaded.watch.crash_policy, CrashPolicy::Restart);
    }

    #[test]
    fn test_invalid_crash_policy_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");
        fs::write(&config_path, "[watch]\ncrash_policy = \"sometimes\"\n").unwrap();

        assert!(Settings::load_from(&config_path).is_err());
    }
}
