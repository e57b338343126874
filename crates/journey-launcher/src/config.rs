//! Configuration management for journey-launcher.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "journey-launcher";

/// Default settings database file name.
const SETTINGS_FILE_NAME: &str = "settings.db";

/// Default interpreter for entry scripts.
#[cfg(windows)]
const DEFAULT_INTERPRETER: &str = "python";
#[cfg(not(windows))]
const DEFAULT_INTERPRETER: &str = "python3";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `JLAUNCH_`, sections split by `__`)
/// 2. TOML config file at `~/.config/journey-launcher/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workspace scanning configuration.
    pub workspace: WorkspaceConfig,
    /// Script runtime configuration.
    pub runtime: RuntimeConfig,
    /// Pre-flight validation configuration.
    pub validation: ValidationConfig,
    /// Settings store configuration.
    pub settings: SettingsConfig,
}

/// Workspace-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Workspace root to scan.
    /// Defaults to the parent of the folder holding the launcher binary.
    pub root: Option<PathBuf>,
    /// Folder names skipped in addition to the built-in denylist.
    pub extra_excluded_dirs: Vec<String>,
}

/// Script runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Interpreter used for both pre-flight checks and launches.
    /// A bare name is looked up on `PATH`.
    pub interpreter: String,
    /// Extension (without the dot) that marks a script file.
    pub script_extension: String,
}

/// Pre-flight validation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Run pre-flight checks at all. When disabled every app is valid.
    pub enabled: bool,
    /// Seconds a single check may take before the app is marked invalid.
    pub timeout_secs: u64,
    /// Maximum number of checks running at once.
    pub max_parallel: usize,
    /// Verify that the entry script's top-level imports resolve.
    pub check_imports: bool,
    /// Modules every app needs, checked in addition to the script's own imports.
    pub required_modules: Vec<String>,
}

/// Settings store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Path to the settings database.
    /// Defaults to `~/.local/share/journey-launcher/settings.db`
    pub database_path: Option<PathBuf>,
    /// Number of last-launched timestamps to keep.
    pub max_recents: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            script_extension: "py".to_string(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 10,
            max_parallel: 4,
            check_imports: true,
            required_modules: Vec::new(),
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            max_recents: 8,
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("JLAUNCH_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.runtime.interpreter.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "runtime.interpreter must not be empty".to_string(),
            });
        }

        let ext = self.runtime.script_extension.trim();
        if ext.is_empty() || ext.starts_with('.') {
            return Err(Error::ConfigValidation {
                message: format!(
                    "runtime.script_extension must be a bare extension such as \"py\", got {:?}",
                    self.runtime.script_extension
                ),
            });
        }

        if self.validation.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "validation.timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.validation.max_parallel == 0 {
            return Err(Error::ConfigValidation {
                message: "validation.max_parallel must be greater than 0".to_string(),
            });
        }

        for module in &self.validation.required_modules {
            if !crate::validation::is_module_name(module) {
                return Err(Error::ConfigValidation {
                    message: format!("invalid module name in validation.required_modules: {module}"),
                });
            }
        }

        if self.settings.max_recents == 0 {
            return Err(Error::ConfigValidation {
                message: "settings.max_recents must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the settings database path, resolving defaults if not set.
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.settings
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SETTINGS_FILE_NAME))
    }

    /// Get the per-check timeout as a Duration.
    #[must_use]
    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation.timeout_secs)
    }
}
