use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

const APP_DIR: &str = "tenki";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Forecast API settings
    #[serde(default)]
    pub forecast: ForecastConfig,

    /// Region taxonomy source
    #[serde(default)]
    pub regions: RegionsConfig,

    /// Local forecast history
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Base URL of the JMA "bosai" API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "https://www.jma.go.jp/bosai".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ForecastConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionsConfig {
    /// Path of the area taxonomy document (JMA `area.json` layout).
    /// Relative paths resolve against the working directory.
    #[serde(default = "default_taxonomy_path")]
    pub taxonomy_path: String,
}

fn default_taxonomy_path() -> String {
    "data/area.json".to_string()
}

impl Default for RegionsConfig {
    fn default() -> Self {
        Self {
            taxonomy_path: default_taxonomy_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Store every displayed forecast in the local history database
    #[serde(default = "default_history_enabled")]
    pub enabled: bool,

    /// SQLite database file
    #[serde(default = "default_history_database_path")]
    pub database_path: String,
}

fn default_history_enabled() -> bool {
    true
}

fn default_history_database_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("weather_history.db")
        .to_string_lossy()
        .into_owned()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_history_enabled(),
            database_path: default_history_database_path(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, creating it with defaults
    /// if it doesn't exist
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Wrote default configuration to {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(
            &self.forecast.api_base_url,
            "forecast.api_base_url",
            &mut result,
        );

        if self.forecast.request_timeout_secs == 0 {
            result.add_error(
                "forecast.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.forecast.request_timeout_secs > 120 {
            result.add_warning(
                "forecast.request_timeout_secs",
                "Request timeout is unusually long (>120s)",
            );
        }

        let taxonomy = PathBuf::from(&self.regions.taxonomy_path);
        if self.regions.taxonomy_path.trim().is_empty() {
            result.add_error("regions.taxonomy_path", "Taxonomy path must not be empty");
        } else if !taxonomy.exists() {
            result.add_warning(
                "regions.taxonomy_path",
                format!(
                    "File does not exist: {} (region list will be empty)",
                    taxonomy.display()
                ),
            );
        }

        if self.history.enabled && self.history.database_path.trim().is_empty() {
            result.add_error(
                "history.database_path",
                "History is enabled but no database path is set",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to an explicit path
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("no platform config directory".to_string()))?
            .join(APP_DIR);

        Ok(config_dir.join("config.toml"))
    }
}
