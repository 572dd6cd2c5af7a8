use anyhow::Result;
use std::path::Path;

use crate::config::{ConfigValidationError, ValidationResult};
use crate::error::{AppError, ConfigError};
use crate::Config;

/// Application configuration and lifecycle
pub struct App {
    config: Config,
    validation: ValidationResult,
}

impl App {
    /// Create an application from the configuration file in the platform
    /// config directory
    ///
    /// # Errors
    /// See [`App::load_from`]; also fails with [`ConfigError::NotFound`] when
    /// the platform has no config directory.
    pub fn new() -> Result<Self, AppError> {
        Self::load_from(Config::config_path()?)
    }

    /// Load and validate the configuration at `path`, writing defaults there
    /// if the file does not exist yet
    ///
    /// # Errors
    /// - [`AppError::Io`] if the file cannot be read or written
    /// - [`ConfigError::ParseError`] if the file is not valid TOML for [`Config`]
    /// - [`ConfigError::Invalid`] if validation reports errors
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let config = Config::load_from(path)?;

        let validation = config.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }
        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        tracing::info!(
            "Configuration loaded (history {})",
            if config.history.enabled { "enabled" } else { "disabled" }
        );
        Ok(Self { config, validation })
    }

    /// Shutdown the application
    pub fn shutdown(&mut self) -> Result<()> {
        tracing::info!("Shutting down application");
        Ok(())
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Non-fatal configuration problems found at load time
    pub fn config_warnings(&self) -> &[ConfigValidationError] {
        &self.validation.warnings
    }
}
