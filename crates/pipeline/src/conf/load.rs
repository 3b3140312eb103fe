//! Load — config loading from file and environment variables.

use std::path::Path;
use std::fs;

use super::error::{ConfigError, ConfigResult};
use super::model::LabelsConfig;

const DEFAULT_CONFIG_PATH: &str = "/etc/pipeline/labels.toml";

impl LabelsConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> ConfigResult<Self> {
        let config_path = std::env::var("LABELS_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading labels configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!("Config file not found at {}, using defaults and environment", config_path);
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> ConfigResult<Self> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply overrides from a key lookup (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(groups) = lookup("LABELS_GROUPS") {
            self.groups = split_names(&groups);
        }
        if let Some(without) = lookup("LABELS_WITHOUT").and_then(|s| s.parse().ok()) {
            self.without = without;
        }
        if let Some(no_labels) = lookup("LABELS_NO_LABELS").and_then(|s| s.parse().ok()) {
            self.no_labels = no_labels;
        }
        if let Some(required) = lookup("LABELS_REQUIRED") {
            self.required_labels = Some(split_names(&required));
        }
        if let Some(max) = lookup("LABELS_MAX_INTERNED_STRINGS").and_then(|s| s.parse().ok()) {
            self.max_interned_strings = max;
        }
    }
}

/// Comma separated names, blanks dropped.
fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
