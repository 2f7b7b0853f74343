// src/config/loader.rs
//! Layered configuration loader
//!
//! Defaults, then each existing file in precedence order, then `GLOVE_`
//! environment variables. Section levels in variable names are separated by
//! a double underscore: `GLOVE_DETECTION__PINCH__COOLDOWN_S=0.3`.

use crate::config::{constants::paths, SystemConfig};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("configuration parse error: {0}")]
    Parse(String),
    #[error("configuration validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Configuration loader
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
    current_config: Arc<RwLock<SystemConfig>>,
}

impl ConfigLoader {
    /// Loader over the standard system, user and local paths
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Create loader with custom paths, lowest precedence first
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_prefix: paths::ENV_PREFIX.to_string(),
            current_config: Arc::new(RwLock::new(SystemConfig::default())),
        }
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load, merge and validate the configuration
    pub fn load_system_config(&mut self) -> Result<SystemConfig, ConfigError> {
        let config = self.load_and_merge_configs()?;
        *self.current_config.write() = config.clone();
        info!(summary = ?config.get_summary(), "configuration loaded");
        Ok(config)
    }

    /// Get current configuration
    pub fn get_current_config(&self) -> SystemConfig {
        self.current_config.read().clone()
    }

    /// Shared handle to the last loaded configuration
    pub fn shared_config(&self) -> Arc<RwLock<SystemConfig>> {
        Arc::clone(&self.current_config)
    }

    /// Parse and validate a single file on top of the defaults
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let mut merged = default_table()?;
        merge_toml_values(&mut merged, load_config_file(path.as_ref())?);
        let config = into_config(merged)?;
        config
            .validate_consistency()
            .map_err(ConfigError::Validation)
    }

    /// Export current configuration to file
    pub fn export_config<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let config = self.get_current_config();
        let toml_content =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::Parse(e.to_string()))?;

        std::fs::write(path, toml_content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    fn load_and_merge_configs(&self) -> Result<SystemConfig, ConfigError> {
        let mut merged_config = default_table()?;

        for config_path in &self.config_paths {
            if config_path.exists() {
                debug!(path = %config_path.display(), "merging configuration file");
                merge_toml_values(&mut merged_config, load_config_file(config_path)?);
            }
        }

        self.apply_environment_overrides(&mut merged_config);

        let config = into_config(merged_config)?;
        config
            .validate_consistency()
            .map_err(ConfigError::Validation)?;
        Ok(config)
    }

    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        for (key, value) in std::env::vars() {
            let Some(stripped) = key.strip_prefix(&self.env_prefix) else {
                continue;
            };
            let path: Vec<String> = stripped
                .to_lowercase()
                .split("__")
                .map(str::to_string)
                .collect();
            if path.iter().any(String::is_empty) {
                warn!(variable = %key, "ignoring malformed configuration override");
                continue;
            }
            debug!(variable = %key, "applying environment override");
            set_nested_value(config, &path, &value);
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        paths.push(PathBuf::from(paths::SYSTEM_CONFIG_PATH));

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(paths::USER_CONFIG_DIR).join("config.toml"));
        }

        // Local configurations, in order of precedence
        paths.push(PathBuf::from(paths::DEFAULT_CONFIG_FILE));
        paths.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));

        paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn default_table() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SystemConfig::default()).map_err(|e| ConfigError::Parse(e.to_string()))
}

fn into_config(value: toml::Value) -> Result<SystemConfig, ConfigError> {
    value
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
}

fn load_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

/// Parse an override, keeping the type of the value it replaces when known
fn parse_env_value(raw: &str, existing: Option<&toml::Value>) -> toml::Value {
    match existing {
        Some(toml::Value::String(_)) => return toml::Value::String(raw.to_string()),
        Some(toml::Value::Float(_)) => {
            if let Ok(float_val) = raw.parse::<f64>() {
                return toml::Value::Float(float_val);
            }
        }
        _ => {}
    }

    if let Ok(int_val) = raw.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = raw.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = raw.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(raw.to_string())
    }
}

fn set_nested_value(config: &mut toml::Value, path: &[String], raw: &str) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = config;
    for part in parents {
        let toml::Value::Table(table) = current else {
            return;
        };
        current = table
            .entry(part.clone())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
    }
    if let toml::Value::Table(table) = current {
        let value = parse_env_value(raw, table.get(last));
        table.insert(last.clone(), value);
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var_os("USERPROFILE").map(PathBuf::from)
        }
        #[cfg(not(target_os = "windows"))]
        {
            std::env::var_os("HOME").map(PathBuf::from)
        }
    }
}
