// src/config/loader.rs
//! Layered configuration loader
//!
//! Defaults are merged with each existing TOML file in order, then with
//! `PDM_<SECTION>__<KEY>` environment overrides, then validated.

use crate::config::{constants::paths, SystemConfig};
use crate::error::{PdError, PdResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Configuration loader
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader over the conventional `config/` files
    pub fn new() -> Self {
        Self {
            config_paths: vec![
                PathBuf::from(paths::DEFAULT_CONFIG_FILE),
                PathBuf::from(paths::LOCAL_CONFIG_FILE),
            ],
        }
    }

    /// Create loader with custom paths, later paths take precedence
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self { config_paths: paths }
    }

    /// Paths consulted by [`load`](Self::load)
    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load, merge and validate the configuration
    pub fn load(&self) -> PdResult<SystemConfig> {
        let mut merged = toml::Value::try_from(SystemConfig::default()).map_err(|e| {
            PdError::Configuration {
                component: "loader".to_string(),
                reason: e.to_string(),
            }
        })?;

        for path in &self.config_paths {
            if !path.exists() {
                debug!(path = %path.display(), "skipping missing config file");
                continue;
            }
            let overlay = Self::load_config_file(path)?;
            merge_toml_values(&mut merged, overlay);
            info!(path = %path.display(), "merged config file");
        }

        apply_environment_overrides(&mut merged, std::env::vars());

        let config: SystemConfig = merged.try_into().map_err(|e: toml::de::Error| {
            PdError::Configuration {
                component: "loader".to_string(),
                reason: format!("failed to deserialize config: {}", e),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a single file without merging anything else
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> PdResult<SystemConfig> {
        let content = std::fs::read_to_string(path)?;
        let config: SystemConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write a configuration as pretty TOML
    pub fn export_config<P: AsRef<Path>>(&self, config: &SystemConfig, path: P) -> PdResult<()> {
        let toml_content = toml::to_string_pretty(config).map_err(|e| PdError::Configuration {
            component: "loader".to_string(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn load_config_file(path: &Path) -> PdResult<toml::Value> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
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

/// `PDM_WINDOW__LENGTH=64` sets `window.length`; keys may contain single underscores
fn apply_environment_overrides<I>(config: &mut toml::Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(stripped) = key.strip_prefix(paths::ENV_PREFIX) else {
            continue;
        };
        let path: Vec<String> = stripped
            .split(paths::ENV_SECTION_SEPARATOR)
            .map(|part| part.to_lowercase())
            .collect();
        if path.iter().any(|part| part.is_empty()) {
            continue;
        }
        debug!(key = %key, "applying environment override");
        set_nested_value(config, &path, parse_env_value(&value));
    }
}

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(float_val) = value.parse::<f64>() {
        toml::Value::Float(float_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn set_nested_value(config: &mut toml::Value, path: &[String], value: toml::Value) {
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
        table.insert(last.clone(), value);
    }
}
