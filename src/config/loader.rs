// src/config/loader.rs
//! Layered configuration loader: defaults, then files, then environment

use crate::config::{constants::paths, CaptureConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Configuration loader merging every source in precedence order
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    environment: Option<Vec<(String, String)>>,
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Configuration validation errors: {}", .0.join("; "))]
    ValidationError(Vec<String>),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl ConfigLoader {
    /// Create loader with the standard search paths
    pub fn new() -> Self {
        Self::with_paths(Self::discover_config_paths())
    }

    /// Create loader with custom paths, later paths take precedence
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            environment: None,
        }
    }

    /// Read overrides from the given variables instead of the process environment
    pub fn with_environment<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environment = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load, merge and validate the configuration
    pub fn load(&self) -> Result<CaptureConfig, ConfigError> {
        let mut merged_config = toml::Value::Table(toml::value::Table::new());

        let default_config = toml::Value::try_from(CaptureConfig::default())
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        self.merge_toml_values(&mut merged_config, default_config);

        for config_path in &self.config_paths {
            match self.load_config_file(config_path) {
                Ok(file_config) => {
                    debug!(path = %config_path.display(), "Merging configuration file");
                    self.merge_toml_values(&mut merged_config, file_config);
                }
                // Missing files are optional layers
                Err(ConfigError::FileNotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }

        self.apply_environment_overrides(&mut merged_config);

        let config: CaptureConfig = merged_config.try_into()?;
        config
            .validate_consistency()
            .map_err(ConfigError::ValidationError)?;

        Ok(config)
    }

    /// Validate a single file on top of the defaults
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        ConfigLoader::with_paths(vec![path.to_path_buf()])
            .with_environment(Vec::<(String, String)>::new())
            .load()
            .map(|_| ())
    }

    fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<toml::Value, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: toml::Value = toml::from_str(&content)?;

        Ok(config)
    }

    fn merge_toml_values(&self, base: &mut toml::Value, overlay: toml::Value) {
        match (base, overlay) {
            (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
                for (key, value) in overlay_table {
                    if let Some(base_value) = base_table.get_mut(&key) {
                        self.merge_toml_values(base_value, value);
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

    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        let vars: Vec<(String, String)> = match &self.environment {
            Some(vars) => vars.clone(),
            None => std::env::vars().collect(),
        };

        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(paths::ENV_PREFIX) {
                let config_path: Vec<String> = stripped
                    .split(paths::ENV_SEPARATOR)
                    .filter(|part| !part.is_empty())
                    .map(str::to_lowercase)
                    .collect();
                if config_path.is_empty() {
                    continue;
                }

                debug!(variable = %key, "Applying environment override");
                let existing = self.nested_value(config, &config_path);
                let parsed = self.parse_env_value(&value, existing);
                self.set_nested_value(config, &config_path, parsed);
            }
        }
    }

    /// Parse an override as the type already present at its key.
    /// Keys absent from the merged tree fall back to guessing.
    fn parse_env_value(&self, value: &str, existing: Option<&toml::Value>) -> toml::Value {
        let typed = match existing {
            Some(toml::Value::String(_)) => Some(toml::Value::String(value.to_string())),
            Some(toml::Value::Integer(_)) => value.parse::<i64>().ok().map(toml::Value::Integer),
            Some(toml::Value::Float(_)) => value.parse::<f64>().ok().map(toml::Value::Float),
            Some(toml::Value::Boolean(_)) => value.parse::<bool>().ok().map(toml::Value::Boolean),
            _ => None,
        };
        if let Some(typed) = typed {
            return typed;
        }

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

    fn nested_value<'a>(&self, config: &'a toml::Value, path: &[String]) -> Option<&'a toml::Value> {
        path.iter()
            .try_fold(config, |current, part| current.as_table()?.get(part))
    }

    fn set_nested_value(&self, config: &mut toml::Value, path: &[String], value: toml::Value) {
        let mut current = config;

        for (i, part) in path.iter().enumerate() {
            let toml::Value::Table(table) = current else {
                return;
            };
            if i == path.len() - 1 {
                table.insert(part.clone(), value);
                return;
            }
            current = table
                .entry(part.clone())
                .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut config_paths = vec![Path::new(paths::SYSTEM_CONFIG_DIR).join(paths::CONFIG_FILE_NAME)];

        if let Some(home_dir) = home_dir() {
            config_paths.push(home_dir.join(".config").join(paths::CONFIG_FILE_NAME));
        }

        config_paths.push(PathBuf::from(paths::CONFIG_FILE_NAME));
        config_paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("USERPROFILE").map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}
