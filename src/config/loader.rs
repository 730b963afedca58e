//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ControlPlaneConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_CONFIG_PATH: &str = "HAPROXY_CONFIG_PATH";
pub const ENV_BINARY: &str = "HAPROXY_BINARY";
pub const ENV_SOCKET: &str = "HAPROXY_SOCKET";
pub const ENV_API_KEY: &str = "ADMIN_API_KEY";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load, override from the environment, and validate a TOML settings file.
pub fn load_config(path: &Path) -> Result<ControlPlaneConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: ControlPlaneConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Defaults plus environment overrides, for running without a file.
pub fn load_default() -> Result<ControlPlaneConfig, ConfigError> {
    let mut config = ControlPlaneConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply the deployment environment variables on top of file settings.
pub fn apply_env_overrides<F>(config: &mut ControlPlaneConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(path) = lookup(ENV_CONFIG_PATH) {
        config.haproxy.config_path = path.into();
    }
    if let Some(binary) = lookup(ENV_BINARY) {
        config.haproxy.binary = binary;
    }
    if let Some(socket) = lookup(ENV_SOCKET) {
        config.runtime.socket = socket;
    }
    if let Some(key) = lookup(ENV_API_KEY) {
        config.admin.api_key = key;
    }
}
