//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::{GatewayConfig, RegistryConfig};
use crate::config::validation::{validate_gateway, validate_registry, ValidationError};

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

/// Load and validate a registry server config from a TOML file.
pub fn load_registry_config(path: &Path) -> Result<RegistryConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: RegistryConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_registry(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate a gateway config from a TOML file.
pub fn load_gateway_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: GatewayConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_gateway(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
