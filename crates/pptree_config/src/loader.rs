//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::PptreeConfig;
use std::path::Path;

/// File name looked up by [`load_config_or_default`].
pub const CONFIG_FILE_NAME: &str = "pptree.toml";

/// Loads and validates a configuration file at an explicit path.
pub fn load_config(path: &Path) -> Result<PptreeConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Loads `<dir>/pptree.toml` if it exists, otherwise returns the defaults.
pub fn load_config_or_default(dir: &Path) -> Result<PptreeConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.is_file() {
        load_config(&path)
    } else {
        Ok(PptreeConfig::default())
    }
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<PptreeConfig, ConfigError> {
    let config: PptreeConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &PptreeConfig) -> Result<(), ConfigError> {
    if config.defaults.width == 0 {
        return Err(ConfigError::Validation(
            "defaults.width must be positive".to_string(),
        ));
    }
    if config.backend.partitions == 0 {
        return Err(ConfigError::Validation(
            "backend.partitions must be positive".to_string(),
        ));
    }
    for (field, value) in [
        ("generator.python", &config.generator.python),
        ("generator.module", &config.generator.module),
        ("generator.class", &config.generator.class),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(field.to_string()));
        }
    }
    Ok(())
}
