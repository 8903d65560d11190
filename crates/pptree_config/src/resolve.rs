//! Resolution of backend file locations.
//!
//! The backend's shared configuration and learned-model files live at fixed
//! locations relative to its installation. They are derived from the
//! executable path unless the configuration names them explicitly.

use crate::error::ConfigError;
use crate::types::BackendConfig;
use std::path::PathBuf;

/// Path component the backend installation directory is recognized by.
const BACKEND_MARKER: &str = "lsoracle";

/// Backend locations with every derived path filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBackend {
    /// The backend executable.
    pub executable: PathBuf,
    /// Shared configuration file substituted for `{C}`.
    pub config_file: PathBuf,
    /// Learned-model file substituted for `{D}`.
    pub model_file: PathBuf,
    /// Partition count substituted (with the config file) for `{P}`.
    pub partitions: u32,
}

/// Resolves a [`BackendConfig`] into concrete paths.
///
/// The installation prefix is everything in the executable path before the
/// first occurrence of `lsoracle`. The configuration file defaults to
/// `<prefix>../../core/test.ini` and the model to
/// `<prefix>../../deep_learn_model.json`.
pub fn resolve_backend(config: &BackendConfig) -> Result<ResolvedBackend, ConfigError> {
    let executable = config
        .executable
        .as_deref()
        .ok_or_else(|| ConfigError::MissingField("backend.executable".to_string()))?;
    let prefix = match executable.find(BACKEND_MARKER) {
        Some(pos) => &executable[..pos],
        None => {
            if config.config.is_none() || config.model.is_none() {
                return Err(ConfigError::Validation(format!(
                    "cannot derive backend file locations from '{executable}'; \
                     set backend.config and backend.model"
                )));
            }
            ""
        }
    };

    let config_file = match &config.config {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(format!("{prefix}../../core/test.ini")),
    };
    let model_file = match &config.model {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(format!("{prefix}../../deep_learn_model.json")),
    };

    Ok(ResolvedBackend {
        executable: PathBuf::from(executable),
        config_file,
        model_file,
        partitions: config.partitions,
    })
}
