//! Parsing and validation of `pptree.toml` configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`PptreeConfig`] describing where the external tools live, the default
//! generation parameters, and how tool output is reported.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, load_config_or_default, CONFIG_FILE_NAME};
pub use resolve::{resolve_backend, ResolvedBackend};
pub use types::*;
