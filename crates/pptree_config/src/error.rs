//! Configuration errors.

use std::path::PathBuf;

/// Why a `pptree.toml` could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read `{}`: {source}", path.display())]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has unknown keys.
    #[error("invalid configuration: {0}")]
    Parse(String),

    /// A value needed by the requested operation is absent or empty.
    #[error("`{0}` is not set")]
    MissingField(String),

    /// A value is out of range.
    #[error("invalid value: {0}")]
    Validation(String),
}
