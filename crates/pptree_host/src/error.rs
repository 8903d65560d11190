//! Error types for host pass invocation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`PassHost::call`](crate::PassHost::call).
#[derive(Debug, Error)]
pub enum HostError {
    /// No pass is registered under the command's first word.
    #[error("unknown pass `{0}`")]
    UnknownPass(String),

    /// The pass rejected its argument list.
    #[error("{pass}: {message}")]
    BadArguments {
        /// The pass name.
        pass: String,
        /// What was wrong.
        message: String,
    },

    /// A file the pass needed could not be read.
    #[error("cannot read `{}`: {source}", path.display())]
    Io {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// `techmap` found no module in the map file for any selected cell.
    #[error("no module in `{}` maps any selected cell", path.display())]
    NoMatchingMapModule {
        /// The map file.
        path: PathBuf,
    },
}

impl HostError {
    /// Shorthand for [`HostError::BadArguments`].
    pub fn bad_args(pass: &str, message: impl Into<String>) -> Self {
        HostError::BadArguments {
            pass: pass.to_string(),
            message: message.into(),
        }
    }
}
