//! Error types for the rewrite pipeline.

use crate::request::RequestError;
use pptree_host::HostError;
use std::path::PathBuf;
use thiserror::Error;

/// An external tool exited unsuccessfully or could not be started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(self))]
pub struct ExternalToolError {
    /// The command line that was run.
    pub command: String,
    /// The exit code, or `None` if the process never ran to completion.
    pub code: Option<i32>,
    /// The last clean lines of the tool's output.
    pub tail: Vec<String>,
}

fn describe(err: &ExternalToolError) -> String {
    match err.code {
        Some(code) => format!("execution of `{}` failed: return code {code}", err.command),
        None => format!("could not run `{}`", err.command),
    }
}

/// Errors raised by the rewrite pipeline.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// Bad pass or CLI input. Aborts the pass before any IR mutation.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// A generator or backend run failed.
    #[error(transparent)]
    ExternalTool(#[from] ExternalToolError),

    /// A tool exited with status 0 but did not write its output.
    #[error("`{command}` did not produce `{}`", path.display())]
    MissingArtifact {
        /// The command line that was run.
        command: String,
        /// The file that was expected.
        path: PathBuf,
    },

    /// A generation request could not be built or decoded.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// A host pass failed.
    #[error("host pass failed: {0}")]
    Host(#[from] HostError),

    /// Filesystem error outside a tool run.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A pass-state invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}
