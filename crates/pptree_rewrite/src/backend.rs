//! Logic-synthesis backend invocation.
//!
//! The backend reads a script file. [`Backend::run`] writes the script for a
//! [`ScriptMode`] (or a user script wrapped by
//! [`prepend_script_file`](crate::script::prepend_script_file)) into a fresh
//! working directory, runs the executable on it and checks that the output
//! file appeared.

use crate::error::RewriteError;
use crate::filter::{Echo, FilterPolicy, IoNames, OutputFilter};
use crate::generator::{run_filtered, OutputOptions};
use crate::invocation::ToolRunner;
use crate::script::{
    backend_invocation, backend_script, prepend_script_file, BackendPaths, ScriptMode,
    BACKEND_SCRIPT,
};
use log::debug;
use pptree_config::ResolvedBackend;
use std::path::{Path, PathBuf};

/// What to run: a generated script or a user-supplied body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendScript {
    /// Build the script from mode flags.
    Mode(ScriptMode),
    /// Wrap this script body with `read` and `write_blif`.
    User(String),
}

/// Drives the backend executable through a [`ToolRunner`].
pub struct Backend<R> {
    resolved: ResolvedBackend,
    runner: R,
    output: OutputOptions,
}

impl<R: ToolRunner> Backend<R> {
    /// Creates a backend for the resolved executable and paths.
    pub fn new(resolved: ResolvedBackend, runner: R) -> Self {
        Self {
            resolved,
            runner,
            output: OutputOptions::default(),
        }
    }

    /// Sets output options.
    pub fn with_output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }

    /// The text of the script that [`run`](Self::run) would write.
    pub fn script_text(&self, script: &BackendScript, input: &Path, output: &Path) -> String {
        let input = input.display().to_string();
        let output = output.display().to_string();
        match script {
            BackendScript::Mode(mode) => {
                backend_script(mode, &BackendPaths::from(&self.resolved), &input, &output)
            }
            BackendScript::User(body) => prepend_script_file(body, &input, &output),
        }
    }

    /// Writes the script, runs the backend and returns the script text.
    ///
    /// `names` resolves the `pi`/`po` indices of timing lines in the output.
    pub fn run(
        &mut self,
        script: &BackendScript,
        input: &Path,
        output: &Path,
        names: IoNames,
    ) -> Result<String, RewriteError> {
        let text = self.script_text(script, input, output);
        let workdir = tempfile::Builder::new().prefix("lsoracle-").tempdir()?;
        let script_path: PathBuf = workdir.path().join(BACKEND_SCRIPT);
        std::fs::write(&script_path, format!("{text}\n"))?;
        debug!("backend script: {text}");

        let invocation = backend_invocation(&self.resolved.executable, &script_path);
        let mut filter = OutputFilter::new(FilterPolicy {
            echo: if self.output.echo { Echo::Echo } else { Echo::Quiet },
            show_tempdir: self.output.show_tempdir,
            tag: "lsoracle".to_string(),
        })
        .with_tempdir(workdir.path())
        .with_io_names(names);
        run_filtered(&mut self.runner, &invocation, &mut filter)?;

        if !output.exists() {
            return Err(RewriteError::MissingArtifact {
                command: invocation.command_line(),
                path: output.to_path_buf(),
            });
        }
        Ok(text)
    }
}
