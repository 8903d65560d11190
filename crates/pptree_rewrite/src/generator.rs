//! Generator invocation protocol.
//!
//! Each invocation gets a fresh `pptrees-*` working directory. The random
//! part of the directory name doubles as a tag that makes the generated
//! top-module name unique, so several trees can be ingested into one design.
//! The tool's merged output is filtered and, on failure, its tail is carried
//! in the returned [`ExternalToolError`].

use crate::error::{ExternalToolError, RewriteError};
use crate::filter::{Echo, FilterPolicy, OutputFilter};
use crate::invocation::{Invocation, ToolRunner};
use crate::request::GenerationRequest;
use crate::script::{maps_artifacts, maps_invocation, tree_invocation, GeneratorSettings};
use log::{debug, info};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Prefix of generator working directories.
pub const WORKDIR_PREFIX: &str = "pptrees-";

/// What the generator is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// The techmap rules and primitive library for a mapping strategy.
    MapsOnly,
    /// One adder tree.
    TreeGeneration,
}

/// Files produced by one generator run.
///
/// The working directory is deleted when the result is dropped unless it is
/// kept with [`keep`](Self::keep).
#[derive(Debug)]
pub struct GenerationResult {
    workdir: TempDir,
    /// The primary artifact: the tree module, or the techmap rules in maps mode.
    pub artifact: PathBuf,
    /// The primitive library, in maps mode.
    pub library: Option<PathBuf>,
    /// The generated top-module name, in tree mode.
    pub top_module: Option<String>,
}

impl GenerationResult {
    /// The working directory holding the artifacts.
    pub fn dir(&self) -> &Path {
        self.workdir.path()
    }

    /// Disables cleanup and returns the directory path.
    pub fn keep(self) -> PathBuf {
        #[allow(deprecated)]
        self.workdir.into_path()
    }
}

/// Output and cleanup behavior of generator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    /// Re-emit tool output to the log.
    pub echo: bool,
    /// Show working-directory paths in logged output.
    pub show_tempdir: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            echo: true,
            show_tempdir: false,
        }
    }
}

/// Drives the external tree generator through a [`ToolRunner`].
pub struct Generator<R> {
    settings: GeneratorSettings,
    runner: R,
    output: OutputOptions,
    temp_root: Option<PathBuf>,
}

impl<R: ToolRunner> Generator<R> {
    /// Creates a generator with default output options.
    pub fn new(settings: GeneratorSettings, runner: R) -> Self {
        Self {
            settings,
            runner,
            output: OutputOptions::default(),
            temp_root: None,
        }
    }

    /// Sets output options.
    pub fn with_output(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }

    /// Creates working directories under `root` instead of the system
    /// temporary directory.
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    /// The launch settings.
    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// The underlying runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn workdir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKDIR_PREFIX);
        match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }

    /// Runs the generator for `request` in `mode`.
    ///
    /// Blocks until the tool exits. A non-zero exit code, or a failure to
    /// start the tool, is an [`ExternalToolError`]; a zero exit code without
    /// the expected output files is [`RewriteError::MissingArtifact`].
    pub fn invoke(
        &mut self,
        request: &GenerationRequest,
        mode: GenerationMode,
    ) -> Result<GenerationResult, RewriteError> {
        let workdir = self.workdir()?;
        let dir = workdir.path().to_path_buf();
        let tag = workdir_tag(&dir);

        let (invocation, artifact, library, top_module) = match mode {
            GenerationMode::MapsOnly => {
                let (map, lib) = maps_artifacts(&dir, &request.mapping);
                let inv = maps_invocation(&self.settings, &dir, &request.mapping);
                (inv, map, Some(lib), None)
            }
            GenerationMode::TreeGeneration => {
                let top = format!("_{tag}_adder");
                let (inv, artifact) = tree_invocation(&self.settings, request, &dir, &top);
                (inv, artifact, None, Some(top))
            }
        };

        self.run_checked(&invocation, &dir, "pptrees")?;

        for expected in std::iter::once(&artifact).chain(library.iter()) {
            if !expected.is_file() {
                return Err(RewriteError::MissingArtifact {
                    command: invocation.command_line(),
                    path: expected.clone(),
                });
            }
        }
        debug!("generator wrote {}", artifact.display());
        Ok(GenerationResult {
            workdir,
            artifact,
            library,
            top_module,
        })
    }

    fn run_checked(&mut self, invocation: &Invocation, dir: &Path, tag: &str) -> Result<(), ExternalToolError> {
        run_tool(&mut self.runner, invocation, self.output, dir, tag)
    }
}

/// Runs `invocation` through `runner` and maps failure to [`ExternalToolError`].
pub(crate) fn run_tool<R: ToolRunner>(
    runner: &mut R,
    invocation: &Invocation,
    output: OutputOptions,
    dir: &Path,
    tag: &str,
) -> Result<(), ExternalToolError> {
    let mut filter = OutputFilter::new(FilterPolicy {
        echo: if output.echo { Echo::Echo } else { Echo::Quiet },
        show_tempdir: output.show_tempdir,
        tag: tag.to_string(),
    })
    .with_tempdir(dir);
    run_filtered(runner, invocation, &mut filter)
}

pub(crate) fn run_filtered<R: ToolRunner>(
    runner: &mut R,
    invocation: &Invocation,
    filter: &mut OutputFilter,
) -> Result<(), ExternalToolError> {
    let command = invocation.command_line();
    info!("Running {}: {}", invocation.program, command);
    match runner.run(invocation, filter) {
        Ok(0) => Ok(()),
        Ok(code) => Err(ExternalToolError {
            command,
            code: Some(code),
            tail: filter.tail(),
        }),
        Err(err) => Err(ExternalToolError {
            command,
            code: None,
            tail: vec![err.to_string()],
        }),
    }
}

/// The random suffix of a working directory, restricted to identifier characters.
fn workdir_tag(dir: &Path) -> String {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = name.strip_prefix(WORKDIR_PREFIX).unwrap_or(&name);
    suffix
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
