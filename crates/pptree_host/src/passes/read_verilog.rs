//! `read_verilog`: ingest a hardware-description file into the library.
//!
//! Files are not elaborated. The pass records each `module <name>` header
//! together with any `(* techmap_celltype = "..." *)` annotation that
//! precedes it, which is all scoped replacement needs.

use crate::error::HostError;
use crate::host::HostPass;
use crate::W_EMPTY_LIBRARY;
use log::{debug, warn};
use pptree_diagnostics::{Diagnostic, DiagnosticSink};
use pptree_ir::{Design, LibraryFile, LibraryModule};
use std::path::{Path, PathBuf};

/// The `read_verilog` pass.
pub struct ReadVerilogPass;

const ACCEPTED_FLAGS: &[&str] = &["-sv", "-lib", "-nooverwrite", "-overwrite", "-defer"];

impl HostPass for ReadVerilogPass {
    fn name(&self) -> &'static str {
        "read_verilog"
    }

    fn execute(
        &self,
        args: &[&str],
        design: &mut Design,
        sink: &DiagnosticSink,
    ) -> Result<(), HostError> {
        let mut path = None;
        for arg in args {
            if arg.starts_with('-') {
                if !ACCEPTED_FLAGS.contains(arg) {
                    return Err(HostError::bad_args(self.name(), format!("unknown option `{arg}`")));
                }
            } else if path.replace(*arg).is_some() {
                return Err(HostError::bad_args(self.name(), "expected exactly one file"));
            }
        }
        let path = path.ok_or_else(|| HostError::bad_args(self.name(), "missing file name"))?;
        ingest(design, Path::new(path), sink)
    }
}

/// Reads `path` and records its modules in `design.library`.
///
/// Re-reading a file replaces its earlier entry.
pub fn ingest(design: &mut Design, path: &Path, sink: &DiagnosticSink) -> Result<(), HostError> {
    let text = std::fs::read_to_string(path).map_err(|source| HostError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let modules = scan_modules(&text);
    if modules.is_empty() {
        warn!("read_verilog: no modules in `{}`", path.display());
        sink.emit(
            Diagnostic::warning(W_EMPTY_LIBRARY, "file defines no modules")
                .with_location(path.display().to_string()),
        );
    } else {
        debug!(
            "read_verilog: `{}` defines {}",
            path.display(),
            modules.iter().map(|m| m.name.as_str()).collect::<Vec<_>>().join(", ")
        );
    }
    let file = LibraryFile {
        path: PathBuf::from(path),
        modules,
    };
    match design.library.iter_mut().find(|f| f.path == file.path) {
        Some(existing) => *existing = file,
        None => design.library.push(file),
    }
    Ok(())
}

/// Extracts module headers and their `techmap_celltype` annotations.
pub fn scan_modules(text: &str) -> Vec<LibraryModule> {
    let mut modules = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if let Some(types) = celltype_annotation(line) {
            pending = types;
        }
        let header = line
            .rsplit_once("*)")
            .map(|(_, rest)| rest.trim())
            .unwrap_or(line);
        if let Some(rest) = header.strip_prefix("module") {
            if !rest.starts_with(|c: char| c.is_whitespace()) {
                continue;
            }
            let name: String = rest
                .trim_start()
                .chars()
                .take_while(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '\\'))
                .collect();
            if !name.is_empty() {
                modules.push(LibraryModule {
                    name,
                    celltypes: std::mem::take(&mut pending),
                });
            }
        }
    }
    modules
}

fn celltype_annotation(line: &str) -> Option<Vec<String>> {
    let start = line.find("techmap_celltype")?;
    let rest = &line[start + "techmap_celltype".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start().strip_prefix('"')?;
    let value = &rest[..rest.find('"')?];
    Some(value.split_whitespace().map(str::to_string).collect())
}
