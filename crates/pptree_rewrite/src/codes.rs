//! Diagnostic codes emitted by the rewrite.

use pptree_diagnostics::{Category, DiagnosticCode};

/// Malformed pass or CLI argument.
pub const E_ARGUMENT: DiagnosticCode = DiagnosticCode::new(Category::Error, 101);
/// An external tool exited with a non-zero code or could not be started.
pub const E_TOOL_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Error, 201);
/// Generating the mapping library failed.
pub const E_MAPS_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Error, 202);
/// A tool succeeded but its expected output file is missing.
pub const E_ARTIFACT_MISSING: DiagnosticCode = DiagnosticCode::new(Category::Error, 203);
/// A host pass failed while splicing one cell.
pub const E_HOST_PASS: DiagnosticCode = DiagnosticCode::new(Category::Error, 204);
/// A cell's `pptrees_transforms` attribute does not decode.
pub const E_BAD_TRANSFORM_ATTR: DiagnosticCode = DiagnosticCode::new(Category::Error, 205);

/// Two marked cells with different attributes share a source-location key.
pub const W_KEY_COLLISION: DiagnosticCode = DiagnosticCode::new(Category::Warning, 301);
/// A marked cell has no source location and cannot be tracked.
pub const W_NO_SRC: DiagnosticCode = DiagnosticCode::new(Category::Warning, 302);
/// A module was skipped because it still contains processes.
pub const W_MODULE_SKIPPED: DiagnosticCode = DiagnosticCode::new(Category::Warning, 303);
