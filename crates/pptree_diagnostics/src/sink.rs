//! Collects the diagnostics of one pass.

use crate::code::DiagnosticCode;
use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Shared, append-only diagnostic list.
///
/// Emitting takes `&self`, so the driver, the host passes and the CLI can
/// all hold the same sink. Errors are also counted in an atomic so
/// [`has_errors`](Self::has_errors) never locks.
#[derive(Default)]
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    errors: AtomicUsize,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `diag`.
    pub fn emit(&self, diag: Diagnostic) {
        if diag.severity.is_error() {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.lock().push(diag);
    }

    /// Whether any error was emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Errors emitted so far, including drained ones.
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    /// How many held diagnostics carry `code`.
    pub fn count_code(&self, code: DiagnosticCode) -> usize {
        self.lock().iter().filter(|d| d.code == code).count()
    }

    /// Held `(errors, warnings)`.
    pub fn summary(&self) -> (usize, usize) {
        let held = self.lock();
        let count = |s: Severity| held.iter().filter(|d| d.severity == s).count();
        (count(Severity::Error), count(Severity::Warning))
    }

    /// Drains the sink.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    /// A copy of the held diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        // Poisoning leaves the vector intact.
        self.diagnostics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    const E_TOOL: DiagnosticCode = DiagnosticCode::new(Category::Error, 201);
    const W_SKIP: DiagnosticCode = DiagnosticCode::new(Category::Warning, 303);

    #[test]
    fn counts_errors_and_codes() {
        let sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        sink.emit(Diagnostic::error(E_TOOL, "generator exited with code 1"));
        sink.emit(Diagnostic::warning(W_SKIP, "module `top` skipped"));
        sink.emit(Diagnostic::warning(W_SKIP, "module `sub` skipped"));
        assert!(sink.has_errors());
        assert_eq!(sink.count_code(W_SKIP), 2);
        assert_eq!(sink.summary(), (1, 2));
    }

    #[test]
    fn draining_keeps_error_count() {
        let sink = DiagnosticSink::new();
        sink.emit(Diagnostic::error(E_TOOL, "boom"));
        assert_eq!(sink.take_all().len(), 1);
        assert!(sink.diagnostics().is_empty());
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.summary(), (0, 0));
    }
}
