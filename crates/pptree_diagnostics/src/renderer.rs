//! Diagnostic rendering backends for human-readable and machine-readable output.

use crate::diagnostic::Diagnostic;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// error[E201]: generator exited with code 1
///   --> adder.v:3.9-3.14
///    = note: python3 -c "..."
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn header(&self, diag: &Diagnostic) -> String {
        let label = format!("{}[{}]", diag.severity, diag.code);
        if !self.color {
            return label;
        }
        let color = match diag.severity {
            crate::Severity::Error => "31",
            crate::Severity::Warning => "33",
            crate::Severity::Note => "36",
        };
        format!("\x1b[1;{color}m{label}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!("{}: {}\n", self.header(diag), diag.message);
        if let Some(location) = &diag.location {
            out.push_str(&format!("  --> {location}\n"));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }
        out
    }
}

/// Renders each diagnostic as one line of JSON.
pub struct JsonRenderer;

impl DiagnosticRenderer for JsonRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut line = serde_json::to_string(diag).unwrap_or_else(|e| {
            format!("{{\"error\":\"failed to serialize diagnostic: {e}\"}}")
        });
        line.push('\n');
        line
    }
}
