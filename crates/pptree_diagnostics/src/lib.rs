//! Diagnostic creation, severity management, and rendering.
//!
//! This crate provides structured [`Diagnostic`] messages with severity levels,
//! error codes, and source locations. The [`DiagnosticSink`] accumulates
//! diagnostics while a rewrite pass runs, and [`DiagnosticRenderer`]
//! implementations format them for the terminal or as JSON.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
