//! The host pass primitive: "run a named pass with an argument string".
//!
//! The rewrite never mutates netlist structure itself. It asks a
//! [`PassHost`] to run canonicalization (`alumacc`), ingest generated files
//! (`read_verilog`), narrow the selection (`select`) and perform scoped
//! replacement (`techmap`). [`NativeHost`] provides structural
//! implementations of those four passes over [`pptree_ir::Design`].

#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod host;
pub mod passes;

pub use command::{quote_arg, tokenize};
pub use error::HostError;
pub use host::{HostPass, NativeHost, PassHost};

use pptree_diagnostics::{Category, DiagnosticCode};

/// `read_verilog` found no module definitions in a file.
pub const W_EMPTY_LIBRARY: DiagnosticCode = DiagnosticCode::new(Category::Warning, 401);
/// A `select` pattern matched no cells.
pub const W_EMPTY_SELECTION: DiagnosticCode = DiagnosticCode::new(Category::Warning, 402);
