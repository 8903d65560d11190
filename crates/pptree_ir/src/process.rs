//! Behavioral processes that have not been lowered to cells.
//!
//! The rewrite does not reason about processes; a module that still has any
//! is left untouched.

use serde::{Deserialize, Serialize};

/// The kind of a behavioral process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessKind {
    /// Combinational (`always @*`).
    Combinational,
    /// Edge-triggered.
    Sequential,
    /// Level-sensitive latch.
    Latched,
    /// Simulation-only initial block.
    Initial,
}

/// A process as seen by structural passes: a name, a kind, and a source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    /// The process name.
    pub name: String,
    /// The process kind.
    pub kind: ProcessKind,
    /// Source location, if known.
    #[serde(default)]
    pub src: Option<String>,
}
