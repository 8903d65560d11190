//! Host IR: the netlist model the adder-tree rewrite operates on.
//!
//! This crate defines [`Design`], [`Module`], [`Cell`], [`SigSpec`] and
//! [`Selection`]: the structural view of a design that a synthesis host
//! exposes to the rewrite. Cells carry typed ports, a parameter set, an
//! attribute map and a source-location string. All types are serde
//! round-trippable so designs can be stored as JSON.

#![warn(missing_docs)]

pub mod arena;
pub mod attr;
pub mod cell;
pub mod design;
pub mod ids;
pub mod library;
pub mod module;
pub mod port;
pub mod process;
pub mod selection;
pub mod sig;
pub mod signal;

pub use arena::{Arena, ArenaId};
pub use attr::{Attributes, ConstValue};
pub use cell::{Cell, CellType};
pub use design::Design;
pub use ids::{CellId, ModuleId, PortId, SignalId};
pub use library::{LibraryFile, LibraryModule};
pub use module::Module;
pub use port::{Port, PortDirection};
pub use process::{Process, ProcessKind};
pub use selection::Selection;
pub use sig::{SigBit, SigSpec, State};
pub use signal::Signal;
