//! Attribute-preserving adder-tree rewriting.
//!
//! The pass finds adders marked with `pptrees_alu`, lets the host
//! canonicalize them into `$alu` cells, carries their attributes across that
//! step, and replaces each one with a tree produced by an external
//! generator. The same process plumbing launches the logic-synthesis backend.
//!
//! Layering, bottom up:
//!
//! - [`filter`] cleans streamed tool output.
//! - [`request`], [`script`] and [`invocation`] build tool command lines.
//! - [`generator`] and [`backend`] run the tools in scratch directories.
//! - [`neighbor`] and [`store`] implement attribute preservation.
//! - [`driver`] sequences the whole pass against a [`pptree_host::PassHost`].

#![warn(missing_docs)]

pub mod backend;
pub mod codes;
pub mod driver;
pub mod error;
pub mod filter;
pub mod generator;
pub mod invocation;
pub mod neighbor;
pub mod options;
pub mod request;
pub mod script;
pub mod store;

pub use backend::{Backend, BackendScript};
pub use driver::{derive_request, run_rewrite, CellFailure, PassState, RewriteContext, RewriteReport};
pub use error::{ExternalToolError, RewriteError};
pub use filter::{Echo, FilterPolicy, IoNames, OutputFilter};
pub use generator::{GenerationMode, GenerationResult, Generator, OutputOptions};
pub use invocation::{Invocation, ProcessRunner, ToolRunner};
pub use neighbor::find_canonical_cell;
pub use options::RewriteOptions;
pub use request::{GenerationRequest, RequestError, Transform, TransformSequence};
pub use script::{GeneratorFlavor, GeneratorSettings, ScriptMode};
pub use store::{AttributeStore, SaveOutcome};
