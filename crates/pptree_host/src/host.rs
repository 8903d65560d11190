//! Pass registry and dispatch.

use crate::command::tokenize;
use crate::error::HostError;
use crate::passes;
use log::debug;
use pptree_diagnostics::DiagnosticSink;
use pptree_ir::Design;
use std::collections::BTreeMap;

/// Runs named passes against a design.
pub trait PassHost {
    /// Runs `command` (pass name followed by its arguments) on `design`.
    fn call(
        &mut self,
        design: &mut Design,
        command: &str,
        sink: &DiagnosticSink,
    ) -> Result<(), HostError>;
}

/// A single pass that a [`NativeHost`] can dispatch to.
pub trait HostPass {
    /// The command word that invokes this pass.
    fn name(&self) -> &'static str;

    /// Runs the pass with the words following its name.
    fn execute(
        &self,
        args: &[&str],
        design: &mut Design,
        sink: &DiagnosticSink,
    ) -> Result<(), HostError>;
}

/// A host with the structural passes the rewrite needs.
pub struct NativeHost {
    passes: BTreeMap<&'static str, Box<dyn HostPass>>,
    history: Vec<String>,
}

impl Default for NativeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeHost {
    /// Creates a host with `alumacc`, `read_verilog`, `select` and `techmap`.
    pub fn new() -> Self {
        let mut host = Self {
            passes: BTreeMap::new(),
            history: Vec::new(),
        };
        host.register(Box::new(passes::alumacc::AlumaccPass));
        host.register(Box::new(passes::read_verilog::ReadVerilogPass));
        host.register(Box::new(passes::select::SelectPass));
        host.register(Box::new(passes::techmap::TechmapPass));
        host
    }

    /// Registers a pass, replacing any pass with the same name.
    pub fn register(&mut self, pass: Box<dyn HostPass>) {
        self.passes.insert(pass.name(), pass);
    }

    /// Every command run so far, in order.
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl PassHost for NativeHost {
    fn call(
        &mut self,
        design: &mut Design,
        command: &str,
        sink: &DiagnosticSink,
    ) -> Result<(), HostError> {
        let words = tokenize(command).ok_or_else(|| {
            HostError::bad_args("host", format!("unterminated quote in `{command}`"))
        })?;
        let Some((name, rest)) = words.split_first() else {
            return Err(HostError::bad_args("host", "empty command"));
        };
        let pass = self
            .passes
            .get(name.as_str())
            .ok_or_else(|| HostError::UnknownPass(name.clone()))?;
        debug!("host: {command}");
        self.history.push(command.to_string());
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();
        pass.execute(&args, design, sink)
    }
}
