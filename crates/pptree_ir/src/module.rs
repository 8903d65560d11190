//! Modules: the unit a rewrite pass visits.
//!
//! A [`Module`] owns its ports, signals, cells and any behavioral processes
//! that have not been lowered. Cells live in an [`Arena`] so that removing
//! one never invalidates the IDs of the others.

use crate::arena::Arena;
use crate::cell::{Cell, CellType};
use crate::ids::{CellId, ModuleId, PortId, SignalId};
use crate::port::{Port, PortDirection};
use crate::process::Process;
use crate::sig::SigSpec;
use crate::signal::Signal;
use serde::{Deserialize, Serialize};

/// A module in the design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// The unique ID of this module within the design.
    pub id: ModuleId,
    /// The module name.
    pub name: String,
    /// Module ports.
    #[serde(default)]
    pub ports: Arena<PortId, Port>,
    /// Signals declared in the module.
    #[serde(default)]
    pub signals: Arena<SignalId, Signal>,
    /// Netlist cells.
    #[serde(default)]
    pub cells: Arena<CellId, Cell>,
    /// Unlowered behavioral processes.
    #[serde(default)]
    pub processes: Vec<Process>,
}

impl Module {
    /// Creates an empty module.
    pub fn new(id: ModuleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ports: Arena::new(),
            signals: Arena::new(),
            cells: Arena::new(),
            processes: Vec::new(),
        }
    }

    /// Declares a signal and returns a spec covering all of its bits.
    pub fn add_signal(&mut self, name: impl Into<String>, width: u32) -> SigSpec {
        let name = name.into();
        let id = self.signals.alloc_with(|id| Signal { id, name, width });
        SigSpec::wire(id, width)
    }

    /// Declares a port backed by a fresh signal of the same name.
    pub fn add_port(
        &mut self,
        name: impl Into<String>,
        direction: PortDirection,
        width: u32,
    ) -> SigSpec {
        let name = name.into();
        let sig_name = name.clone();
        let signal = self.signals.alloc_with(|id| Signal {
            id,
            name: sig_name,
            width,
        });
        self.ports.alloc_with(|id| Port {
            id,
            name,
            direction,
            signal,
        });
        SigSpec::wire(signal, width)
    }

    /// Adds a cell built from the ID it receives.
    pub fn add_cell(&mut self, build: impl FnOnce(CellId) -> Cell) -> CellId {
        self.cells.alloc_with(build)
    }

    /// Adds a two-operand arithmetic cell connected to `a`, `b` and `y`.
    pub fn add_binary(
        &mut self,
        name: impl Into<String>,
        cell_type: CellType,
        a: SigSpec,
        b: SigSpec,
        y: SigSpec,
    ) -> CellId {
        let name = name.into();
        self.add_cell(|id| {
            let mut cell = Cell::new(id, name, cell_type);
            cell.set_port("A", a);
            cell.set_port("B", b);
            cell.set_port("Y", y);
            cell.fix_widths();
            cell
        })
    }

    /// Removes a cell, returning it.
    pub fn remove_cell(&mut self, id: CellId) -> Option<Cell> {
        self.cells.remove(id)
    }

    /// Returns a live cell.
    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    /// Mutable variant of [`cell`](Self::cell).
    pub fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        self.cells.get_mut(id)
    }

    /// Finds a live cell by instance name.
    pub fn cell_by_name(&self, name: &str) -> Option<&Cell> {
        self.cells.values().find(|c| c.name == name)
    }

    /// Iterates over live cells in ID order.
    pub fn live_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Returns `true` if the module still contains behavioral processes.
    pub fn has_processes(&self) -> bool {
        !self.processes.is_empty()
    }

    /// Returns a fresh cell name with the given prefix.
    pub fn fresh_name(&self, prefix: &str) -> String {
        let mut n = self.cells.len();
        loop {
            let candidate = format!("{prefix}${n}");
            if self.cell_by_name(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }
}
