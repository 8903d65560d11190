//! Active selection: which modules and cells passes operate on.

use crate::ids::CellId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The set of modules and cells a pass should visit.
///
/// Module sets are keyed by name, matching how selections are written on a
/// pass command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    /// Everything in the design.
    #[default]
    All,
    /// Every cell of the named modules.
    Modules(BTreeSet<String>),
    /// Only the listed cells, per module name.
    Cells(BTreeMap<String, BTreeSet<CellId>>),
}

impl Selection {
    /// Returns `true` if any part of `module` is selected.
    pub fn selects_module(&self, module: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Modules(set) => set.contains(module),
            Selection::Cells(map) => map.get(module).is_some_and(|s| !s.is_empty()),
        }
    }

    /// Returns `true` if `cell` of `module` is selected.
    pub fn selects_cell(&self, module: &str, cell: CellId) -> bool {
        match self {
            Selection::All => true,
            Selection::Modules(set) => set.contains(module),
            Selection::Cells(map) => map.get(module).is_some_and(|s| s.contains(&cell)),
        }
    }

    /// Builds a cell selection from `(module, cell)` pairs.
    pub fn from_cells<'a>(cells: impl IntoIterator<Item = (&'a str, CellId)>) -> Self {
        let mut map: BTreeMap<String, BTreeSet<CellId>> = BTreeMap::new();
        for (module, cell) in cells {
            map.entry(module.to_string()).or_default().insert(cell);
        }
        Selection::Cells(map)
    }
}
