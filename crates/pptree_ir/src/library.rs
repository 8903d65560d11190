//! Hardware-description files ingested into the design.
//!
//! The host does not elaborate ingested files; it records which modules
//! each file defines so that scoped replacement can find a map module for a
//! cell type.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A module header scanned from an ingested file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryModule {
    /// The module name.
    pub name: String,
    /// Cell types this module implements when used as a techmap rule.
    #[serde(default)]
    pub celltypes: Vec<String>,
}

impl LibraryModule {
    /// Returns `true` if this module may replace a cell of type `cell_type`.
    ///
    /// A module without a `techmap_celltype` annotation matches the cell type
    /// equal to its own name.
    pub fn maps(&self, cell_type: &str) -> bool {
        if self.celltypes.is_empty() {
            self.name == cell_type
        } else {
            self.celltypes.iter().any(|t| t == cell_type)
        }
    }
}

/// One ingested file and the modules it defines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryFile {
    /// The path the file was read from.
    pub path: PathBuf,
    /// Modules defined in the file, in file order.
    pub modules: Vec<LibraryModule>,
}

impl LibraryFile {
    /// Returns the first module that can replace `cell_type`.
    pub fn find_map(&self, cell_type: &str) -> Option<&LibraryModule> {
        self.modules.iter().find(|m| m.maps(cell_type))
    }
}
