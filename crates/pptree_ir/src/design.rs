//! The top-level design container.

use crate::arena::Arena;
use crate::cell::Cell;
use crate::ids::{CellId, ModuleId};
use crate::library::LibraryFile;
use crate::module::Module;
use crate::selection::Selection;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A design: modules, the active selection, and ingested library files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Design {
    /// All modules.
    #[serde(default)]
    pub modules: Arena<ModuleId, Module>,
    /// The top module, if one has been designated.
    #[serde(default)]
    pub top: Option<ModuleId>,
    /// The active selection.
    #[serde(default)]
    pub selection: Selection,
    /// Ingested hardware-description files, in ingestion order.
    #[serde(default)]
    pub library: Vec<LibraryFile>,
}

impl Design {
    /// Creates an empty design.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an empty module and returns its ID.
    pub fn add_module(&mut self, name: impl Into<String>) -> ModuleId {
        let name = name.into();
        self.modules.alloc_with(|id| Module::new(id, name))
    }

    /// Returns a module by ID.
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id)
    }

    /// Mutable variant of [`module`](Self::module).
    pub fn module_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(id)
    }

    /// Finds a module by name.
    pub fn module_by_name(&self, name: &str) -> Option<&Module> {
        self.modules.values().find(|m| m.name == name)
    }

    /// IDs of modules with at least one selected part, in ID order.
    pub fn selected_modules(&self) -> Vec<ModuleId> {
        self.modules
            .iter()
            .filter(|(_, m)| self.selection.selects_module(&m.name))
            .map(|(id, _)| id)
            .collect()
    }

    /// Live selected cells of `module`, in ID order.
    pub fn selected_cells<'a>(&'a self, module: &'a Module) -> impl Iterator<Item = &'a Cell> + 'a {
        module
            .live_cells()
            .filter(move |c| self.selection.selects_cell(&module.name, c.id))
    }

    /// IDs of live selected cells of the module `id`.
    pub fn selected_cell_ids(&self, id: ModuleId) -> Vec<CellId> {
        match self.module(id) {
            Some(m) => self.selected_cells(m).map(|c| c.id).collect(),
            None => Vec::new(),
        }
    }

    /// Returns the ingested file read from `path`, if any.
    pub fn library_file(&self, path: &Path) -> Option<&LibraryFile> {
        self.library.iter().find(|f| f.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellType;
    use crate::library::LibraryModule;

    fn two_module_design() -> Design {
        let mut d = Design::new();
        for name in ["top", "sub"] {
            let id = d.add_module(name);
            let m = d.module_mut(id).unwrap();
            let s = m.add_signal("s", 4);
            m.add_binary("add", CellType::Add, s.clone(), s.clone(), s.clone());
            m.add_binary("sub", CellType::Sub, s.clone(), s.clone(), s);
        }
        d
    }

    #[test]
    fn default_selection_is_everything() {
        let d = two_module_design();
        assert_eq!(d.selected_modules().len(), 2);
        let top = d.module_by_name("top").unwrap();
        assert_eq!(d.selected_cells(top).count(), 2);
    }

    #[test]
    fn cell_selection_filters() {
        let mut d = two_module_design();
        let top = d.module_by_name("top").unwrap();
        let top_id = top.id;
        let add = top.cell_by_name("add").unwrap().id;
        d.selection = Selection::from_cells([("top", add)]);
        assert_eq!(d.selected_modules(), vec![top_id]);
        assert_eq!(d.selected_cell_ids(top_id), vec![add]);
    }

    #[test]
    fn library_lookup_by_path() {
        let mut d = Design::new();
        d.library.push(LibraryFile {
            path: "/tmp/x/pptrees_alu.v".into(),
            modules: vec![LibraryModule { name: "m".into(), celltypes: vec![] }],
        });
        assert!(d.library_file(Path::new("/tmp/x/pptrees_alu.v")).is_some());
        assert!(d.library_file(Path::new("/tmp/y.v")).is_none());
    }

    #[test]
    fn json_roundtrip() {
        let d = two_module_design();
        let json = serde_json::to_string(&d).unwrap();
        let back: Design = serde_json::from_str(&json).unwrap();
        let top = back.module_by_name("top").unwrap();
        assert_eq!(top.live_cells().count(), 2);
        assert_eq!(back.selection, Selection::All);
    }
}
