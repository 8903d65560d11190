//! `techmap -map <file> [%]`: scoped structural replacement.
//!
//! Every selected live cell whose type is mapped by a module in `<file>`
//! becomes an instance of that module. The replacement keeps the cell's ID,
//! name, connections, parameters, attributes and source location, so the
//! port set seen by the rest of the module is unchanged.

use crate::error::HostError;
use crate::host::HostPass;
use crate::passes::read_verilog::ingest;
use log::debug;
use pptree_diagnostics::DiagnosticSink;
use pptree_ir::{CellId, CellType, Design, ModuleId};
use std::path::Path;

/// The `techmap` pass.
pub struct TechmapPass;

impl HostPass for TechmapPass {
    fn name(&self) -> &'static str {
        "techmap"
    }

    fn execute(
        &self,
        args: &[&str],
        design: &mut Design,
        sink: &DiagnosticSink,
    ) -> Result<(), HostError> {
        let mut map = None;
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match *arg {
                "-map" => {
                    let path = iter
                        .next()
                        .ok_or_else(|| HostError::bad_args(self.name(), "-map needs a file"))?;
                    map = Some(Path::new(*path));
                }
                "%" => {}
                other => {
                    return Err(HostError::bad_args(
                        self.name(),
                        format!("unexpected argument `{other}`"),
                    ))
                }
            }
        }
        let map = map.ok_or_else(|| HostError::bad_args(self.name(), "missing -map"))?;
        if design.library_file(map).is_none() {
            ingest(design, map, sink)?;
        }
        let replaced = replace_selected(design, map);
        if replaced == 0 {
            return Err(HostError::NoMatchingMapModule {
                path: map.to_path_buf(),
            });
        }
        debug!("techmap: replaced {replaced} cell(s) from `{}`", map.display());
        Ok(())
    }
}

fn replace_selected(design: &mut Design, map: &Path) -> usize {
    let mut plan: Vec<(ModuleId, CellId, String)> = Vec::new();
    if let Some(file) = design.library_file(map) {
        for module_id in design.selected_modules() {
            let Some(module) = design.module(module_id) else {
                continue;
            };
            for cell in design.selected_cells(module) {
                if let Some(rule) = file.find_map(&cell.cell_type.to_string()) {
                    plan.push((module_id, cell.id, rule.name.clone()));
                }
            }
        }
    }
    let count = plan.len();
    for (module_id, cell_id, target) in plan {
        if let Some(cell) = design.module_mut(module_id).and_then(|m| m.cell_mut(cell_id)) {
            cell.cell_type = CellType::Instance(target);
        }
    }
    count
}
