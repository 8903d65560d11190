//! `select`: set the active selection.
//!
//! Supported patterns: `-clear` (everything), `a:src=<key>` (live cells whose
//! source location equals `key`, across all modules), `<module>` and
//! `<module>/<cell>`.

use crate::error::HostError;
use crate::host::HostPass;
use crate::W_EMPTY_SELECTION;
use log::warn;
use pptree_diagnostics::{Diagnostic, DiagnosticSink};
use pptree_ir::{Design, Selection};

/// The `select` pass.
pub struct SelectPass;

impl HostPass for SelectPass {
    fn name(&self) -> &'static str {
        "select"
    }

    fn execute(
        &self,
        args: &[&str],
        design: &mut Design,
        sink: &DiagnosticSink,
    ) -> Result<(), HostError> {
        let [pattern] = args else {
            return Err(HostError::bad_args(self.name(), "expected exactly one pattern"));
        };
        let selection = if *pattern == "-clear" {
            Selection::All
        } else if let Some(key) = pattern.strip_prefix("a:src=") {
            by_src(design, key)
        } else if let Some((module, cell)) = pattern.split_once('/') {
            let m = design.module_by_name(module).ok_or_else(|| {
                HostError::bad_args(self.name(), format!("no module `{module}`"))
            })?;
            let c = m.cell_by_name(cell).ok_or_else(|| {
                HostError::bad_args(self.name(), format!("no cell `{cell}` in `{module}`"))
            })?;
            Selection::from_cells([(m.name.as_str(), c.id)])
        } else {
            if design.module_by_name(pattern).is_none() {
                return Err(HostError::bad_args(self.name(), format!("no module `{pattern}`")));
            }
            Selection::Modules([pattern.to_string()].into_iter().collect())
        };

        if matches!(&selection, Selection::Cells(map) if map.is_empty()) {
            warn!("select: `{pattern}` matched nothing");
            sink.emit(Diagnostic::warning(
                W_EMPTY_SELECTION,
                format!("selection `{pattern}` is empty"),
            ));
        }
        design.selection = selection;
        Ok(())
    }
}

fn by_src(design: &Design, key: &str) -> Selection {
    Selection::from_cells(design.modules.values().flat_map(move |m| {
        m.live_cells()
            .filter(move |c| c.src.as_deref() == Some(key))
            .map(move |c| (m.name.as_str(), c.id))
    }))
}
