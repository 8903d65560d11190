//! Rewrite driver.
//!
//! One pass runs through the states `Idle → Saved → Canonicalized →
//! Restored → Done`, ending in `Failed` if canonicalization itself fails or
//! the context is run a second time:
//!
//! 1. Modules with processes are skipped.
//! 2. Every selected `$add`/`$sub` carrying `pptrees_alu` has its attributes
//!    saved under the source location of its canonical cell.
//! 3. `alumacc` runs over exactly the saved cells and their carry partners.
//! 4. New `$alu` cells whose source location has a snapshot get it back.
//! 5. Each restored cell is regenerated and spliced in with `read_verilog`,
//!    `select <module>/<cell>` and `techmap`. Cells sharing a key are spliced
//!    one at a time.
//!
//! Failures in step 5 are isolated to their cell.

use crate::codes::{
    E_ARTIFACT_MISSING, E_BAD_TRANSFORM_ATTR, E_HOST_PASS, E_MAPS_FAILED, E_TOOL_FAILED,
    W_KEY_COLLISION, W_MODULE_SKIPPED, W_NO_SRC,
};
use crate::error::RewriteError;
use crate::generator::{GenerationMode, GenerationResult, Generator};
use crate::invocation::ToolRunner;
use crate::neighbor::find_canonical_cell;
use crate::options::RewriteOptions;
use crate::request::{GenerationRequest, TransformSequence};
use crate::store::{AttributeStore, SaveOutcome};
use log::{debug, error, info, warn};
use pptree_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use pptree_host::{quote_arg, PassHost};
use pptree_ir::{Cell, CellId, CellType, Design, ModuleId, Selection};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Marks a cell for tree regeneration.
pub const ATTR_MARKER: &str = "pptrees_alu";
/// Per-cell starting topology.
pub const ATTR_BASE: &str = "pptrees_base";
/// Per-cell transform sequence, in the generator encoding.
pub const ATTR_TRANSFORMS: &str = "pptrees_transforms";
/// Per-cell mapping strategy.
pub const ATTR_MAPPING: &str = "pptrees_mapping";

/// Pass progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PassState {
    /// Nothing done yet.
    Idle,
    /// Attributes captured.
    Saved,
    /// Canonicalization ran.
    Canonicalized,
    /// Attributes re-associated.
    Restored,
    /// Every restored cell processed.
    Done,
    /// Canonicalization or pass setup failed.
    Failed,
}

/// A cell that was restored but could not be rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellFailure {
    /// Module name.
    pub module: String,
    /// Cell name.
    pub cell: String,
    /// Source-location key.
    pub src: String,
    /// Diagnostic code, such as `E201`.
    pub code: String,
    /// What went wrong.
    pub reason: String,
}

/// Outcome of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    /// Modules skipped because they contain processes.
    pub skipped_modules: Vec<String>,
    /// Marked cells whose attributes were saved.
    pub saved: usize,
    /// Canonicalized cells that received a snapshot.
    pub restored: usize,
    /// Cells replaced by a generated tree.
    pub rewritten: usize,
    /// Restored cells left unreplaced.
    pub failed: Vec<CellFailure>,
    /// Whether the mapping library was generated and ingested.
    pub maps_ingested: bool,
    /// Working directories kept on request.
    pub kept_dirs: Vec<PathBuf>,
}

/// A restored cell awaiting regeneration.
#[derive(Debug, Clone)]
struct Target {
    module: ModuleId,
    cell: CellId,
    key: String,
}

/// Pass-scoped state: the attribute store, the state machine and the report.
pub struct RewriteContext<'o> {
    options: &'o RewriteOptions,
    store: AttributeStore,
    state: PassState,
    report: RewriteReport,
    maps: Option<GenerationResult>,
}

impl<'o> RewriteContext<'o> {
    /// Creates an idle context.
    pub fn new(options: &'o RewriteOptions) -> Self {
        Self {
            options,
            store: AttributeStore::new(),
            state: PassState::Idle,
            report: RewriteReport::default(),
            maps: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> PassState {
        self.state
    }

    /// The attribute store.
    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    fn advance(&mut self, next: PassState) {
        debug!("rewrite: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Runs the pass on `design`.
    ///
    /// Returns `Err` only for bad arguments and for a failed
    /// canonicalization; per-cell problems are reported through `sink` and
    /// [`RewriteReport::failed`]. The design's selection is the same on
    /// return as on entry.
    pub fn run<R: ToolRunner>(
        &mut self,
        design: &mut Design,
        host: &mut dyn PassHost,
        generator: &mut Generator<R>,
        sink: &DiagnosticSink,
    ) -> Result<RewriteReport, RewriteError> {
        if self.state != PassState::Idle {
            let err = RewriteError::Internal(format!(
                "rewrite context reused in state {:?}",
                self.state
            ));
            self.advance(PassState::Failed);
            return Err(err);
        }
        for name in &self.options.modules {
            if design.module_by_name(name).is_none() {
                return Err(RewriteError::Argument(format!("no module named `{name}`")));
            }
        }

        let entry_selection = design.selection.clone();
        if !self.options.modules.is_empty() {
            design.selection = Selection::Modules(self.options.modules.iter().cloned().collect());
        }
        let result = self.run_stages(design, host, generator, sink);
        design.selection = entry_selection;

        match result {
            Ok(()) => {
                self.advance(PassState::Done);
                Ok(std::mem::take(&mut self.report))
            }
            Err(err) => {
                self.advance(PassState::Failed);
                Err(err)
            }
        }
    }

    fn run_stages<R: ToolRunner>(
        &mut self,
        design: &mut Design,
        host: &mut dyn PassHost,
        generator: &mut Generator<R>,
        sink: &DiagnosticSink,
    ) -> Result<(), RewriteError> {
        let pass_selection = design.selection.clone();
        let modules = self.active_modules(design, sink);

        let scope = self.save(design, &modules, sink);
        self.advance(PassState::Saved);
        if self.store.is_empty() {
            info!("rewrite: no marked adders");
            return Ok(());
        }

        if self.options.emit_maps {
            self.ingest_maps(design, host, generator, sink);
        }

        let existing = alu_cells(design, &modules);
        design.selection = Selection::from_cells(scope.iter().map(|(m, c)| (m.as_str(), *c)));
        let canonicalized = host.call(design, "alumacc", sink);
        design.selection = pass_selection.clone();
        canonicalized?;
        self.advance(PassState::Canonicalized);

        let targets = self.restore(design, &modules, &existing);
        self.advance(PassState::Restored);

        for target in targets {
            match self.rewrite_cell(design, host, generator, sink, &target) {
                Ok(kept) => {
                    self.report.rewritten += 1;
                    self.report.kept_dirs.extend(kept);
                }
                Err(failure) => self.report.failed.push(failure),
            }
            design.selection = pass_selection.clone();
        }

        if let Some(maps) = self.maps.take() {
            if self.options.keep_temp_dirs {
                self.report.kept_dirs.push(maps.keep());
            }
        }
        Ok(())
    }

    fn active_modules(&mut self, design: &Design, sink: &DiagnosticSink) -> Vec<ModuleId> {
        let mut active = Vec::new();
        for id in design.selected_modules() {
            let Some(module) = design.module(id) else {
                continue;
            };
            if module.has_processes() {
                warn!("rewrite: skipping module `{}` with processes", module.name);
                sink.emit(
                    Diagnostic::warning(
                        W_MODULE_SKIPPED,
                        format!("module `{}` contains processes and was skipped", module.name),
                    )
                    .with_help("run `proc` before this pass"),
                );
                self.report.skipped_modules.push(module.name.clone());
            } else {
                active.push(id);
            }
        }
        active
    }

    /// Saves marked cells and returns the canonicalization scope.
    fn save(&mut self, design: &Design, modules: &[ModuleId], sink: &DiagnosticSink) -> Vec<(String, CellId)> {
        let mut groups: Vec<(ModuleId, String, BTreeMap<CellId, CellId>, BTreeMap<CellId, Option<String>>)> =
            Vec::new();
        let mut marked: BTreeSet<(ModuleId, CellId)> = BTreeSet::new();

        for &mid in modules {
            let Some(module) = design.module(mid) else {
                continue;
            };
            let mut canon = BTreeMap::new();
            let mut keys = BTreeMap::new();
            for cell in design.selected_cells(module).filter(|c| c.cell_type.is_additive()) {
                let canonical = find_canonical_cell(design, module, cell);
                canon.insert(cell.id, canonical.id);
                keys.insert(canonical.id, canonical.src.clone());
                if !cell.has_flag(ATTR_MARKER) {
                    continue;
                }
                let Some(key) = canonical.src.as_deref() else {
                    warn!("rewrite: marked cell `{}` has no source location", cell.name);
                    sink.emit(Diagnostic::warning(
                        W_NO_SRC,
                        format!(
                            "marked cell `{}` in `{}` has no source location and is not rewritten",
                            cell.name, module.name
                        ),
                    ));
                    continue;
                };
                match self.store.save(key, &cell.attributes) {
                    SaveOutcome::Inserted | SaveOutcome::Duplicate => {
                        debug!("rewrite: saved `{}` under {key}", cell.name);
                        self.report.saved += 1;
                        marked.insert((mid, canonical.id));
                    }
                    SaveOutcome::Collision => {
                        warn!("rewrite: conflicting attributes under {key}");
                        sink.emit(
                            Diagnostic::warning(
                                W_KEY_COLLISION,
                                format!("marked cells with different attributes share source location `{key}`"),
                            )
                            .with_location(key)
                            .with_note("cells with this source location are left unchanged"),
                        );
                    }
                    SaveOutcome::Poisoned => {}
                }
            }
            groups.push((mid, module.name.clone(), canon, keys));
        }

        let mut scope = Vec::new();
        for (mid, name, canon, keys) in &groups {
            for (&cell, &canonical) in canon {
                let restorable = keys
                    .get(&canonical)
                    .and_then(Option::as_deref)
                    .is_some_and(|key| self.store.get(key).is_some());
                if marked.contains(&(*mid, canonical)) && restorable {
                    scope.push((name.clone(), cell));
                }
            }
        }
        scope
    }

    fn ingest_maps<R: ToolRunner>(
        &mut self,
        design: &mut Design,
        host: &mut dyn PassHost,
        generator: &mut Generator<R>,
        sink: &DiagnosticSink,
    ) {
        let request = GenerationRequest::maps(self.options.mapping.clone());
        let result = match generator.invoke(&request, GenerationMode::MapsOnly) {
            Ok(result) => result,
            Err(err) => {
                error!("rewrite: map generation failed: {err}");
                sink.emit(with_tool_notes(
                    Diagnostic::error(E_MAPS_FAILED, format!("map generation failed: {err}")),
                    &err,
                ));
                return;
            }
        };
        let files: Vec<PathBuf> = std::iter::once(result.artifact.clone())
            .chain(result.library.clone())
            .collect();
        for file in &files {
            if let Err(err) = host.call(design, &read_command(file), sink) {
                error!("rewrite: cannot ingest {}: {err}", file.display());
                sink.emit(Diagnostic::error(E_MAPS_FAILED, err.to_string()));
                self.maps = Some(result);
                return;
            }
        }
        self.report.maps_ingested = true;
        self.maps = Some(result);
    }

    fn restore(
        &mut self,
        design: &mut Design,
        modules: &[ModuleId],
        existing: &BTreeSet<(ModuleId, CellId)>,
    ) -> Vec<Target> {
        let mut targets = Vec::new();
        for &mid in modules {
            let Some(module) = design.module_mut(mid) else {
                continue;
            };
            for (id, cell) in module.cells.iter_mut() {
                if cell.cell_type != CellType::Alu || existing.contains(&(mid, id)) {
                    continue;
                }
                let Some(key) = cell.src.clone() else {
                    continue;
                };
                if let Some(snapshot) = self.store.get(&key) {
                    cell.attributes = snapshot.clone();
                    debug!("rewrite: restored attributes on `{}` from {key}", cell.name);
                    targets.push(Target { module: mid, cell: id, key });
                }
            }
        }
        self.report.restored = targets.len();
        targets
    }

    fn rewrite_cell<R: ToolRunner>(
        &self,
        design: &mut Design,
        host: &mut dyn PassHost,
        generator: &mut Generator<R>,
        sink: &DiagnosticSink,
        target: &Target,
    ) -> Result<Option<PathBuf>, CellFailure> {
        let (module_name, cell) = match design
            .module(target.module)
            .and_then(|m| m.cell(target.cell).map(|c| (m.name.clone(), c.clone())))
        {
            Some(found) => found,
            None => {
                return Err(self.fail(sink, "?", "?", target, E_HOST_PASS, "cell disappeared after canonicalization".into()));
            }
        };
        let fail = |ctx: &Self, code: DiagnosticCode, reason: String, diag: Option<Diagnostic>| {
            ctx.fail_with(sink, &module_name, &cell.name, target, code, reason, diag)
        };

        let request = derive_request(&cell, self.options)
            .map_err(|reason| fail(self, E_BAD_TRANSFORM_ATTR, reason, None))?;
        info!(
            "rewrite: `{}` in `{}`: width {} start {} transforms '{}' mapping {}",
            cell.name,
            module_name,
            request.width(),
            request.start_topology,
            request.transforms,
            request.mapping
        );

        let result = generator
            .invoke(&request, GenerationMode::TreeGeneration)
            .map_err(|err| {
                let code = match err {
                    RewriteError::MissingArtifact { .. } => E_ARTIFACT_MISSING,
                    _ => E_TOOL_FAILED,
                };
                let diag = with_tool_notes(Diagnostic::error(code, err.to_string()), &err);
                fail(self, code, err.to_string(), Some(diag))
            })?;

        let select = format!("select {}", quote_arg(&format!("{module_name}/{}", cell.name)));
        let techmap = format!("techmap -map {} %", quote_arg(&result.artifact.display().to_string()));
        for command in [read_command(&result.artifact), select, techmap] {
            if let Err(err) = host.call(design, &command, sink) {
                let reason = format!("`{command}` failed: {err}");
                return Err(fail(self, E_HOST_PASS, reason, None));
            }
        }
        info!("rewrite: replaced `{}` with {}", cell.name, result.top_module.as_deref().unwrap_or("?"));

        if self.options.keep_temp_dirs {
            Ok(Some(result.keep()))
        } else {
            Ok(None)
        }
    }

    fn fail(
        &self,
        sink: &DiagnosticSink,
        module: &str,
        cell: &str,
        target: &Target,
        code: DiagnosticCode,
        reason: String,
    ) -> CellFailure {
        self.fail_with(sink, module, cell, target, code, reason, None)
    }

    #[allow(clippy::too_many_arguments)]
    fn fail_with(
        &self,
        sink: &DiagnosticSink,
        module: &str,
        cell: &str,
        target: &Target,
        code: DiagnosticCode,
        reason: String,
        diag: Option<Diagnostic>,
    ) -> CellFailure {
        error!("rewrite: `{cell}` in `{module}` left unreplaced: {reason}");
        let diag = diag
            .unwrap_or_else(|| Diagnostic::error(code, reason.clone()))
            .with_location(target.key.clone())
            .with_note(format!("cell `{cell}` in module `{module}` keeps its canonical form"));
        sink.emit(diag);
        CellFailure {
            module: module.to_string(),
            cell: cell.to_string(),
            src: target.key.clone(),
            code: code.to_string(),
            reason,
        }
    }
}

/// Runs one rewrite pass with a fresh [`RewriteContext`].
pub fn run_rewrite<R: ToolRunner>(
    design: &mut Design,
    host: &mut dyn PassHost,
    generator: &mut Generator<R>,
    options: &RewriteOptions,
    sink: &DiagnosticSink,
) -> Result<RewriteReport, RewriteError> {
    RewriteContext::new(options).run(design, host, generator, sink)
}

/// Builds the generation request for a restored cell.
///
/// Width is the larger of `A_WIDTH` and `B_WIDTH`; attributes override the
/// pass options for topology, transforms and mapping.
pub fn derive_request(cell: &Cell, options: &RewriteOptions) -> Result<GenerationRequest, String> {
    let width = ["A_WIDTH", "B_WIDTH"]
        .iter()
        .filter_map(|p| cell.param_int(p))
        .max()
        .and_then(|w| u32::try_from(w).ok())
        .filter(|w| *w > 0)
        .unwrap_or(options.width);
    let start = cell.attr_str(ATTR_BASE).unwrap_or(&options.start);
    let transforms = match cell.attr_str(ATTR_TRANSFORMS) {
        Some(text) => text
            .parse::<TransformSequence>()
            .map_err(|e| format!("attribute {ATTR_TRANSFORMS} = \"{text}\": {e}"))?,
        None => options.transforms.clone(),
    };
    let mapping = cell.attr_str(ATTR_MAPPING).unwrap_or(&options.mapping);
    GenerationRequest::new(width, start, transforms, mapping).map_err(|e| e.to_string())
}

fn read_command(path: &Path) -> String {
    format!("read_verilog -sv {}", quote_arg(&path.display().to_string()))
}

fn alu_cells(design: &Design, modules: &[ModuleId]) -> BTreeSet<(ModuleId, CellId)> {
    modules
        .iter()
        .filter_map(|&mid| design.module(mid).map(|m| (mid, m)))
        .flat_map(|(mid, m)| {
            m.live_cells()
                .filter(|c| c.cell_type == CellType::Alu)
                .map(move |c| (mid, c.id))
        })
        .collect()
}

fn with_tool_notes(diag: Diagnostic, err: &RewriteError) -> Diagnostic {
    match err {
        RewriteError::ExternalTool(tool) => {
            let diag = diag.with_note(format!("command: {}", tool.command));
            tool.tail
                .iter()
                .rev()
                .take(5)
                .rev()
                .fold(diag, |d, line| d.with_note(format!("output: {line}")))
        }
        RewriteError::MissingArtifact { command, .. } => {
            diag.with_note(format!("command: {command}"))
        }
        _ => diag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pptree_ir::ConstValue;

    fn alu(widths: (i64, i64)) -> Cell {
        let mut cell = Cell::new(CellId::from_raw(0), "$alu$1", CellType::Alu);
        cell.params.insert("A_WIDTH".into(), ConstValue::Int(widths.0));
        cell.params.insert("B_WIDTH".into(), ConstValue::Int(widths.1));
        cell
    }

    #[test]
    fn request_width_is_max_operand_width() {
        let req = derive_request(&alu((8, 12)), &RewriteOptions::default()).unwrap();
        assert_eq!(req.width(), 12);
    }

    #[test]
    fn request_falls_back_to_options() {
        let mut cell = alu((0, 0));
        cell.params.clear();
        let opts = RewriteOptions { width: 24, ..RewriteOptions::default() };
        let req = derive_request(&cell, &opts).unwrap();
        assert_eq!(req.width(), 24);
        assert_eq!(req.start_topology, "ripple-carry");
        assert!(req.transforms.is_empty());
        assert_eq!(req.mapping, "behavioral");
    }

    #[test]
    fn request_attributes_override_options() {
        let mut cell = alu((16, 16));
        cell.attributes.insert(ATTR_BASE.into(), "kogge-stone".into());
        cell.attributes.insert(ATTR_TRANSFORMS.into(), "_LF@6".into());
        cell.attributes.insert(ATTR_MAPPING.into(), "sklansky".into());
        let req = derive_request(&cell, &RewriteOptions::default()).unwrap();
        assert_eq!(req.start_topology, "kogge-stone");
        assert_eq!(req.transforms.to_string(), "_LF@6");
        assert_eq!(req.mapping, "sklansky");
    }

    #[test]
    fn malformed_transform_attribute() {
        let mut cell = alu((4, 4));
        cell.attributes.insert(ATTR_TRANSFORMS.into(), "_LF@six".into());
        let err = derive_request(&cell, &RewriteOptions::default()).unwrap_err();
        assert!(err.contains("pptrees_transforms"));
    }

    #[test]
    fn alu_snapshot_ignores_other_types() {
        let mut d = Design::new();
        let mid = d.add_module("top");
        let m = d.module_mut(mid).unwrap();
        let s = m.add_signal("s", 4);
        let a = m.add_binary("a", CellType::Alu, s.clone(), s.clone(), s.clone());
        m.add_binary("b", CellType::Add, s.clone(), s.clone(), s);
        let set = alu_cells(&d, &[mid]);
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![(mid, a)]);
    }
}
