//! End-to-end runs of the rewrite pass against the native host with a
//! scripted generator.

use pptree_diagnostics::DiagnosticSink;
use pptree_host::{HostError, NativeHost, PassHost};
use pptree_ir::{
    CellId, CellType, ConstValue, Design, Module, PortDirection, Process, ProcessKind, Selection,
};
use pptree_rewrite::codes::{
    E_BAD_TRANSFORM_ATTR, E_MAPS_FAILED, E_TOOL_FAILED, W_KEY_COLLISION, W_MODULE_SKIPPED, W_NO_SRC,
};
use pptree_rewrite::driver::{ATTR_BASE, ATTR_MARKER, ATTR_TRANSFORMS};
use pptree_rewrite::{
    run_rewrite, Generator, GeneratorSettings, Invocation, OutputFilter, PassState, RewriteContext,
    RewriteError, RewriteOptions, ToolRunner,
};
use std::collections::VecDeque;
use std::io;

/// Writes what the real generator would into the invocation's directory.
#[derive(Default)]
struct FakeGenerator {
    /// Exit codes for tree runs, in order; 0 once exhausted.
    tree_codes: VecDeque<i32>,
    /// Exit code for the maps run.
    maps_code: i32,
    calls: Vec<Invocation>,
}

fn quoted_after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let start = text.find(marker)? + marker.len();
    let rest = &text[start..];
    rest.find('\'').map(|end| &rest[..end])
}

impl ToolRunner for FakeGenerator {
    fn run(&mut self, invocation: &Invocation, filter: &mut OutputFilter) -> io::Result<i32> {
        self.calls.push(invocation.clone());
        let dir = invocation.cwd.clone().expect("generator runs in its workdir");
        let program = invocation.args.last().cloned().unwrap_or_default();
        if program.contains("yosys_map") {
            if self.maps_code != 0 {
                filter.feed_str("Traceback: no such mapping\n");
                return Ok(self.maps_code);
            }
            filter.feed_str("writing maps\n");
            std::fs::write(
                dir.join("behavioral_map.v"),
                "(* techmap_celltype = \"$lcu\" *)\nmodule _lcu_map();\nendmodule\n",
            )?;
            std::fs::write(dir.join("modules.v"), "module black_cell();\nendmodule\n")?;
            return Ok(0);
        }
        let code = self.tree_codes.pop_front().unwrap_or(0);
        filter.feed_str("\x1b[1mbuilding tree\x1b[0m\n");
        if code != 0 {
            filter.feed_str("Traceback: unknown transform\n");
            return Ok(code);
        }
        let top = quoted_after(&program, "top_module='").unwrap_or("_x_adder");
        std::fs::write(
            dir.join("pptrees_alu.v"),
            format!("(* techmap_celltype = \"$alu\" *)\nmodule {top}(A, B, CI, BI, X, Y, CO);\nendmodule\n"),
        )?;
        Ok(0)
    }
}

fn generator(runner: FakeGenerator) -> Generator<FakeGenerator> {
    let settings = GeneratorSettings {
        python: "python3".into(),
        module: "pptrees.yosys_alu".into(),
        class: "yosys_alu".into(),
        script: None,
    };
    Generator::new(settings, runner)
}

/// `top` with an 8-bit `y = a + b`, optionally marked.
fn adder_design(marked: bool) -> (Design, CellId) {
    let mut d = Design::new();
    let mid = d.add_module("top");
    let m = d.module_mut(mid).unwrap();
    let a = m.add_port("a", PortDirection::Input, 8);
    let b = m.add_port("b", PortDirection::Input, 8);
    let y = m.add_port("y", PortDirection::Output, 8);
    let id = m.add_binary("$add$top.v:3$1", CellType::Add, a, b, y);
    let cell = m.cell_mut(id).unwrap();
    cell.src = Some("top.v:3.12-3.17".into());
    if marked {
        cell.attributes.insert(ATTR_MARKER.into(), ConstValue::Int(1));
        cell.attributes.insert(ATTR_BASE.into(), "ripple-carry".into());
    }
    (d, id)
}

/// Adds a marked `width`-bit `z = c + d` with its own ports.
fn add_marked(m: &mut Module, name: &str, width: u32, src: Option<&str>) -> CellId {
    let c = m.add_port(format!("{name}_c"), PortDirection::Input, width);
    let d = m.add_port(format!("{name}_d"), PortDirection::Input, width);
    let z = m.add_port(format!("{name}_z"), PortDirection::Output, width);
    let id = m.add_binary(name, CellType::Add, c, d, z);
    let cell = m.cell_mut(id).unwrap();
    cell.src = src.map(str::to_string);
    cell.attributes.insert(ATTR_MARKER.into(), ConstValue::Int(1));
    id
}

fn top_mut(d: &mut Design) -> &mut Module {
    let mid = d.module_by_name("top").unwrap().id;
    d.module_mut(mid).unwrap()
}

fn requested_trees(gen: &Generator<FakeGenerator>) -> Vec<String> {
    gen.runner()
        .calls
        .iter()
        .filter_map(|inv| inv.args.last())
        .filter(|program| !program.contains("yosys_map"))
        .cloned()
        .collect()
}

/// Fails every command starting with `refused`, forwarding the rest.
struct RefusingHost {
    inner: NativeHost,
    refused: &'static str,
}

impl PassHost for RefusingHost {
    fn call(&mut self, design: &mut Design, command: &str, sink: &DiagnosticSink) -> Result<(), HostError> {
        if command.split_whitespace().next() == Some(self.refused) {
            return Err(HostError::bad_args(self.refused, "refused"));
        }
        self.inner.call(design, command, sink)
    }
}

fn port_names(design: &Design) -> Vec<String> {
    let m = design.module_by_name("top").unwrap();
    m.ports.values().map(|p| p.name.clone()).collect()
}

#[test]
fn unmarked_cells_are_untouched() {
    let (mut d, id) = adder_design(false);
    let before = d.clone();
    let mut host = NativeHost::new();
    let mut gen = generator(FakeGenerator::default());
    let sink = DiagnosticSink::new();

    let report = run_rewrite(&mut d, &mut host, &mut gen, &RewriteOptions::default(), &sink).unwrap();

    assert_eq!(report.saved, 0);
    assert_eq!(report.rewritten, 0);
    assert_eq!(
        d.module_by_name("top").unwrap().cell(id),
        before.module_by_name("top").unwrap().cell(id)
    );
    assert!(gen.runner().calls.is_empty());
    assert!(host.history().is_empty());
}

#[test]
fn eight_bit_ripple_carry_is_replaced() {
    let (mut d, _) = adder_design(true);
    let ports = port_names(&d);
    let mut host = NativeHost::new();
    let mut gen = generator(FakeGenerator::default());
    let sink = DiagnosticSink::new();

    let report = run_rewrite(&mut d, &mut host, &mut gen, &RewriteOptions::default(), &sink).unwrap();

    assert_eq!(report.saved, 1);
    assert_eq!(report.restored, 1);
    assert_eq!(report.rewritten, 1);
    assert!(report.maps_ingested);
    assert!(report.failed.is_empty());
    assert!(!sink.has_errors());
    assert_eq!(port_names(&d), ports);

    let m = d.module_by_name("top").unwrap();
    let cells: Vec<_> = m.live_cells().collect();
    assert_eq!(cells.len(), 1);
    let tree = cells[0];
    match &tree.cell_type {
        CellType::Instance(name) => assert!(name.starts_with('_') && name.ends_with("_adder")),
        other => panic!("expected generated instance, got {other}"),
    }
    assert_eq!(tree.attr_str(ATTR_BASE), Some("ripple-carry"));
    assert!(tree.has_flag(ATTR_MARKER));
    assert_eq!(tree.src.as_deref(), Some("top.v:3.12-3.17"));

    let program = gen.runner().calls.last().unwrap().args.last().unwrap().clone();
    assert!(program.contains("g=tree(8,'ripple-carry')"));
    assert_eq!(d.selection, Selection::All);
}

#[test]
fn carry_partner_shares_the_tail_snapshot() {
    let mut d = Design::new();
    let mid = d.add_module("top");
    let m = d.module_mut(mid).unwrap();
    let a = m.add_port("a", PortDirection::Input, 8);
    let b = m.add_port("b", PortDirection::Input, 8);
    let ci = m.add_port("ci", PortDirection::Input, 1);
    let y = m.add_port("y", PortDirection::Output, 8);
    let t = m.add_signal("t", 8);
    let head = m.add_binary("head", CellType::Add, a, b, t.clone());
    let tail = m.add_binary("tail", CellType::Add, t, ci, y);
    let h = m.cell_mut(head).unwrap();
    h.src = Some("top.v:4.9-4.14".into());
    h.attributes.insert(ATTR_MARKER.into(), ConstValue::Int(1));
    m.cell_mut(tail).unwrap().src = Some("top.v:4.9-4.19".into());

    let mut host = NativeHost::new();
    let mut gen = generator(FakeGenerator::default());
    let sink = DiagnosticSink::new();
    let report = run_rewrite(&mut d, &mut host, &mut gen, &RewriteOptions::default(), &sink).unwrap();

    assert_eq!(report.rewritten, 1);
    let m = d.module_by_name("top").unwrap();
    let cells: Vec<_> = m.live_cells().collect();
    assert_eq!(cells.len(), 1);
    assert!(cells[0].has_flag(ATTR_MARKER));
    assert_eq!(cells[0].src.as_deref(), Some("top.v:4.9-4.19"));
}

#[test]
fn generator_failure_keeps_canonical_cell_and_continues() {
    let (mut d, _) = adder_design(true);
    let mid = d.module_by_name("top").unwrap().id;
    {
        let m = d.module_mut(mid).unwrap();
        let c = m.add_port("c", PortDirection::Input, 4);
        let z = m.add_port("z", PortDirection::Output, 4);
        let second = m.add_binary("$add$top.v:4$2", CellType::Add, c.clone(), c, z);
        let cell = m.cell_mut(second).unwrap();
        cell.src = Some("top.v:4.12-4.17".into());
        cell.attributes.insert(ATTR_MARKER.into(), ConstValue::Int(1));
    }
    let runner = FakeGenerator {
        tree_codes: VecDeque::from([1]),
        ..FakeGenerator::default()
    };
    let mut host = NativeHost::new();
    let mut gen = generator(runner);
    let sink = DiagnosticSink::new();

    let report = run_rewrite(&mut d, &mut host, &mut gen, &RewriteOptions::default(), &sink).unwrap();

    assert_eq!(report.restored, 2);
    assert_eq!(report.rewritten, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].code, "E201");
    assert_eq!(sink.count_code(E_TOOL_FAILED), 1);

    let m = d.module_by_name("top").unwrap();
    let failed = m
        .live_cells()
        .find(|c| c.src.as_deref() == Some(report.failed[0].src.as_str()))
        .unwrap();
    assert_eq!(failed.cell_type, CellType::Alu);
    assert!(failed.has_flag(ATTR_MARKER));
    assert_eq!(
        m.live_cells().filter(|c| matches!(c.cell_type, CellType::Instance(_))).count(),
        1
    );
}

#[test]
fn conflicting_snapshots_leave_cells_alone() {
    let (mut d, first) = adder_design(true);
    let mid = d.module_by_name("top").unwrap().id;
    let second = {
        let m = d.module_mut(mid).unwrap();
        let c = m.add_port("c", PortDirection::Input, 8);
        let z = m.add_port("z", PortDirection::Output, 8);
        let id = m.add_binary("dup", CellType::Add, c.clone(), c, z);
        let cell = m.cell_mut(id).unwrap();
        cell.src = Some("top.v:3.12-3.17".into());
        cell.attributes.insert(ATTR_MARKER.into(), ConstValue::Int(1));
        cell.attributes.insert(ATTR_BASE.into(), "kogge-stone".into());
        id
    };
    let mut host = NativeHost::new();
    let mut gen = generator(FakeGenerator::default());
    let sink = DiagnosticSink::new();

    let report = run_rewrite(&mut d, &mut host, &mut gen, &RewriteOptions::default(), &sink).unwrap();

    assert_eq!(sink.count_code(W_KEY_COLLISION), 1);
    assert_eq!(report.rewritten, 0);
    let m = d.module_by_name("top").unwrap();
    assert_eq!(m.cell(first).unwrap().cell_type, CellType::Add);
    assert_eq!(m.cell(second).unwrap().cell_type, CellType::Add);
    assert!(gen.runner().calls.is_empty());
}

#[test]
fn module_with_processes_is_skipped_once() {
    let (mut d, id) = adder_design(true);
    let mid = d.module_by_name("top").unwrap().id;
    d.module_mut(mid).unwrap().processes.push(Process {
        name: "$proc$top.v:5$3".into(),
        kind: ProcessKind::Sequential,
        src: Some("top.v:5.3-7.6".into()),
    });
    let mut host = NativeHost::new();
    let mut gen = generator(FakeGenerator::default());
    let sink = DiagnosticSink::new();

    let report = run_rewrite(&mut d, &mut host, &mut gen, &RewriteOptions::default(), &sink).unwrap();

    assert_eq!(sink.count_code(W_MODULE_SKIPPED), 1);
    assert_eq!(report.skipped_modules, vec!["top".to_string()]);
    assert_eq!(d.module_by_name("top").unwrap().cell(id).unwrap().cell_type, CellType::Add);
}

#[test]
fn unknown_module_argument_is_rejected() {
    let (mut d, _) = adder_design(true);
    let options = RewriteOptions::default().apply_args(&["nosuch"]).unwrap();
    let mut host = NativeHost::new();
    let mut gen = generator(FakeGenerator::default());
    let sink = DiagnosticSink::new();

    let err = run_rewrite(&mut d, &mut host, &mut gen, &options, &sink).unwrap_err();
    assert!(matches!(err, RewriteError::Argument(_)));
    assert!(host.history().is_empty());
}

#[test]
fn kept_directories_survive_the_pass() {
    let (mut d, _) = adder_design(true);
    let options = RewriteOptions {
        keep_temp_dirs: true,
        emit_maps: false,
        ..RewriteOptions::default()
    };
    let mut host = NativeHost::new();
    let mut gen = generator(FakeGenerator::default());
    let sink = DiagnosticSink::new();

    let report = run_rewrite(&mut d, &mut host, &mut gen, &options, &sink).unwrap();

    assert!(!report.maps_ingested);
    assert_eq!(report.kept_dirs.len(), 1);
    let dir = &report.kept_dirs[0];
    assert!(dir.join("pptrees_alu.v").is_file());
    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn cells_sharing_a_source_location_get_their_own_trees() {
    let mut d = Design::new();
    let mid = d.add_module("top");
    let m = d.module_mut(mid).unwrap();
    add_marked(m, "narrow", 4, Some("top.v:7.5-7.20"));
    add_marked(m, "wide", 8, Some("top.v:7.5-7.20"));
    let options = RewriteOptions {
        emit_maps: false,
        ..RewriteOptions::default()
    };
    let mut host = NativeHost::new();
    let mut gen = generator(FakeGenerator::default());
    let sink = DiagnosticSink::new();

    let report = run_rewrite(&mut d, &mut host, &mut gen, &options, &sink).unwrap();

    assert_eq!(report.saved, 2);
    assert_eq!(report.rewritten, 2);
    assert!(report.failed.is_empty(), "{:?}", report.failed);
    assert!(!sink.has_errors());

    let trees = requested_trees(&gen);
    assert_eq!(trees.len(), 2);
    assert!(trees.iter().any(|p| p.contains("g=tree(4,")));
    assert!(trees.iter().any(|p| p.contains("g=tree(8,")));

    let m = d.module_by_name("top").unwrap();
    let mut by_width: Vec<(i64, String)> = m
        .live_cells()
        .map(|c| match &c.cell_type {
            CellType::Instance(name) => (c.param_int("A_WIDTH").unwrap(), name.clone()),
            other => panic!("expected generated instance, got {other}"),
        })
        .collect();
    by_width.sort();
    assert_eq!(by_width.len(), 2);
    assert_eq!((by_width[0].0, by_width[1].0), (4, 8));
    assert_ne!(by_width[0].1, by_width[1].1);
}

#[test]
fn marked_cell_without_source_location_is_left_alone() {
    let (mut d, _) = adder_design(true);
    let nosrc = add_marked(top_mut(&mut d), "nosrc", 4, None);
    let before = d.module_by_name("top").unwrap().cell(nosrc).cloned();
    let mut host = NativeHost::new();
    let mut gen = generator(FakeGenerator::default());
    let sink = DiagnosticSink::new();

    let report = run_rewrite(&mut d, &mut host, &mut gen, &RewriteOptions::default(), &sink).unwrap();

    assert_eq!(sink.count_code(W_NO_SRC), 1);
    assert_eq!(report.saved, 1);
    assert_eq!(report.rewritten, 1);
    let m = d.module_by_name("top").unwrap();
    assert_eq!(m.cell(nosrc).cloned(), before);
    assert_eq!(requested_trees(&gen).len(), 1);
}

#[test]
fn unmarked_neighbour_is_identical_after_rewrite() {
    let (mut d, _) = adder_design(true);
    let plain = {
        let m = top_mut(&mut d);
        let c = m.add_port("c", PortDirection::Input, 8);
        let z = m.add_port("z", PortDirection::Output, 8);
        let id = m.add_binary("plain", CellType::Add, c.clone(), c, z);
        m.cell_mut(id).unwrap().src = Some("top.v:9.12-9.17".into());
        id
    };
    let before = d.module_by_name("top").unwrap().cell(plain).cloned();
    let mut host = NativeHost::new();
    let mut gen = generator(FakeGenerator::default());
    let sink = DiagnosticSink::new();

    let report = run_rewrite(&mut d, &mut host, &mut gen, &RewriteOptions::default(), &sink).unwrap();

    assert_eq!(report.rewritten, 1);
    let m = d.module_by_name("top").unwrap();
    assert_eq!(m.cell(plain).cloned(), before);
    assert_eq!(
        m.live_cells().filter(|c| matches!(c.cell_type, CellType::Instance(_))).count(),
        1
    );
}

#[test]
fn map_generation_failure_does_not_stop_the_pass() {
    let (mut d, _) = adder_design(true);
    let runner = FakeGenerator {
        maps_code: 3,
        ..FakeGenerator::default()
    };
    let mut host = NativeHost::new();
    let mut gen = generator(runner);
    let sink = DiagnosticSink::new();

    let report = run_rewrite(&mut d, &mut host, &mut gen, &RewriteOptions::default(), &sink).unwrap();

    assert!(!report.maps_ingested);
    assert_eq!(sink.count_code(E_MAPS_FAILED), 1);
    assert_eq!(report.rewritten, 1);
    assert!(report.failed.is_empty());
}

#[test]
fn malformed_transform_attribute_fails_only_its_cell() {
    let (mut d, _) = adder_design(true);
    let bad = add_marked(top_mut(&mut d), "bad", 4, Some("top.v:5.12-5.17"));
    top_mut(&mut d)
        .cell_mut(bad)
        .unwrap()
        .attributes
        .insert(ATTR_TRANSFORMS.into(), "_LF@six".into());
    let mut host = NativeHost::new();
    let mut gen = generator(FakeGenerator::default());
    let sink = DiagnosticSink::new();

    let report = run_rewrite(&mut d, &mut host, &mut gen, &RewriteOptions::default(), &sink).unwrap();

    assert_eq!(report.rewritten, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].code, "E205");
    assert_eq!(report.failed[0].src, "top.v:5.12-5.17");
    assert_eq!(sink.count_code(E_BAD_TRANSFORM_ATTR), 1);

    let m = d.module_by_name("top").unwrap();
    let kept = m
        .live_cells()
        .find(|c| c.src.as_deref() == Some("top.v:5.12-5.17"))
        .unwrap();
    assert_eq!(kept.cell_type, CellType::Alu);
    assert!(kept.has_flag(ATTR_MARKER));
    assert_eq!(requested_trees(&gen).len(), 1);
}

#[test]
fn context_finishes_done_and_refuses_reuse() {
    let (mut d, _) = adder_design(true);
    let options = RewriteOptions::default();
    let mut ctx = RewriteContext::new(&options);
    assert_eq!(ctx.state(), PassState::Idle);
    let mut host = NativeHost::new();
    let mut gen = generator(FakeGenerator::default());
    let sink = DiagnosticSink::new();

    let report = ctx.run(&mut d, &mut host, &mut gen, &sink).unwrap();
    assert_eq!(report.rewritten, 1);
    assert_eq!(ctx.state(), PassState::Done);

    let err = ctx.run(&mut d, &mut host, &mut gen, &sink).unwrap_err();
    assert!(matches!(err, RewriteError::Internal(_)));
    assert_eq!(ctx.state(), PassState::Failed);
}

#[test]
fn failed_canonicalization_restores_the_selection() {
    let (mut d, id) = adder_design(true);
    let entry = Selection::Modules(["top".to_string()].into_iter().collect());
    d.selection = entry.clone();
    let options = RewriteOptions {
        emit_maps: false,
        ..RewriteOptions::default()
    };
    let mut ctx = RewriteContext::new(&options);
    let mut host = RefusingHost {
        inner: NativeHost::new(),
        refused: "alumacc",
    };
    let mut gen = generator(FakeGenerator::default());
    let sink = DiagnosticSink::new();

    let err = ctx.run(&mut d, &mut host, &mut gen, &sink).unwrap_err();

    assert!(matches!(err, RewriteError::Host(_)));
    assert_eq!(ctx.state(), PassState::Failed);
    assert_eq!(d.selection, entry);
    assert_eq!(d.module_by_name("top").unwrap().cell(id).unwrap().cell_type, CellType::Add);
    assert!(gen.runner().calls.is_empty());
}
