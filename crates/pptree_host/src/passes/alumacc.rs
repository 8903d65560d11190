//! `alumacc`: merge adders and subtractors into `$alu` cells.
//!
//! A carry-chain pair (an `$add` X whose `Y` drives the `A` input of another
//! `$add` Z with a one-bit `B`) becomes a single `$alu` computing
//! `X.A + X.B + Z.B`. Every other selected `$add`/`$sub` becomes an `$alu` on
//! its own. The new cells take their `src` from the cell whose output they
//! drive and start with an empty attribute map.

use crate::error::HostError;
use crate::host::HostPass;
use log::debug;
use pptree_diagnostics::DiagnosticSink;
use pptree_ir::{Cell, CellId, CellType, ConstValue, Design, Module, SigSpec, State};
use std::collections::BTreeSet;

/// The `alumacc` pass.
pub struct AlumaccPass;

impl HostPass for AlumaccPass {
    fn name(&self) -> &'static str {
        "alumacc"
    }

    fn execute(
        &self,
        args: &[&str],
        design: &mut Design,
        _sink: &DiagnosticSink,
    ) -> Result<(), HostError> {
        if let Some(extra) = args.first() {
            return Err(HostError::bad_args(self.name(), format!("unexpected argument `{extra}`")));
        }
        for module_id in design.selected_modules() {
            let selected = design.selected_cell_ids(module_id);
            let Some(module) = design.module_mut(module_id) else {
                continue;
            };
            let merged = merge_module(module, &selected);
            if merged > 0 {
                debug!("alumacc: {} $alu cells in `{}`", merged, module.name);
            }
        }
        Ok(())
    }
}

/// A planned `$alu`: the cell providing `A`/`B`, and the carry partner if any.
struct Plan {
    head: CellId,
    carry: Option<CellId>,
}

fn plan_module(module: &Module, selected: &[CellId]) -> Vec<Plan> {
    let candidates: Vec<&Cell> = selected
        .iter()
        .filter_map(|id| module.cell(*id))
        .filter(|c| c.cell_type.is_additive())
        .collect();

    let mut used = BTreeSet::new();
    let mut plans = Vec::new();
    for head in &candidates {
        if used.contains(&head.id) || head.cell_type != CellType::Add {
            continue;
        }
        let tail = candidates
            .iter()
            .filter(|t| !used.contains(&t.id) && t.takes_carry_from(head))
            .map(|t| t.id)
            .min();
        if let Some(tail) = tail {
            used.insert(head.id);
            used.insert(tail);
            plans.push(Plan { head: head.id, carry: Some(tail) });
        }
    }
    for cell in &candidates {
        if !used.contains(&cell.id) {
            plans.push(Plan { head: cell.id, carry: None });
        }
    }
    plans
}

fn const_bit(state: State) -> SigSpec {
    SigSpec::constant(state, 1)
}

fn merge_module(module: &mut Module, selected: &[CellId]) -> usize {
    let plans = plan_module(module, selected);
    let count = plans.len();
    for plan in plans {
        let Some(head) = module.remove_cell(plan.head) else {
            continue;
        };
        let carry = plan.carry.and_then(|id| module.remove_cell(id));

        let (ci, bi) = match (&carry, &head.cell_type) {
            (Some(tail), _) => (
                tail.port("B").cloned().unwrap_or_else(|| const_bit(State::S0)),
                const_bit(State::S0),
            ),
            (None, CellType::Sub) => (const_bit(State::S1), const_bit(State::S1)),
            (None, _) => (const_bit(State::S0), const_bit(State::S0)),
        };
        let output = carry.as_ref().unwrap_or(&head);
        let y = output.port("Y").cloned().unwrap_or_default();
        let src = output.src.clone();
        let y_width = y.width() as u32;

        let x_name = module.fresh_name("$alu_x");
        let x = module.add_signal(x_name, y_width);
        let co_name = module.fresh_name("$alu_co");
        let co = module.add_signal(co_name, y_width);
        let name = module.fresh_name("$alu");

        module.add_cell(|id| {
            let mut alu = Cell::new(id, name, CellType::Alu);
            if let Some(a) = head.port("A") {
                alu.set_port("A", a.clone());
            }
            if let Some(b) = head.port("B") {
                alu.set_port("B", b.clone());
            }
            alu.set_port("CI", ci);
            alu.set_port("BI", bi);
            alu.set_port("Y", y);
            alu.set_port("X", x);
            alu.set_port("CO", co);
            alu.fix_widths();
            for param in ["A_SIGNED", "B_SIGNED"] {
                let value = head.params.get(param).cloned().unwrap_or(ConstValue::Int(0));
                alu.params.insert(param.to_string(), value);
            }
            alu.src = src;
            alu
        });
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use pptree_ir::{PortDirection, Selection};

    struct Fixture {
        design: Design,
        head: CellId,
        tail: CellId,
    }

    /// `y = a + b + ci` as a carry pair, plus an unrelated subtractor.
    fn carry_pair() -> Fixture {
        let mut design = Design::new();
        let mid = design.add_module("top");
        let m = design.module_mut(mid).unwrap();
        let a = m.add_port("a", PortDirection::Input, 8);
        let b = m.add_port("b", PortDirection::Input, 8);
        let ci = m.add_port("ci", PortDirection::Input, 1);
        let y = m.add_port("y", PortDirection::Output, 8);
        let t = m.add_signal("t", 8);
        let d = m.add_port("d", PortDirection::Output, 8);
        let head = m.add_binary("add0", CellType::Add, a.clone(), b.clone(), t.clone());
        let tail = m.add_binary("add1", CellType::Add, t, ci, y);
        m.cell_mut(head).unwrap().src = Some("top.v:3.9-3.20".into());
        m.cell_mut(tail).unwrap().src = Some("top.v:3.9-3.25".into());
        m.add_binary("sub0", CellType::Sub, a, b, d);
        m.cell_mut(tail).unwrap().attributes.insert("keep".into(), ConstValue::Int(1));
        Fixture { design, head, tail }
    }

    fn run(design: &mut Design) {
        AlumaccPass
            .execute(&[], design, &DiagnosticSink::new())
            .unwrap();
    }

    fn alus(design: &Design) -> Vec<Cell> {
        design
            .module_by_name("top")
            .unwrap()
            .live_cells()
            .filter(|c| c.cell_type == CellType::Alu)
            .cloned()
            .collect()
    }

    #[test]
    fn carry_pair_merges_into_one_alu() {
        let mut fx = carry_pair();
        let m = fx.design.module_by_name("top").unwrap();
        let a = m.cell(fx.head).unwrap().port("A").cloned().unwrap();
        let ci = m.cell(fx.tail).unwrap().port("B").cloned().unwrap();
        let y = m.cell(fx.tail).unwrap().port("Y").cloned().unwrap();
        run(&mut fx.design);

        let alus = alus(&fx.design);
        assert_eq!(alus.len(), 2);
        let merged = alus
            .iter()
            .find(|c| c.src.as_deref() == Some("top.v:3.9-3.25"))
            .unwrap();
        assert_eq!(merged.port("A"), Some(&a));
        assert_eq!(merged.port("CI"), Some(&ci));
        assert_eq!(merged.port("Y"), Some(&y));
        assert_eq!(merged.port("BI"), Some(&SigSpec::constant(State::S0, 1)));
        assert!(merged.attributes.is_empty());
        assert_eq!(merged.param_int("A_WIDTH"), Some(8));
    }

    #[test]
    fn lone_sub_sets_carry_and_invert() {
        let mut fx = carry_pair();
        run(&mut fx.design);
        let sub = alus(&fx.design)
            .into_iter()
            .find(|c| c.src.is_none())
            .unwrap();
        assert_eq!(sub.port("CI"), Some(&SigSpec::constant(State::S1, 1)));
        assert_eq!(sub.port("BI"), Some(&SigSpec::constant(State::S1, 1)));
    }

    #[test]
    fn unselected_cells_survive() {
        let mut fx = carry_pair();
        let sub = fx
            .design
            .module_by_name("top")
            .unwrap()
            .cell_by_name("sub0")
            .unwrap()
            .id;
        fx.design.selection = Selection::from_cells([("top", fx.head), ("top", fx.tail)]);
        run(&mut fx.design);
        let m = fx.design.module_by_name("top").unwrap();
        let survivor = m.cell(sub).unwrap();
        assert_eq!(survivor.cell_type, CellType::Sub);
        assert_eq!(alus(&fx.design).len(), 1);
    }

    #[test]
    fn rejects_arguments() {
        let mut design = Design::new();
        let err = AlumaccPass
            .execute(&["-unsigned"], &mut design, &DiagnosticSink::new())
            .unwrap_err();
        assert!(matches!(err, HostError::BadArguments { .. }));
    }
}
