//! Cell definitions for arithmetic primitives and module instantiations.
//!
//! A [`Cell`] is a typed node in the netlist. Its connections map port
//! names to [`SigSpec`]s, so structural matching between cells is a
//! comparison of specs. Arithmetic cells follow the conventional port names
//! `A`, `B`, `Y` (plus `CI`, `BI`, `X`, `CO` on `$alu`) and the width
//! parameters `A_WIDTH`, `B_WIDTH`, `Y_WIDTH`.

use crate::attr::{Attributes, ConstValue};
use crate::ids::CellId;
use crate::sig::SigSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The type of a cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    /// A two-operand adder (`$add`).
    Add,
    /// A two-operand subtractor (`$sub`).
    Sub,
    /// A combined arithmetic-logic cell with carry in and invert-B (`$alu`).
    Alu,
    /// An instantiation of a named module.
    Instance(String),
    /// Any other cell type, preserved by name.
    Other(String),
}

impl CellType {
    /// Parses a host type name such as `$add` or `my_module`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "$add" => CellType::Add,
            "$sub" => CellType::Sub,
            "$alu" => CellType::Alu,
            n if n.starts_with('$') => CellType::Other(n.to_string()),
            n => CellType::Instance(n.to_string()),
        }
    }

    /// Returns `true` for `$add` and `$sub`.
    pub fn is_additive(&self) -> bool {
        matches!(self, CellType::Add | CellType::Sub)
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellType::Add => f.write_str("$add"),
            CellType::Sub => f.write_str("$sub"),
            CellType::Alu => f.write_str("$alu"),
            CellType::Instance(n) | CellType::Other(n) => f.write_str(n),
        }
    }
}

/// A cell in a module's netlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// The unique ID of this cell within its module.
    pub id: CellId,
    /// The instance name.
    pub name: String,
    /// The cell type.
    pub cell_type: CellType,
    /// Parameters, such as operand widths.
    #[serde(default)]
    pub params: BTreeMap<String, ConstValue>,
    /// Port connections by port name.
    #[serde(default)]
    pub connections: BTreeMap<String, SigSpec>,
    /// User and tool attributes.
    #[serde(default)]
    pub attributes: Attributes,
    /// Source location (`file:line.col-line.col`), if known.
    #[serde(default)]
    pub src: Option<String>,
}

impl Cell {
    /// Creates a cell with no parameters, connections or attributes.
    pub fn new(id: CellId, name: impl Into<String>, cell_type: CellType) -> Self {
        Self {
            id,
            name: name.into(),
            cell_type,
            params: BTreeMap::new(),
            connections: BTreeMap::new(),
            attributes: Attributes::new(),
            src: None,
        }
    }

    /// Returns the spec connected to `port`, if any.
    pub fn port(&self, port: &str) -> Option<&SigSpec> {
        self.connections.get(port)
    }

    /// Connects `port` to `spec`, replacing any existing connection.
    pub fn set_port(&mut self, port: impl Into<String>, spec: SigSpec) {
        self.connections.insert(port.into(), spec);
    }

    /// Returns an integer parameter, if present.
    pub fn param_int(&self, name: &str) -> Option<i64> {
        self.params.get(name).and_then(ConstValue::as_int)
    }

    /// Returns a string attribute, if present.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(ConstValue::as_str)
    }

    /// Returns `true` if the attribute `name` is set to a truthy value.
    pub fn has_flag(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(ConstValue::is_truthy)
    }

    /// Returns `true` if `self` is an `$add` that adds a one-bit value to the
    /// output of the `$add` `head`: its `A` is exactly `head`'s `Y` and its
    /// `B` is one bit wide. Such a pair merges into a single `$alu`.
    pub fn takes_carry_from(&self, head: &Cell) -> bool {
        self.id != head.id
            && head.cell_type == CellType::Add
            && self.cell_type == CellType::Add
            && head.port("Y").is_some()
            && self.port("A") == head.port("Y")
            && self.port("B").map(SigSpec::width) == Some(1)
    }

    /// Sets `A_WIDTH`, `B_WIDTH` and `Y_WIDTH` from the current connections.
    pub fn fix_widths(&mut self) {
        for (port, param) in [("A", "A_WIDTH"), ("B", "B_WIDTH"), ("Y", "Y_WIDTH")] {
            if let Some(width) = self.connections.get(port).map(SigSpec::width) {
                self.params
                    .insert(param.to_string(), ConstValue::Int(width as i64));
            }
        }
    }
}
