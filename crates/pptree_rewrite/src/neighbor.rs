//! Neighbor resolution for carry-chain pairs.
//!
//! Front ends lower `a + b + c` with a one-bit `c` into two `$add` cells, the
//! second adding the carry to the first one's result. Canonicalization merges
//! such a pair into one cell whose source location is the second cell's, so
//! metadata must be keyed on that cell.

use pptree_ir::{Cell, Design, Module};

/// Returns the cell that `cell`'s metadata should be keyed on.
///
/// Scans the selected live cells of `module` for an `$add` whose `A` input
/// is exactly `cell`'s `Y` output and whose `B` input is one bit wide. If
/// several match, the one with the lowest ID wins, so the result does not
/// depend on iteration order. Without a match `cell` is its own canonical
/// cell.
pub fn find_canonical_cell<'a>(design: &'a Design, module: &'a Module, cell: &'a Cell) -> &'a Cell {
    design
        .selected_cells(module)
        .filter(|c| c.takes_carry_from(cell))
        .min_by_key(|c| c.id)
        .unwrap_or(cell)
}
