//! Native implementations of the host passes.

pub mod alumacc;
pub mod read_verilog;
pub mod select;
pub mod techmap;
