//! Module port definitions.

use crate::ids::{PortId, SignalId};
use serde::{Deserialize, Serialize};

/// The direction of a module port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// An input port.
    Input,
    /// An output port.
    Output,
    /// A bidirectional port.
    InOut,
}

/// A port on a module boundary, backed by a signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// The unique ID of this port within its module.
    pub id: PortId,
    /// The port name.
    pub name: String,
    /// The port direction.
    pub direction: PortDirection,
    /// The signal that carries this port's value inside the module.
    pub signal: SignalId,
}
