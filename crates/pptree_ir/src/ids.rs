//! Opaque ID newtypes for IR entities.
//!
//! Each ID is a thin `u32` wrapper that is `Copy`, ordered, hashable and
//! serde-transparent. IDs are created by
//! [`Arena::alloc`](crate::arena::Arena::alloc) and stay valid after removal
//! of other entries.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifies a module in the design.
    ModuleId,
    "module"
);

define_id!(
    /// Identifies a signal within a module.
    SignalId,
    "signal"
);

define_id!(
    /// Identifies a cell within a module.
    CellId,
    "cell"
);

define_id!(
    /// Identifies a port on a module.
    PortId,
    "port"
);
