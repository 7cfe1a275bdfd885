//! Opaque ID newtypes for circuit graph entities.
//!
//! Each ID is a thin `u32` wrapper handed out by an
//! [`Arena`](crate::arena::Arena) during elaboration.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
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
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Handle to a wire or bus in the design.
    SignalId,
    "s"
);

define_id!(
    /// Handle to a combinational or sequential process.
    ProcessId,
    "p"
);

define_id!(
    /// Handle to a memory array.
    MemoryId,
    "m"
);

define_id!(
    /// Handle to a chunk (module) instance in the hierarchy.
    ChunkId,
    "c"
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn id_roundtrip() {
        assert_eq!(SignalId::from_raw(42).as_raw(), 42);
    }

    #[test]
    fn ids_hash_and_compare() {
        let mut set = HashSet::new();
        set.insert(ProcessId::from_raw(1));
        set.insert(ProcessId::from_raw(2));
        set.insert(ProcessId::from_raw(1));
        assert_eq!(set.len(), 2);
        assert!(ProcessId::from_raw(1) < ProcessId::from_raw(2));
    }

    #[test]
    fn display_uses_prefix() {
        assert_eq!(SignalId::from_raw(3).to_string(), "s3");
        assert_eq!(MemoryId::from_raw(0).to_string(), "m0");
        assert_eq!(ChunkId::from_raw(7).to_string(), "c7");
    }

    #[test]
    fn serde_roundtrip() {
        let id = MemoryId::from_raw(9);
        let json = serde_json::to_string(&id).unwrap();
        let back: MemoryId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
