//! Memory array declarations.

use serde::{Deserialize, Serialize};

use crate::ids::{ChunkId, MemoryId};

/// Largest supported address width; bounds a memory at 2^20 cells.
pub const MAX_ADDR_WIDTH: u32 = 20;

/// An array of `2^addr_width` cells, each `data_width` bits wide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDecl {
    /// The memory handle.
    pub id: MemoryId,
    /// Hierarchical name.
    pub name: String,
    /// The chunk instance that declared this memory.
    pub chunk: ChunkId,
    /// Address bus width in bits.
    pub addr_width: u32,
    /// Cell width in bits.
    pub data_width: u32,
}

impl MemoryDecl {
    /// Number of cells.
    pub fn depth(&self) -> u64 {
        1u64 << self.addr_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_is_power_of_two() {
        let m = MemoryDecl {
            id: MemoryId::from_raw(0),
            name: "ram.mem".into(),
            chunk: ChunkId::from_raw(0),
            addr_width: 8,
            data_width: 16,
        };
        assert_eq!(m.depth(), 256);
    }
}
