//! The elaborated circuit graph.
//!
//! A [`Design`] is the output of [`DesignBuilder::finish`](crate::DesignBuilder::finish)
//! and the input to simulation. It is structurally immutable: the simulator
//! reads declarations from it and takes ownership of the process bodies.

use std::fmt;

use crate::arena::Arena;
use crate::chunk::ChunkInstance;
use crate::ids::{ChunkId, MemoryId, ProcessId, SignalId};
use crate::memory::MemoryDecl;
use crate::process::{ProcessDecl, ProcessFn};
use crate::signal::SignalDecl;
use crate::visit::{walk, DesignVisitor};

/// A fully elaborated design.
pub struct Design {
    /// Design name (the top-level scope).
    pub name: String,
    /// All signals, in declaration order.
    pub signals: Arena<SignalId, SignalDecl>,
    /// All processes, in declaration order.
    pub processes: Arena<ProcessId, ProcessDecl>,
    /// All memory arrays.
    pub memories: Arena<MemoryId, MemoryDecl>,
    /// The chunk hierarchy; the top scope is the first entry.
    pub chunks: Arena<ChunkId, ChunkInstance>,
    bodies: Vec<ProcessFn>,
}

impl Design {
    pub(crate) fn new(
        name: String,
        signals: Arena<SignalId, SignalDecl>,
        processes: Arena<ProcessId, ProcessDecl>,
        bodies: Vec<ProcessFn>,
        memories: Arena<MemoryId, MemoryDecl>,
        chunks: Arena<ChunkId, ChunkInstance>,
    ) -> Self {
        Self {
            name,
            signals,
            processes,
            memories,
            chunks,
            bodies,
        }
    }

    /// The top-level scope.
    pub fn top(&self) -> &ChunkInstance {
        &self.chunks[ChunkId::from_raw(0)]
    }

    /// Looks up a signal by hierarchical name.
    pub fn find_signal(&self, name: &str) -> Option<SignalId> {
        self.signals
            .iter()
            .find(|(_, s)| s.name == name)
            .map(|(id, _)| id)
    }

    /// Looks up a memory by hierarchical name.
    pub fn find_memory(&self, name: &str) -> Option<MemoryId> {
        self.memories
            .iter()
            .find(|(_, m)| m.name == name)
            .map(|(id, _)| id)
    }

    /// Returns a signal declaration.
    pub fn signal(&self, id: SignalId) -> &SignalDecl {
        &self.signals[id]
    }

    /// Moves the process bodies out, indexed by [`ProcessId`].
    ///
    /// Bodies can be taken once; later calls return an empty list.
    pub fn take_bodies(&mut self) -> Vec<ProcessFn> {
        std::mem::take(&mut self.bodies)
    }

    /// Walks the hierarchy depth-first from the top.
    pub fn walk<V: DesignVisitor>(&self, visitor: &mut V) {
        walk(self, visitor);
    }
}

impl fmt::Debug for Design {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Design")
            .field("name", &self.name)
            .field("signals", &self.signals.len())
            .field("processes", &self.processes.len())
            .field("memories", &self.memories.len())
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::DesignBuilder;
    use crate::process::Edge;

    #[test]
    fn lookup_and_take_bodies() {
        let mut b = DesignBuilder::new("top");
        let clk = b.wire("clk").unwrap();
        let q = b.bus("q", 4).unwrap();
        b.memory("mem", 2, 4).unwrap();
        b.seq("ff", clk, Edge::Rising)
            .drives([q])
            .body(|_| Ok(()))
            .unwrap();
        let mut design = b.finish().unwrap();
        assert_eq!(design.find_signal("q"), Some(q));
        assert_eq!(design.find_signal("nope"), None);
        assert!(design.find_memory("mem").is_some());
        assert_eq!(design.signal(clk).width, 1);
        assert_eq!(design.top().signals, vec![clk, q]);
        assert_eq!(design.take_bodies().len(), 1);
        assert!(design.take_bodies().is_empty());
    }

    #[test]
    fn debug_is_summary() {
        let design = DesignBuilder::new("blink").finish().unwrap();
        let text = format!("{design:?}");
        assert!(text.contains("blink"));
        assert!(text.contains("signals: 0"));
    }
}
