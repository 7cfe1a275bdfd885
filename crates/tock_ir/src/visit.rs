//! Read-only traversal of an elaborated design.
//!
//! Exporters and inspection tools implement [`DesignVisitor`] and hand it to
//! [`Design::walk`]. Each chunk is entered, its own signals, memories, and
//! processes are visited in declaration order, then its children are walked
//! before the chunk is exited.

use crate::chunk::ChunkInstance;
use crate::design::Design;
use crate::ids::ChunkId;
use crate::memory::MemoryDecl;
use crate::process::ProcessDecl;
use crate::signal::SignalDecl;

/// Callbacks for [`Design::walk`]. Every method defaults to doing nothing.
pub trait DesignVisitor {
    /// Called before anything owned by `chunk`. The top has depth 0.
    fn enter_chunk(&mut self, _design: &Design, _chunk: &ChunkInstance, _depth: usize) {}

    /// Called for each signal declared by the current chunk.
    fn visit_signal(&mut self, _design: &Design, _signal: &SignalDecl) {}

    /// Called for each memory declared by the current chunk.
    fn visit_memory(&mut self, _design: &Design, _memory: &MemoryDecl) {}

    /// Called for each process declared by the current chunk.
    fn visit_process(&mut self, _design: &Design, _process: &ProcessDecl) {}

    /// Called after the chunk's children have been walked.
    fn exit_chunk(&mut self, _design: &Design, _chunk: &ChunkInstance, _depth: usize) {}
}

pub(crate) fn walk<V: DesignVisitor + ?Sized>(design: &Design, visitor: &mut V) {
    if !design.chunks.is_empty() {
        walk_chunk(design, ChunkId::from_raw(0), 0, visitor);
    }
}

fn walk_chunk<V: DesignVisitor + ?Sized>(design: &Design, id: ChunkId, depth: usize, visitor: &mut V) {
    let chunk = &design.chunks[id];
    visitor.enter_chunk(design, chunk, depth);
    for s in &chunk.signals {
        visitor.visit_signal(design, &design.signals[*s]);
    }
    for m in &chunk.memories {
        visitor.visit_memory(design, &design.memories[*m]);
    }
    for p in &chunk.processes {
        visitor.visit_process(design, &design.processes[*p]);
    }
    for child in &chunk.children {
        walk_chunk(design, *child, depth + 1, visitor);
    }
    visitor.exit_chunk(design, chunk, depth);
}
