//! Circuit graph for the tock digital-logic simulator.
//!
//! A [`Design`] is the fully elaborated graph of signals, processes, memory
//! arrays, and the chunk (module) instances that own them. Designs are built
//! once with a [`DesignBuilder`], instantiating reusable [`Chunk`]s whose
//! ports alias signals supplied by the parent. Signals live in an arena and
//! are referenced by [`SignalId`], so sequential feedback loops are plain
//! graph edges rather than ownership cycles.
//!
//! Process bodies are closures over a [`ProcessContext`], the narrow
//! read/write interface the simulation kernel implements.

#![warn(missing_docs)]

pub mod arena;
pub mod builder;
pub mod chunk;
pub mod design;
pub mod error;
pub mod ids;
pub mod memory;
pub mod process;
pub mod signal;
pub mod visit;

pub use arena::{Arena, ArenaId};
pub use builder::{DesignBuilder, ProcessBuilder};
pub use chunk::{Chunk, ChunkInstance, PortDirection, PortSpec, Ports};
pub use design::Design;
pub use error::{AccessError, ElabError};
pub use ids::{ChunkId, MemoryId, ProcessId, SignalId};
pub use memory::MemoryDecl;
pub use process::{Edge, ProcessContext, ProcessDecl, ProcessFn, ProcessKind};
pub use signal::{Segment, SignalDecl, SignalRef};
pub use visit::DesignVisitor;
