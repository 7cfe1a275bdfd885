//! Process declarations and the context a process body runs against.
//!
//! A process is a closure plus its declared read set, drive set, and
//! (for sequential processes) clock sensitivity. Bodies never touch signal
//! storage directly: they go through [`ProcessContext`], which the simulator
//! implements so that writes are always deferred to the next commit.

use serde::{Deserialize, Serialize};
use tock_common::Bits;

use crate::error::AccessError;
use crate::ids::{ChunkId, MemoryId, ProcessId, SignalId};
use crate::signal::SignalRef;

/// Clock polarity a sequential process is sensitive to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// 0 -> 1.
    Rising,
    /// 1 -> 0.
    Falling,
    /// Any change.
    Both,
}

impl Edge {
    /// Returns `true` if a clock moving from `before` to `after` fires this edge.
    pub fn matches(self, before: bool, after: bool) -> bool {
        match self {
            Edge::Rising => !before && after,
            Edge::Falling => before && !after,
            Edge::Both => before != after,
        }
    }
}

/// Scheduling class of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessKind {
    /// Re-runs whenever a signal in its read set changes.
    Combinational,
    /// Runs once per matching edge of a one-bit clock.
    Sequential {
        /// The clock signal.
        clock: SignalId,
        /// The polarity that triggers the body.
        edge: Edge,
    },
}

impl ProcessKind {
    /// Returns `true` for sequential processes.
    pub fn is_sequential(&self) -> bool {
        matches!(self, ProcessKind::Sequential { .. })
    }
}

/// A process in the elaborated design, without its body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDecl {
    /// The process handle.
    pub id: ProcessId,
    /// Hierarchical name, e.g. `counter0.reg.dff3.logic`.
    pub name: String,
    /// The chunk instance that declared this process.
    pub chunk: ChunkId,
    /// Scheduling class.
    pub kind: ProcessKind,
    /// Signals the body may read. For combinational processes this is the
    /// sensitivity list.
    pub reads: Vec<SignalRef>,
    /// Signals the body may write.
    pub drives: Vec<SignalRef>,
    /// Memories the body may access.
    pub memories: Vec<MemoryId>,
}

/// The body of a process.
pub type ProcessFn = Box<dyn FnMut(&mut dyn ProcessContext) -> Result<(), AccessError>>;

/// Signal and memory access available to a running process body.
///
/// Reads return values as of the start of the current evaluation. Writes are
/// pending: they become visible only after the scheduler commits them, and a
/// later write to the same bits in the same body replaces an earlier one.
pub trait ProcessContext {
    /// Reads the current value of a view.
    fn read(&self, r: &SignalRef) -> Result<Bits, AccessError>;

    /// Schedules `value`, truncated to the view's width, as the next value.
    fn write_next(&mut self, r: &SignalRef, value: u64) -> Result<(), AccessError>;

    /// Reads a memory cell as it was before the current edge.
    fn read_memory(&self, memory: MemoryId, address: u64) -> Result<Bits, AccessError>;

    /// Schedules a memory cell write for commit at the end of the edge.
    fn write_memory_next(
        &mut self,
        memory: MemoryId,
        address: u64,
        value: u64,
    ) -> Result<(), AccessError>;

    /// Current simulation tick.
    fn time(&self) -> u64;
}

impl<'a> dyn ProcessContext + 'a {
    /// Reads a view as a plain integer.
    pub fn get(&self, r: impl Into<SignalRef>) -> Result<u64, AccessError> {
        Ok(self.read(&r.into())?.as_u64())
    }

    /// Returns `true` if a view is non-zero.
    pub fn is_high(&self, r: impl Into<SignalRef>) -> Result<bool, AccessError> {
        Ok(!self.read(&r.into())?.is_zero())
    }

    /// Schedules a write of `value` to a view.
    pub fn set(&mut self, r: impl Into<SignalRef>, value: u64) -> Result<(), AccessError> {
        self.write_next(&r.into(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_matching() {
        assert!(Edge::Rising.matches(false, true));
        assert!(!Edge::Rising.matches(true, false));
        assert!(Edge::Falling.matches(true, false));
        assert!(!Edge::Falling.matches(false, false));
        assert!(Edge::Both.matches(true, false));
        assert!(Edge::Both.matches(false, true));
        assert!(!Edge::Both.matches(true, true));
    }

    #[test]
    fn kind_is_sequential() {
        let seq = ProcessKind::Sequential {
            clock: SignalId::from_raw(0),
            edge: Edge::Rising,
        };
        assert!(seq.is_sequential());
        assert!(!ProcessKind::Combinational.is_sequential());
    }

    #[test]
    fn decl_serde_roundtrip() {
        let decl = ProcessDecl {
            id: ProcessId::from_raw(2),
            name: "dff.logic".into(),
            chunk: ChunkId::from_raw(1),
            kind: ProcessKind::Sequential {
                clock: SignalId::from_raw(0),
                edge: Edge::Falling,
            },
            reads: vec![SignalRef::Signal(SignalId::from_raw(1))],
            drives: vec![SignalId::from_raw(2).bit(0)],
            memories: vec![],
        };
        let json = serde_json::to_string(&decl).unwrap();
        let back: ProcessDecl = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "dff.logic");
        assert_eq!(back.kind, decl.kind);
        assert_eq!(back.drives, decl.drives);
    }
}
