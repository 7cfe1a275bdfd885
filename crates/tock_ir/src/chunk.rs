//! Reusable hierarchical building blocks ("chunks").
//!
//! A [`Chunk`] declares a port list and knows how to elaborate its contents
//! into a [`DesignBuilder`](crate::DesignBuilder). Instantiating a chunk binds
//! each port to a [`SignalRef`] owned by the parent; the chunk's processes
//! read and drive those parent signals directly, so a port is an alias and
//! never a copy.

use serde::{Deserialize, Serialize};

use crate::builder::DesignBuilder;
use crate::error::ElabError;
use crate::ids::{ChunkId, MemoryId, ProcessId, SignalId};
use crate::signal::SignalRef;

/// The direction of a port on a chunk boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Data flows into the chunk.
    Input,
    /// Data flows out of the chunk.
    Output,
}

/// One entry of a chunk's port list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    /// Port name, e.g. `clk_i`.
    pub name: String,
    /// Direction of data flow.
    pub direction: PortDirection,
    /// Required width of the bound signal reference.
    pub width: u32,
}

impl PortSpec {
    /// An input port.
    pub fn input(name: &str, width: u32) -> Self {
        Self {
            name: name.to_string(),
            direction: PortDirection::Input,
            width,
        }
    }

    /// An output port.
    pub fn output(name: &str, width: u32) -> Self {
        Self {
            name: name.to_string(),
            direction: PortDirection::Output,
            width,
        }
    }
}

/// A reusable, parameterized piece of hardware.
pub trait Chunk {
    /// Kind name used in hierarchy dumps and recursion checks, e.g. `"counter"`.
    fn kind(&self) -> &str;

    /// The port list. Widths may depend on the chunk's parameters.
    fn ports(&self) -> Vec<PortSpec>;

    /// Declares this chunk's signals, processes, memories, and children.
    ///
    /// Called with the builder scoped to the new instance; names declared
    /// here are prefixed with the instance path.
    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError>;
}

/// Port bindings handed to [`Chunk::build`].
#[derive(Debug, Clone)]
pub struct Ports {
    instance: String,
    bindings: Vec<(String, SignalRef)>,
}

impl Ports {
    pub(crate) fn new(instance: String, bindings: Vec<(String, SignalRef)>) -> Self {
        Self { instance, bindings }
    }

    /// The parent view bound to a port.
    pub fn get(&self, port: &str) -> Result<SignalRef, ElabError> {
        self.bindings
            .iter()
            .find(|(name, _)| name == port)
            .map(|(_, r)| r.clone())
            .ok_or_else(|| ElabError::UnknownPort {
                instance: self.instance.clone(),
                port: port.to_string(),
            })
    }

    /// The signal bound to a clock port. Clocks must be whole signals.
    pub fn clock(&self, port: &str) -> Result<SignalId, ElabError> {
        match self.get(port)? {
            SignalRef::Signal(id) => Ok(id),
            _ => Err(ElabError::ClockNotSignal {
                instance: self.instance.clone(),
                port: port.to_string(),
            }),
        }
    }

    /// Hierarchical path of the instance being built.
    pub fn instance(&self) -> &str {
        &self.instance
    }
}

/// A chunk instance in the elaborated hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkInstance {
    /// The instance handle.
    pub id: ChunkId,
    /// Local instance name.
    pub name: String,
    /// Dot-separated path from the top; empty for the top itself.
    pub path: String,
    /// The chunk kind.
    pub kind: String,
    /// The instantiating parent; `None` for the top.
    pub parent: Option<ChunkId>,
    /// Port list with the parent views bound to each port.
    pub ports: Vec<(PortSpec, SignalRef)>,
    /// Signals declared by this instance.
    pub signals: Vec<SignalId>,
    /// Processes declared by this instance.
    pub processes: Vec<ProcessId>,
    /// Memories declared by this instance.
    pub memories: Vec<MemoryId>,
    /// Child instances in instantiation order.
    pub children: Vec<ChunkId>,
}
