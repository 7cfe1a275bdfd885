//! Simulation error types.
//!
//! All errors that can occur while constructing or running a simulation are
//! variants of [`SimError`]. Runtime errors carry the simulation time and,
//! where one exists, the identity of the offending process or signal.

use std::io;

use tock_ir::{AccessError, ElabError};

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The design failed to elaborate.
    #[error(transparent)]
    Elab(#[from] ElabError),

    /// A process body failed while reading or writing.
    #[error("process '{process}' failed at tick {time}: {source}")]
    Access {
        /// Hierarchical process name.
        process: String,
        /// Simulation tick of the failure.
        time: u64,
        /// The underlying access error.
        source: AccessError,
    },

    /// Combinational settling or cascaded clock edges did not stop.
    #[error(
        "logic did not converge at tick {time} after {iterations} iterations (still changing: {})",
        .signals.join(", ")
    )]
    Convergence {
        /// Simulation tick of the failure.
        time: u64,
        /// Iterations performed before giving up.
        iterations: u32,
        /// Names of the signals still changing in the last iteration.
        signals: Vec<String>,
    },

    /// Two processes wrote the same memory cell on the same edge.
    #[error(
        "memory '{memory}' address {address} written by both '{first}' and '{second}' at tick {time}"
    )]
    MemoryWriteConflict {
        /// Hierarchical memory name.
        memory: String,
        /// The contested address.
        address: u64,
        /// The first writer.
        first: String,
        /// The second writer.
        second: String,
        /// Simulation tick of the conflict.
        time: u64,
    },

    /// An earlier error ended the run; the circuit state is no longer valid.
    #[error("simulation aborted at tick {time}: {reason}")]
    Aborted {
        /// Tick of the original failure.
        time: u64,
        /// Message of the original failure.
        reason: String,
    },

    /// The design's process bodies were already moved out.
    #[error("design '{0}' has no process bodies left to simulate")]
    BodiesTaken(String),

    /// No signal or memory has the given name.
    #[error("no signal or memory named '{0}'")]
    UnknownName(String),

    /// A stimulus value does not fit its signal.
    #[error("stimulus value {value} does not fit {width}-bit signal '{signal}'")]
    Stimulus {
        /// Hierarchical signal name.
        signal: String,
        /// The rejected value.
        value: u64,
        /// Width of the signal.
        width: u32,
    },

    /// An exhaustive sweep over too many input bits was requested.
    #[error("exhaustive stimulus over {bits} input bits exceeds the {max}-bit limit")]
    SweepTooWide {
        /// Total input width requested.
        bits: u32,
        /// Largest permitted total width.
        max: u32,
    },

    /// A memory address outside the array was queried.
    #[error("address {address} out of range for memory '{memory}' of depth {depth}")]
    AddressOutOfRange {
        /// Hierarchical memory name.
        memory: String,
        /// The offending address.
        address: u64,
        /// Number of cells.
        depth: u64,
    },

    /// Writing trace output failed.
    #[error("trace I/O error: {0}")]
    TraceIo(#[from] io::Error),

    /// Serializing a trace failed.
    #[error("trace serialization error: {0}")]
    TraceFormat(#[from] serde_json::Error),
}
