//! Error types for elaboration and for process-level signal access.
//!
//! [`ElabError`] covers structural problems found while the design is being
//! built; any one of them aborts elaboration, so no partial circuit is ever
//! simulated. [`AccessError`] is raised from inside a running process body
//! and is wrapped by the simulator with the process name and time step.

use tock_common::BitsError;

use crate::ids::{MemoryId, SignalId};

/// Structural errors detected while elaborating a design.
#[derive(Debug, thiserror::Error)]
pub enum ElabError {
    /// A signal or memory was declared with an unsupported width.
    #[error("invalid width for '{name}': {source}")]
    InvalidWidth {
        /// Hierarchical name of the declaration.
        name: String,
        /// The underlying width violation.
        source: BitsError,
    },

    /// A signal reference has a slice outside its signal, or an illegal shape.
    #[error("invalid signal reference in '{context}': {source}")]
    InvalidRef {
        /// Where the reference was used (process or port).
        context: String,
        /// The underlying range violation.
        source: BitsError,
    },

    /// A binding names a port the chunk does not declare.
    #[error("instance '{instance}' has no port named '{port}'")]
    UnknownPort {
        /// Hierarchical instance name.
        instance: String,
        /// The unknown port name.
        port: String,
    },

    /// A declared port was left unbound.
    #[error("port '{port}' of instance '{instance}' is not bound")]
    MissingPort {
        /// Hierarchical instance name.
        instance: String,
        /// The unbound port name.
        port: String,
    },

    /// A port was bound more than once.
    #[error("port '{port}' of instance '{instance}' is bound more than once")]
    DuplicatePort {
        /// Hierarchical instance name.
        instance: String,
        /// The duplicated port name.
        port: String,
    },

    /// A port binding's width differs from the port's declared width.
    #[error(
        "port '{port}' of instance '{instance}' expects {expected} bits but is bound to {found}"
    )]
    PortWidthMismatch {
        /// Hierarchical instance name.
        instance: String,
        /// The port name.
        port: String,
        /// Declared port width.
        expected: u32,
        /// Width of the bound signal reference.
        found: u32,
    },

    /// An output port was bound to a constant.
    #[error("output port '{port}' of instance '{instance}' cannot be bound to a constant")]
    ConstOutput {
        /// Hierarchical instance name.
        instance: String,
        /// The output port name.
        port: String,
    },

    /// A port used as a clock is bound to a slice, concatenation, or constant.
    #[error("clock port '{port}' of instance '{instance}' must be bound to a whole signal")]
    ClockNotSignal {
        /// Hierarchical instance name.
        instance: String,
        /// The clock port name.
        port: String,
    },

    /// A chunk kind appears inside its own instantiation path.
    #[error("chunk '{kind}' instantiates itself (path: {path})")]
    RecursiveInstantiation {
        /// The recursive chunk kind.
        kind: String,
        /// The instantiation path that closed the cycle.
        path: String,
    },

    /// Two processes drive overlapping bits of the same signal.
    #[error("signal '{signal}' is driven by both '{first}' and '{second}'")]
    MultipleDrivers {
        /// Hierarchical signal name.
        signal: String,
        /// The first driving process.
        first: String,
        /// The second driving process.
        second: String,
    },

    /// A process lists a constant in its drive set.
    #[error("process '{process}' cannot drive a constant")]
    ConstDriven {
        /// Hierarchical process name.
        process: String,
    },

    /// A sequential process is clocked by a signal wider than one bit.
    #[error("clock of process '{process}' is {width} bits wide; clocks must be 1 bit")]
    ClockWidth {
        /// Hierarchical process name.
        process: String,
        /// Width of the offending clock signal.
        width: u32,
    },

    /// A memory array has an unsupported geometry.
    #[error("memory '{name}' has invalid geometry: {reason}")]
    InvalidMemory {
        /// Hierarchical memory name.
        name: String,
        /// Why the geometry was rejected.
        reason: String,
    },

    /// A state enumeration is empty, too large, or has duplicate names.
    #[error("state signal '{name}' is invalid: {reason}")]
    InvalidStates {
        /// Hierarchical signal name.
        name: String,
        /// Why the enumeration was rejected.
        reason: String,
    },

    /// A chunk was constructed with an unusable parameter.
    #[error("invalid parameter for chunk '{chunk}': {reason}")]
    InvalidParameter {
        /// The chunk kind.
        chunk: String,
        /// Why the parameter was rejected.
        reason: String,
    },
}

/// Errors raised by a process body while reading or writing signals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// A width or slice violation on a signal value.
    #[error(transparent)]
    Bits(#[from] BitsError),

    /// A memory address beyond the array's depth.
    #[error("address {address} out of range for memory {memory} of depth {depth}")]
    AddressOutOfRange {
        /// The memory being accessed.
        memory: MemoryId,
        /// The offending address.
        address: u64,
        /// Number of cells in the memory.
        depth: u64,
    },

    /// A state signal holds a value outside its declared enumeration.
    #[error("signal {signal} holds {value}, which is not a declared state")]
    UnknownState {
        /// The state signal.
        signal: SignalId,
        /// The unrecognized encoded value.
        value: u64,
    },

    /// A process read a signal that is not in its read set.
    #[error("signal {0} is not in the process read set")]
    UndeclaredRead(SignalId),

    /// A process wrote bits that are not in its drive set.
    #[error("bits of signal {0} are not in the process drive set")]
    UndeclaredWrite(SignalId),

    /// A process tried to write through a constant reference.
    #[error("a constant cannot be written")]
    ConstTarget,

    /// A memory was accessed from a combinational process or an undeclared one.
    #[error("memory {0} is only accessible from a sequential process that declares it")]
    MemoryNotAccessible(MemoryId),
}
