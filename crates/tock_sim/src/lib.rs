//! Deterministic discrete-event simulator for tock designs.
//!
//! This crate consumes an elaborated [`Design`] from `tock_ir` and runs it
//! with two-valued logic, delta-cycle combinational settling, and atomic
//! sequential commit: every process that fires on a clock edge reads the
//! same committed snapshot, and all of their writes become visible together.
//!
//! # Architecture
//!
//! [`SimKernel`] owns signal and memory state and implements the scheduling
//! loop. [`Simulation`] wraps it for testbenches with name lookup, clock
//! ticking, exhaustive and seeded-random stimulus, and trace capture through
//! [`TraceRecorder`]s.
//!
//! # Usage
//!
//! ```ignore
//! use tock_sim::Simulation;
//!
//! let mut sim = Simulation::new(design)?;
//! let clk = sim.signal("clk")?;
//! sim.run_clock(clk, 16)?;
//! println!("cnt = {}", sim.value_by_name("blink.cnt")?);
//! ```
//!
//! # Modules
//!
//! - `error`: simulation error types
//! - `time`: tick and delta time points
//! - `value`: signal and memory state with pending writes
//! - `kernel`: settling, edge detection, and commit
//! - `trace`: in-memory and VCD trace recorders
//! - `driver`: the testbench-facing [`Simulation`]

#![warn(missing_docs)]

pub mod driver;
pub mod error;
pub mod kernel;
pub mod time;
pub mod trace;
pub mod value;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tock_config::TockConfig;
use tock_ir::Design;

pub use driver::{Simulation, MAX_SWEEP_BITS};
pub use error::SimError;
pub use kernel::{SimKernel, SimStats};
pub use time::SimTime;
pub use trace::{MemoryTrace, TraceChange, TraceRecorder, TracedSignal, VcdRecorder};
pub use value::{MemoryState, SignalState};

/// Scheduler limits and trace selection for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Maximum delta iterations while settling combinational logic.
    pub max_settle_iterations: u32,
    /// Maximum cascaded clock-edge rounds in one step.
    pub max_edge_rounds: u32,
    /// Signals to trace by hierarchical name; empty traces every named signal.
    pub trace_signals: Vec<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_settle_iterations: 1000,
            max_edge_rounds: 64,
            trace_signals: Vec::new(),
        }
    }
}

impl SimConfig {
    /// Takes the limits and trace selection from a loaded `tock.toml`.
    pub fn from_config(config: &TockConfig) -> Self {
        Self {
            max_settle_iterations: config.simulation.max_settle_iterations,
            max_edge_rounds: config.simulation.max_edge_rounds,
            trace_signals: config.trace.signals.clone(),
        }
    }
}

/// Opens a buffered VCD recorder writing to `path`.
pub fn vcd_file_recorder(path: &Path) -> Result<Box<dyn TraceRecorder>, SimError> {
    let file = File::create(path)?;
    Ok(Box::new(VcdRecorder::new(BufWriter::new(file))))
}

/// Simulates `design` for `cycles` full cycles of the clock named `clock`.
pub fn run_cycles(
    design: Design,
    config: SimConfig,
    clock: &str,
    cycles: u64,
) -> Result<Simulation, SimError> {
    let mut sim = Simulation::with_config(design, config)?;
    let clk = sim.signal(clock)?;
    sim.run_clock(clk, cycles)?;
    sim.finish()?;
    Ok(sim)
}
