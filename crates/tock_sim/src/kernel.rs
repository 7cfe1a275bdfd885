//! Simulation kernel: combinational settling, edge detection, and atomic
//! sequential commit.
//!
//! [`SimKernel`] owns the runtime state of an elaborated [`Design`]. One call
//! to [`SimKernel::step`] evaluates one testbench time point:
//!
//! 1. Commit pending stimulus.
//! 2. Settle: re-run the combinational processes whose read set overlaps a
//!    changed bit, one delta at a time, until nothing changes.
//! 3. Detect edges on every clock against the value seen at the previous
//!    detection. If any sequential process fires, run every fired body
//!    against the same committed snapshot, commit all their signal and memory
//!    writes together, settle, and detect again.
//!
//! Readers only ever see committed values, so evaluation order inside a
//! delta or an edge round never changes the result.
//!
//! Any error out of a step ends the run: pending writes are discarded and
//! every later [`SimKernel::step`] or [`SimKernel::set`] fails with
//! [`SimError::Aborted`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tock_common::{mask, Bits};
use tock_ir::{
    AccessError, Arena, Design, Edge, MemoryId, ProcessContext, ProcessFn, ProcessId,
    ProcessKind, SignalId, SignalRef,
};

use crate::error::SimError;
use crate::time::SimTime;
use crate::value::{MemoryState, SignalState};
use crate::SimConfig;

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimStats {
    /// Completed steps.
    pub steps: u64,
    /// Combinational delta iterations, including the initial pass.
    pub deltas: u64,
    /// Clock-edge rounds in which at least one sequential process fired.
    pub edge_rounds: u64,
    /// Sequential process executions.
    pub seq_firings: u64,
}

/// Declared access of one process, flattened to per-signal bit masks.
#[derive(Debug, Default)]
struct ProcessAccess {
    reads: HashMap<SignalId, u64>,
    drives: HashMap<SignalId, u64>,
    memories: Vec<MemoryId>,
    sequential: bool,
}

/// A clock signal and the sequential processes it triggers.
#[derive(Debug)]
struct ClockWatch {
    signal: SignalId,
    last: bool,
    triggers: Vec<(ProcessId, Edge)>,
}

type MemoryWrite = (ProcessId, MemoryId, u64, u64);

/// The simulation kernel.
pub struct SimKernel {
    design: Design,
    bodies: Vec<ProcessFn>,
    signals: Arena<SignalId, SignalState>,
    memories: Arena<MemoryId, MemoryState>,
    access: Vec<ProcessAccess>,
    /// Combinational processes keyed by the signals (and bits) they read.
    sensitivity: HashMap<SignalId, Vec<(ProcessId, u64)>>,
    comb: Vec<ProcessId>,
    clocks: Vec<ClockWatch>,
    stimulus: BTreeSet<SignalId>,
    time: SimTime,
    config: SimConfig,
    stats: SimStats,
    initialized: bool,
    /// Tick and message of the error that ended the run.
    failure: Option<(u64, String)>,
}

impl SimKernel {
    /// Builds runtime state for `design`, taking ownership of its process bodies.
    pub fn new(mut design: Design, config: SimConfig) -> Result<Self, SimError> {
        let bodies = design.take_bodies();
        if bodies.len() != design.processes.len() {
            return Err(SimError::BodiesTaken(design.name.clone()));
        }

        let mut signals = Arena::new();
        for decl in design.signals.values() {
            signals.alloc(SignalState::new(decl.init));
        }
        let mut memories = Arena::new();
        for decl in design.memories.values() {
            memories.alloc(MemoryState::new(decl.depth(), decl.data_width));
        }

        let width_of = |id: SignalId| design.signals.try_get(id).map(|s| s.width);
        let flatten = |refs: &[SignalRef]| {
            let mut masks: HashMap<SignalId, u64> = HashMap::new();
            for r in refs {
                for seg in r.segments(&width_of) {
                    *masks.entry(seg.signal).or_default() |= seg.mask();
                }
            }
            masks
        };

        let mut access = Vec::with_capacity(design.processes.len());
        let mut sensitivity: HashMap<SignalId, Vec<(ProcessId, u64)>> = HashMap::new();
        let mut comb = Vec::new();
        let mut clocks: Vec<ClockWatch> = Vec::new();
        for (pid, decl) in design.processes.iter() {
            let reads = flatten(decl.reads.as_slice());
            let drives = flatten(decl.drives.as_slice());
            match decl.kind {
                ProcessKind::Combinational => {
                    comb.push(pid);
                    for (&signal, &bits) in &reads {
                        sensitivity.entry(signal).or_default().push((pid, bits));
                    }
                }
                ProcessKind::Sequential { clock, edge } => {
                    match clocks.iter_mut().find(|w| w.signal == clock) {
                        Some(watch) => watch.triggers.push((pid, edge)),
                        None => clocks.push(ClockWatch {
                            signal: clock,
                            last: false,
                            triggers: vec![(pid, edge)],
                        }),
                    }
                }
            }
            access.push(ProcessAccess {
                reads,
                drives,
                memories: decl.memories.clone(),
                sequential: decl.kind.is_sequential(),
            });
        }
        for list in sensitivity.values_mut() {
            list.sort_by_key(|(pid, _)| *pid);
        }

        Ok(Self {
            design,
            bodies,
            signals,
            memories,
            access,
            sensitivity,
            comb,
            clocks,
            stimulus: BTreeSet::new(),
            time: SimTime::zero(),
            config,
            stats: SimStats::default(),
            initialized: false,
            failure: None,
        })
    }

    /// The design being simulated.
    pub fn design(&self) -> &Design {
        &self.design
    }

    /// Current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Run statistics so far.
    pub fn stats(&self) -> SimStats {
        self.stats
    }

    /// The committed value of a signal.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this design.
    pub fn value(&self, id: SignalId) -> Bits {
        self.signals[id].value()
    }

    /// The committed value of a signal, or `None` for a foreign ID.
    pub fn try_value(&self, id: SignalId) -> Option<Bits> {
        self.signals.try_get(id).map(SignalState::value)
    }

    /// Reads a memory cell.
    pub fn memory_cell(&self, memory: MemoryId, address: u64) -> Result<Bits, SimError> {
        let state = self
            .memories
            .try_get(memory)
            .ok_or_else(|| SimError::UnknownName(memory.to_string()))?;
        state.read(address).ok_or_else(|| SimError::AddressOutOfRange {
            memory: self.design.memories[memory].name.clone(),
            address,
            depth: state.depth(),
        })
    }

    /// Schedules a stimulus value, applied at the start of the next step.
    ///
    /// Unlike process writes, stimulus is never truncated: a value wider than
    /// the signal is rejected.
    pub fn set(&mut self, signal: SignalId, value: u64) -> Result<(), SimError> {
        self.ensure_running()?;
        let decl = self
            .design
            .signals
            .try_get(signal)
            .ok_or_else(|| SimError::UnknownName(signal.to_string()))?;
        if value & !mask(decl.width) != 0 {
            return Err(SimError::Stimulus {
                signal: decl.name.clone(),
                value,
                width: decl.width,
            });
        }
        self.signals[signal].write_value(value);
        self.stimulus.insert(signal);
        Ok(())
    }

    /// Runs every combinational process once and settles. Called implicitly
    /// by the first [`step`](Self::step).
    pub fn initialize(&mut self) -> Result<(), SimError> {
        self.ensure_running()?;
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;
        tracing::info!(
            design = %self.design.name,
            signals = self.signals.len(),
            processes = self.design.processes.len(),
            "simulation starting"
        );
        let result = self.initial_pass();
        self.guard(result)
    }

    fn initial_pass(&mut self) -> Result<(), SimError> {
        let all: Vec<ProcessId> = self.comb.clone();
        self.stats.deltas += 1;
        let dirty = self.eval_combinational(&all)?;
        self.settle(dirty)?;
        for watch in &mut self.clocks {
            watch.last = !self.signals[watch.signal].value().is_zero();
        }
        Ok(())
    }

    /// Evaluates the current time point: stimulus, settle, and edge rounds.
    pub fn step(&mut self) -> Result<(), SimError> {
        self.initialize()?;
        let result = self.run_step();
        self.guard(result)
    }

    /// Whether an earlier error ended the run.
    pub fn is_aborted(&self) -> bool {
        self.failure.is_some()
    }

    fn ensure_running(&self) -> Result<(), SimError> {
        match &self.failure {
            Some((time, reason)) => Err(SimError::Aborted {
                time: *time,
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Ends the run on error, dropping every write staged before the failure.
    fn guard(&mut self, result: Result<(), SimError>) -> Result<(), SimError> {
        if let Err(e) = &result {
            tracing::error!(tick = self.time.tick, error = %e, "simulation aborted");
            self.failure = Some((self.time.tick, e.to_string()));
            for state in self.signals.values_mut() {
                state.discard();
            }
            self.stimulus.clear();
        }
        result
    }

    fn run_step(&mut self) -> Result<(), SimError> {
        let mut dirty = BTreeMap::new();
        for signal in std::mem::take(&mut self.stimulus) {
            let changed = self.signals[signal].commit();
            if changed != 0 {
                dirty.insert(signal, changed);
            }
        }
        self.settle(dirty)?;
        let rounds = self.edge_rounds()?;
        self.stats.steps += 1;
        tracing::debug!(tick = self.time.tick, deltas = self.time.delta, rounds, "step complete");
        Ok(())
    }

    /// Moves time forward by `ticks`.
    pub fn advance_time(&mut self, ticks: u64) {
        self.time = self.time.advance(ticks);
    }

    fn settle(&mut self, mut dirty: BTreeMap<SignalId, u64>) -> Result<(), SimError> {
        let mut iterations = 0u32;
        loop {
            let to_run = self.triggered(&dirty);
            if to_run.is_empty() {
                return Ok(());
            }
            if iterations >= self.config.max_settle_iterations {
                return Err(SimError::Convergence {
                    time: self.time.tick,
                    iterations,
                    signals: self.signal_names(dirty.keys().copied()),
                });
            }
            iterations += 1;
            self.time = self.time.next_delta();
            self.stats.deltas += 1;
            tracing::trace!(
                tick = self.time.tick,
                delta = self.time.delta,
                processes = to_run.len(),
                "delta"
            );
            dirty = self.eval_combinational(&to_run)?;
        }
    }

    fn triggered(&self, dirty: &BTreeMap<SignalId, u64>) -> Vec<ProcessId> {
        let mut run = BTreeSet::new();
        for (signal, changed) in dirty {
            if let Some(list) = self.sensitivity.get(signal) {
                run.extend(
                    list.iter()
                        .filter(|(_, bits)| bits & changed != 0)
                        .map(|(pid, _)| *pid),
                );
            }
        }
        run.into_iter().collect()
    }

    fn eval_combinational(&mut self, to_run: &[ProcessId]) -> Result<BTreeMap<SignalId, u64>, SimError> {
        let mut touched = BTreeSet::new();
        let mut memory_writes = Vec::new();
        for &pid in to_run {
            self.eval(pid, &mut touched, &mut memory_writes)?;
        }
        Ok(self.commit(touched))
    }

    fn edge_rounds(&mut self) -> Result<u32, SimError> {
        let mut rounds = 0u32;
        loop {
            let (fired, clocks) = self.detect_edges();
            if fired.is_empty() {
                return Ok(rounds);
            }
            if rounds >= self.config.max_edge_rounds {
                return Err(SimError::Convergence {
                    time: self.time.tick,
                    iterations: rounds,
                    signals: self.signal_names(clocks),
                });
            }
            rounds += 1;
            self.stats.edge_rounds += 1;
            self.stats.seq_firings += fired.len() as u64;
            tracing::debug!(tick = self.time.tick, round = rounds, fired = fired.len(), "edge round");

            let mut touched = BTreeSet::new();
            let mut memory_writes = Vec::new();
            for &pid in &fired {
                self.eval(pid, &mut touched, &mut memory_writes)?;
            }
            self.commit_memories(memory_writes)?;
            let dirty = self.commit(touched);
            self.settle(dirty)?;
        }
    }

    fn detect_edges(&mut self) -> (Vec<ProcessId>, Vec<SignalId>) {
        let mut fired = Vec::new();
        let mut clocks = Vec::new();
        for watch in &mut self.clocks {
            let now = !self.signals[watch.signal].value().is_zero();
            let before = std::mem::replace(&mut watch.last, now);
            if before == now {
                continue;
            }
            let start = fired.len();
            fired.extend(
                watch
                    .triggers
                    .iter()
                    .filter(|(_, edge)| edge.matches(before, now))
                    .map(|(pid, _)| *pid),
            );
            if fired.len() > start {
                clocks.push(watch.signal);
            }
        }
        fired.sort();
        (fired, clocks)
    }

    /// Runs one body against committed values, then stages its writes.
    fn eval(
        &mut self,
        pid: ProcessId,
        touched: &mut BTreeSet<SignalId>,
        memory_writes: &mut Vec<MemoryWrite>,
    ) -> Result<(), SimError> {
        let index = pid.as_raw() as usize;
        let mut ctx = EvalContext {
            access: &self.access[index],
            signals: &self.signals,
            memories: &self.memories,
            writes: Vec::new(),
            memory_writes: Vec::new(),
            tick: self.time.tick,
        };
        let body = &mut self.bodies[index];
        let result = body(&mut ctx);
        let EvalContext {
            writes,
            memory_writes: staged,
            ..
        } = ctx;
        result.map_err(|source| self.access_error(pid, source))?;

        for (signal, lo, field) in writes {
            self.signals[signal]
                .write_next(lo, field)
                .map_err(|e| self.access_error(pid, e.into()))?;
            touched.insert(signal);
        }
        memory_writes.extend(staged.into_iter().map(|(m, a, v)| (pid, m, a, v)));
        Ok(())
    }

    fn commit(&mut self, touched: BTreeSet<SignalId>) -> BTreeMap<SignalId, u64> {
        let mut dirty = BTreeMap::new();
        for signal in touched {
            let changed = self.signals[signal].commit();
            if changed != 0 {
                dirty.insert(signal, changed);
            }
        }
        dirty
    }

    fn commit_memories(&mut self, writes: Vec<MemoryWrite>) -> Result<(), SimError> {
        let mut owners: HashMap<(MemoryId, u64), ProcessId> = HashMap::new();
        for &(pid, memory, address, _) in &writes {
            if let Some(&first) = owners.get(&(memory, address)) {
                if first != pid {
                    return Err(SimError::MemoryWriteConflict {
                        memory: self.design.memories[memory].name.clone(),
                        address,
                        first: self.design.processes[first].name.clone(),
                        second: self.design.processes[pid].name.clone(),
                        time: self.time.tick,
                    });
                }
            }
            owners.insert((memory, address), pid);
        }
        for (_, memory, address, value) in writes {
            self.memories[memory].write(address, value);
        }
        Ok(())
    }

    fn access_error(&self, pid: ProcessId, source: AccessError) -> SimError {
        SimError::Access {
            process: self.design.processes[pid].name.clone(),
            time: self.time.tick,
            source,
        }
    }

    fn signal_names(&self, ids: impl IntoIterator<Item = SignalId>) -> Vec<String> {
        ids.into_iter()
            .take(8)
            .map(|id| self.design.signals[id].name.clone())
            .collect()
    }
}

/// The [`ProcessContext`] handed to a body during one evaluation.
struct EvalContext<'k> {
    access: &'k ProcessAccess,
    signals: &'k Arena<SignalId, SignalState>,
    memories: &'k Arena<MemoryId, MemoryState>,
    writes: Vec<(SignalId, u32, Bits)>,
    memory_writes: Vec<(MemoryId, u64, u64)>,
    tick: u64,
}

impl EvalContext<'_> {
    fn width_of(&self, id: SignalId) -> Option<u32> {
        self.signals.try_get(id).map(SignalState::width)
    }

    fn check_memory(&self, memory: MemoryId) -> Result<&MemoryState, AccessError> {
        if !self.access.sequential || !self.access.memories.contains(&memory) {
            return Err(AccessError::MemoryNotAccessible(memory));
        }
        self.memories
            .try_get(memory)
            .ok_or(AccessError::MemoryNotAccessible(memory))
    }
}

impl ProcessContext for EvalContext<'_> {
    fn read(&self, r: &SignalRef) -> Result<Bits, AccessError> {
        let width_of = |id| self.width_of(id);
        r.width_with(&width_of)?;
        for seg in r.segments(&width_of) {
            let allowed = self.access.reads.get(&seg.signal).copied().unwrap_or(0);
            if seg.mask() & !allowed != 0 {
                return Err(AccessError::UndeclaredRead(seg.signal));
            }
        }
        Ok(r.read_with(&|id| self.signals[id].value())?)
    }

    fn write_next(&mut self, r: &SignalRef, value: u64) -> Result<(), AccessError> {
        let parts = r.split_write(value, &|id| self.width_of(id))?;
        for (signal, lo, field) in &parts {
            let bits = mask(field.width()) << lo;
            let allowed = self.access.drives.get(signal).copied().unwrap_or(0);
            if bits & !allowed != 0 {
                return Err(AccessError::UndeclaredWrite(*signal));
            }
        }
        self.writes.extend(parts);
        Ok(())
    }

    fn read_memory(&self, memory: MemoryId, address: u64) -> Result<Bits, AccessError> {
        let state = self.check_memory(memory)?;
        state.read(address).ok_or(AccessError::AddressOutOfRange {
            memory,
            address,
            depth: state.depth(),
        })
    }

    fn write_memory_next(&mut self, memory: MemoryId, address: u64, value: u64) -> Result<(), AccessError> {
        let depth = self.check_memory(memory)?.depth();
        if address >= depth {
            return Err(AccessError::AddressOutOfRange {
                memory,
                address,
                depth,
            });
        }
        self.memory_writes.push((memory, address, value));
        Ok(())
    }

    fn time(&self) -> u64 {
        self.tick
    }
}
