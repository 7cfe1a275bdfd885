//! Testbench-facing simulation driver.
//!
//! [`Simulation`] wraps a [`SimKernel`] with name lookup, stimulus helpers
//! (clock ticking, exhaustive and seeded-random input sweeps), and trace
//! capture. After every step it records each traced signal that changed
//! into its [`MemoryTrace`] and into any attached [`TraceRecorder`]s.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tock_common::{mask, Bits};
use tock_ir::{ChunkInstance, Design, DesignVisitor, MemoryId, SignalDecl, SignalId};

use crate::error::SimError;
use crate::kernel::{SimKernel, SimStats};
use crate::time::SimTime;
use crate::trace::{MemoryTrace, TraceRecorder};
use crate::SimConfig;

/// Largest combined input width [`Simulation::exhaustive`] will sweep.
pub const MAX_SWEEP_BITS: u32 = 20;

/// A running simulation with stimulus helpers and trace capture.
pub struct Simulation {
    kernel: SimKernel,
    traced: Vec<SignalId>,
    last: Vec<Option<Bits>>,
    trace: MemoryTrace,
    recorders: Vec<Box<dyn TraceRecorder>>,
}

impl Simulation {
    /// Starts simulating `design` with default limits.
    pub fn new(design: Design) -> Result<Self, SimError> {
        Self::with_config(design, SimConfig::default())
    }

    /// Starts simulating `design`. The circuit is initialized (every
    /// combinational process run once and settled) before this returns.
    pub fn with_config(design: Design, config: SimConfig) -> Result<Self, SimError> {
        let filter = config.trace_signals.clone();
        let mut kernel = SimKernel::new(design, config)?;
        kernel.initialize()?;

        let design = kernel.design();
        for name in &filter {
            if design.find_signal(name).is_none() {
                return Err(SimError::UnknownName(name.clone()));
            }
        }
        let traced: Vec<SignalId> = design
            .signals
            .iter()
            .filter(|(_, s)| s.traced && (filter.is_empty() || filter.contains(&s.name)))
            .map(|(id, _)| id)
            .collect();

        let mut sim = Self {
            kernel,
            last: vec![None; traced.len()],
            traced,
            trace: MemoryTrace::new(),
            recorders: Vec::new(),
        };
        let mut trace = std::mem::take(&mut sim.trace);
        sim.attach(&mut trace)?;
        sim.trace = trace;
        for (slot, &id) in sim.last.iter_mut().zip(&sim.traced) {
            *slot = Some(sim.kernel.value(id));
        }
        Ok(sim)
    }

    /// Attaches another recorder. It receives the current value of every
    /// traced signal immediately, then every later change.
    pub fn add_recorder(&mut self, mut recorder: Box<dyn TraceRecorder>) -> Result<(), SimError> {
        self.attach(recorder.as_mut())?;
        self.recorders.push(recorder);
        Ok(())
    }

    fn attach(&self, recorder: &mut dyn TraceRecorder) -> Result<(), SimError> {
        let design = self.kernel.design();
        let mut registrar = Registrar {
            recorder: &mut *recorder,
            traced: self.traced.iter().copied().collect(),
            result: Ok(()),
        };
        design.walk(&mut registrar);
        registrar.result?;
        let tick = self.kernel.time().tick;
        for &id in &self.traced {
            recorder.record(tick, id, self.kernel.value(id))?;
        }
        Ok(())
    }

    /// The design being simulated.
    pub fn design(&self) -> &Design {
        self.kernel.design()
    }

    /// Current time.
    pub fn time(&self) -> SimTime {
        self.kernel.time()
    }

    /// Run statistics so far.
    pub fn stats(&self) -> SimStats {
        self.kernel.stats()
    }

    /// The in-memory trace.
    pub fn trace(&self) -> &MemoryTrace {
        &self.trace
    }

    /// Looks up a signal by hierarchical name.
    pub fn signal(&self, name: &str) -> Result<SignalId, SimError> {
        self.design()
            .find_signal(name)
            .ok_or_else(|| SimError::UnknownName(name.to_string()))
    }

    /// Looks up a memory by hierarchical name.
    pub fn memory(&self, name: &str) -> Result<MemoryId, SimError> {
        self.design()
            .find_memory(name)
            .ok_or_else(|| SimError::UnknownName(name.to_string()))
    }

    /// Schedules a stimulus value for the next step.
    pub fn set(&mut self, signal: SignalId, value: u64) -> Result<(), SimError> {
        self.kernel.set(signal, value)
    }

    /// Schedules a stimulus value by signal name.
    pub fn set_by_name(&mut self, name: &str, value: u64) -> Result<(), SimError> {
        let id = self.signal(name)?;
        self.kernel.set(id, value)
    }

    /// Evaluates the current time point, records the result, then moves
    /// time forward by `ticks`.
    pub fn advance(&mut self, ticks: u64) -> Result<(), SimError> {
        self.kernel.step()?;
        self.sample()?;
        self.kernel.advance_time(ticks);
        Ok(())
    }

    /// One full clock cycle: low for a tick, then high for a tick.
    pub fn tick_clock(&mut self, clock: SignalId) -> Result<(), SimError> {
        self.set(clock, 0)?;
        self.advance(1)?;
        self.set(clock, 1)?;
        self.advance(1)
    }

    /// Runs `cycles` full clock cycles.
    pub fn run_clock(&mut self, clock: SignalId, cycles: u64) -> Result<(), SimError> {
        for _ in 0..cycles {
            self.tick_clock(clock)?;
        }
        Ok(())
    }

    /// Applies every combination of `inputs`, one tick each, calling `check`
    /// after each. The first input holds the most significant bits of the
    /// combination counter. Returns the number of combinations applied.
    pub fn exhaustive<F>(&mut self, inputs: &[SignalId], mut check: F) -> Result<u64, SimError>
    where
        F: FnMut(&Simulation, &[u64]),
    {
        let widths = self.input_widths(inputs)?;
        let total: u32 = widths.iter().sum();
        if total > MAX_SWEEP_BITS {
            return Err(SimError::SweepTooWide {
                bits: total,
                max: MAX_SWEEP_BITS,
            });
        }
        let combinations = 1u64 << total;
        let mut values = vec![0u64; inputs.len()];
        for combo in 0..combinations {
            let mut shift = total;
            for (i, (&id, &width)) in inputs.iter().zip(&widths).enumerate() {
                shift -= width;
                values[i] = (combo >> shift) & mask(width);
                self.set(id, values[i])?;
            }
            self.advance(1)?;
            check(self, &values);
        }
        Ok(combinations)
    }

    /// Applies `count` seeded random vectors to `inputs`, one tick each,
    /// calling `check` after each. The same seed always produces the same
    /// sequence.
    pub fn random<F>(&mut self, inputs: &[SignalId], count: u64, seed: u64, mut check: F) -> Result<(), SimError>
    where
        F: FnMut(&Simulation, &[u64]),
    {
        let widths = self.input_widths(inputs)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut values = vec![0u64; inputs.len()];
        for _ in 0..count {
            for (i, (&id, &width)) in inputs.iter().zip(&widths).enumerate() {
                values[i] = rng.gen::<u64>() & mask(width);
                self.set(id, values[i])?;
            }
            self.advance(1)?;
            check(self, &values);
        }
        Ok(())
    }

    fn input_widths(&self, inputs: &[SignalId]) -> Result<Vec<u32>, SimError> {
        inputs
            .iter()
            .map(|&id| {
                self.design()
                    .signals
                    .try_get(id)
                    .map(|s| s.width)
                    .ok_or_else(|| SimError::UnknownName(id.to_string()))
            })
            .collect()
    }

    /// The committed value of a signal.
    ///
    /// # Panics
    ///
    /// Panics if `signal` does not belong to this design.
    pub fn value(&self, signal: SignalId) -> u64 {
        self.kernel.value(signal).as_u64()
    }

    /// The committed value of a signal, with its width.
    pub fn bits(&self, signal: SignalId) -> Bits {
        self.kernel.value(signal)
    }

    /// The committed value of a signal looked up by name.
    pub fn value_by_name(&self, name: &str) -> Result<u64, SimError> {
        Ok(self.value(self.signal(name)?))
    }

    /// The contents of one memory cell.
    pub fn memory_cell(&self, memory: MemoryId, address: u64) -> Result<u64, SimError> {
        Ok(self.kernel.memory_cell(memory, address)?.as_u64())
    }

    /// The state name a state signal currently holds, or `None` if the signal
    /// has no enumeration or holds an undeclared value.
    pub fn state_name(&self, signal: SignalId) -> Option<&str> {
        let value = self.kernel.try_value(signal)?.as_u64();
        self.design().signals.try_get(signal)?.state_name(value)
    }

    /// Flushes every attached recorder and returns the run statistics.
    pub fn finish(&mut self) -> Result<SimStats, SimError> {
        for rec in &mut self.recorders {
            rec.finalize()?;
        }
        let stats = self.kernel.stats();
        tracing::info!(
            tick = self.kernel.time().tick,
            steps = stats.steps,
            deltas = stats.deltas,
            edge_rounds = stats.edge_rounds,
            "simulation finished"
        );
        Ok(stats)
    }

    /// Consumes the simulation and returns the in-memory trace.
    pub fn into_trace(self) -> MemoryTrace {
        self.trace
    }

    fn sample(&mut self) -> Result<(), SimError> {
        let tick = self.kernel.time().tick;
        for (slot, &id) in self.last.iter_mut().zip(&self.traced) {
            let value = self.kernel.value(id);
            if *slot == Some(value) {
                continue;
            }
            *slot = Some(value);
            self.trace.record(tick, id, value)?;
            for rec in &mut self.recorders {
                rec.record(tick, id, value)?;
            }
        }
        Ok(())
    }
}

/// Registers traced signals with a recorder, one scope per chunk instance.
struct Registrar<'r> {
    recorder: &'r mut dyn TraceRecorder,
    traced: HashSet<SignalId>,
    result: Result<(), SimError>,
}

impl DesignVisitor for Registrar<'_> {
    fn enter_chunk(&mut self, _design: &Design, chunk: &ChunkInstance, _depth: usize) {
        if self.result.is_ok() {
            self.result = self.recorder.begin_scope(&chunk.name);
        }
    }

    fn visit_signal(&mut self, _design: &Design, signal: &SignalDecl) {
        if self.result.is_ok() && self.traced.contains(&signal.id) {
            self.result = self
                .recorder
                .register_signal(signal.id, &signal.name, signal.width);
        }
    }

    fn exit_chunk(&mut self, _design: &Design, _chunk: &ChunkInstance, _depth: usize) {
        if self.result.is_ok() {
            self.result = self.recorder.end_scope();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::VcdRecorder;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tock_ir::{DesignBuilder, Edge};

    fn counter_design() -> Design {
        let mut b = DesignBuilder::new("top");
        let clk = b.wire("clk").unwrap();
        let cnt = b.bus("cnt", 3).unwrap();
        let hidden = b.internal_bus("hidden", 3).unwrap();
        b.seq("count", clk, Edge::Rising)
            .reads([cnt])
            .drives([cnt])
            .body(move |ctx| {
                let v = ctx.get(cnt)?;
                ctx.set(cnt, v + 1)
            })
            .unwrap();
        b.comb("mirror").reads([cnt]).drives([hidden]).body(move |ctx| {
            let v = ctx.get(cnt)?;
            ctx.set(hidden, v)
        })
        .unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn run_clock_counts_edges() {
        let mut sim = Simulation::new(counter_design()).unwrap();
        let clk = sim.signal("clk").unwrap();
        sim.run_clock(clk, 10).unwrap();
        assert_eq!(sim.value_by_name("cnt").unwrap(), 10 % 8);
        assert_eq!(sim.time().tick, 20);
    }

    #[test]
    fn trace_skips_internal_signals() {
        let mut sim = Simulation::new(counter_design()).unwrap();
        let clk = sim.signal("clk").unwrap();
        sim.run_clock(clk, 2).unwrap();
        let trace = sim.trace();
        let names: Vec<_> = trace.signals.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["clk", "cnt"]);
        // Rising edges land on ticks 1 and 3.
        assert_eq!(trace.history("cnt"), vec![(0, 0), (1, 1), (3, 2)]);
        assert_eq!(trace.value_at("clk", 2), Some(0));
    }

    #[test]
    fn trace_filter_limits_signals() {
        let config = SimConfig {
            trace_signals: vec!["cnt".into()],
            ..SimConfig::default()
        };
        let sim = Simulation::with_config(counter_design(), config).unwrap();
        assert_eq!(sim.trace().signals.len(), 1);
    }

    #[test]
    fn trace_filter_rejects_unknown_names() {
        let config = SimConfig {
            trace_signals: vec!["nope".into()],
            ..SimConfig::default()
        };
        assert!(matches!(
            Simulation::with_config(counter_design(), config),
            Err(SimError::UnknownName(_))
        ));
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn vcd_recorder_sees_scopes_and_changes() {
        let buf = SharedBuf::default();
        let mut sim = Simulation::new(counter_design()).unwrap();
        sim.add_recorder(Box::new(VcdRecorder::new(buf.clone()))).unwrap();
        let clk = sim.signal("clk").unwrap();
        sim.run_clock(clk, 1).unwrap();
        sim.finish().unwrap();
        let text = String::from_utf8(buf.0.borrow().clone()).unwrap();
        assert!(text.contains("$scope module top $end"));
        assert!(text.contains("$var wire 3 \" cnt $end"));
        assert!(!text.contains("hidden"));
        assert!(text.contains("#1\n1!\nb001 \"\n"));
    }

    #[test]
    fn exhaustive_covers_all_combinations() {
        let mut b = DesignBuilder::new("top");
        let a = b.bus("a", 2).unwrap();
        let c = b.wire("c").unwrap();
        let y = b.bus("y", 3).unwrap();
        b.comb("add").reads([a, c]).drives([y]).body(move |ctx| {
            let v = ctx.get(a)? + ctx.get(c)?;
            ctx.set(y, v)
        })
        .unwrap();
        let mut sim = Simulation::new(b.finish().unwrap()).unwrap();
        let mut seen = Vec::new();
        let n = sim
            .exhaustive(&[a, c], |s, v| {
                assert_eq!(s.value(y), v[0] + v[1]);
                seen.push((v[0], v[1]));
            })
            .unwrap();
        assert_eq!(n, 8);
        assert_eq!(seen[0], (0, 0));
        assert_eq!(seen[1], (0, 1));
        assert_eq!(seen[7], (3, 1));
    }

    #[test]
    fn exhaustive_rejects_wide_sweeps() {
        let mut b = DesignBuilder::new("top");
        let a = b.bus("a", 16).unwrap();
        let c = b.bus("c", 8).unwrap();
        let mut sim = Simulation::new(b.finish().unwrap()).unwrap();
        assert!(matches!(
            sim.exhaustive(&[a, c], |_, _| {}),
            Err(SimError::SweepTooWide { bits: 24, .. })
        ));
    }

    #[test]
    fn random_is_reproducible() {
        let run = |seed| {
            let mut b = DesignBuilder::new("top");
            let a = b.bus("a", 5).unwrap();
            let mut sim = Simulation::new(b.finish().unwrap()).unwrap();
            let mut seen = Vec::new();
            sim.random(&[a], 16, seed, |_, v| seen.push(v[0])).unwrap();
            seen
        };
        let first = run(7);
        assert_eq!(first, run(7));
        assert!(first.iter().all(|&v| v < 32));
    }

    #[test]
    fn state_name_reflects_value() {
        let mut b = DesignBuilder::new("top");
        let s = b.state_signal("state", &["IDLE", "BUSY"], 0).unwrap();
        let mut sim = Simulation::new(b.finish().unwrap()).unwrap();
        assert_eq!(sim.state_name(s), Some("IDLE"));
        sim.set(s, 1).unwrap();
        sim.advance(1).unwrap();
        assert_eq!(sim.state_name(s), Some("BUSY"));
    }

    #[test]
    fn unknown_names_reported() {
        let mut sim = Simulation::new(counter_design()).unwrap();
        assert!(matches!(sim.set_by_name("nope", 1), Err(SimError::UnknownName(_))));
        assert!(matches!(sim.memory("mem"), Err(SimError::UnknownName(_))));
    }
}
