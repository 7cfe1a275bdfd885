//! Finite-state machines over a closed state enumeration.
//!
//! An [`Fsm`] elaborates to a state signal restricted to `S::ALL`, one
//! rising-edge process computing the next state, and one combinational
//! process decoding the committed state to the outputs. Keeping the decoder
//! separate means outputs never see a next state before it is committed.
//!
//! Optional stages, in input order:
//!
//! 1. per-bit [`Debouncer`]s on the raw inputs,
//! 2. rising-edge detection (`inputs & !prev_inputs`), so a held input acts
//!    once; `prev_inputs` is sampled every edge, which adds one edge of
//!    latency,
//! 3. a reset period forcing the initial state for the first `reset_edges`
//!    edges after start.

use std::rc::Rc;

use tock_common::mask;
use tock_config::UnknownStateSetting;
use tock_ir::{AccessError, Chunk, DesignBuilder, Edge, ElabError, PortSpec, Ports, SignalRef};

use crate::debounce::Debouncer;
use crate::{clog2, invalid};

/// A closed set of symbolic states. The encoded value of a state is its
/// position in [`ALL`](Self::ALL).
pub trait StateEnum: Copy + Eq + 'static {
    /// Every state, in encoding order.
    const ALL: &'static [Self];

    /// Display name used for the state signal's enumeration.
    fn name(self) -> &'static str;

    /// Encoded value of this state.
    fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// Decodes a value, or `None` if it names no state.
    fn from_index(value: u64) -> Option<Self> {
        usize::try_from(value).ok().and_then(|i| Self::ALL.get(i).copied())
    }
}

/// What the next-state process does when the state signal holds a value
/// outside the enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownStatePolicy {
    /// Log a warning and go to the initial state.
    #[default]
    Recover,
    /// Fail the step with [`AccessError::UnknownState`].
    Fail,
}

impl From<UnknownStateSetting> for UnknownStatePolicy {
    fn from(setting: UnknownStateSetting) -> Self {
        match setting {
            UnknownStateSetting::Recover => Self::Recover,
            UnknownStateSetting::Fail => Self::Fail,
        }
    }
}

type TransitionFn<S> = Rc<dyn Fn(S, u64) -> S>;
type OutputFn<S> = Rc<dyn Fn(S) -> u64>;

/// A Moore state machine with ports `clk_i`, `inputs_i`, and `outputs_o`.
pub struct Fsm<S: StateEnum> {
    input_width: u32,
    output_width: u32,
    initial: S,
    reset_edges: u32,
    edge_detect: bool,
    debounce: Option<u64>,
    policy: UnknownStatePolicy,
    unknown_output: u64,
    transition: TransitionFn<S>,
    output: OutputFn<S>,
}

impl<S: StateEnum> Fsm<S> {
    /// A machine starting in `initial`. `transition` maps the current state
    /// and the (possibly debounced and edge-detected) inputs to the next
    /// state; `output` decodes a state to the output pattern.
    pub fn new(
        input_width: u32,
        output_width: u32,
        initial: S,
        transition: impl Fn(S, u64) -> S + 'static,
        output: impl Fn(S) -> u64 + 'static,
    ) -> Self {
        Self {
            input_width,
            output_width,
            initial,
            reset_edges: 0,
            edge_detect: false,
            debounce: None,
            policy: UnknownStatePolicy::default(),
            unknown_output: mask(output_width.clamp(1, 64)),
            transition: Rc::new(transition),
            output: Rc::new(output),
        }
    }

    /// Forces the initial state for the first `edges` rising edges.
    pub fn reset_edges(mut self, edges: u32) -> Self {
        self.reset_edges = edges;
        self
    }

    /// Reacts only to 0-to-1 input transitions.
    pub fn edge_detect(mut self, enabled: bool) -> Self {
        self.edge_detect = enabled;
        self
    }

    /// Debounces every input bit over `time` edges.
    pub fn debounce(mut self, time: u64) -> Self {
        self.debounce = Some(time);
        self
    }

    /// Sets the unknown-state policy.
    pub fn policy(mut self, policy: UnknownStatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Output pattern shown while the state is undeclared. Defaults to all ones.
    pub fn unknown_output(mut self, pattern: u64) -> Self {
        self.unknown_output = pattern;
        self
    }
}

impl<S: StateEnum> Chunk for Fsm<S> {
    fn kind(&self) -> &str {
        "fsm"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("clk_i", 1),
            PortSpec::input("inputs_i", self.input_width),
            PortSpec::output("outputs_o", self.output_width),
        ]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        if S::ALL.is_empty() {
            return Err(invalid("fsm", "state enumeration is empty"));
        }
        let clk = io.clock("clk_i")?;
        let (inputs, outputs) = (io.get("inputs_i")?, io.get("outputs_o")?);
        let names: Vec<&str> = S::ALL.iter().map(|s| s.name()).collect();
        let state = b.state_signal("state", &names, self.initial.index())?;

        let mut raw = inputs.clone();
        if let Some(time) = self.debounce {
            let clean = b.internal_bus("dbnc_inputs", self.input_width)?;
            for k in 0..self.input_width {
                let bit = b.bit_of(&inputs, k)?;
                b.instantiate(
                    &format!("debouncer{k}"),
                    &Debouncer { time },
                    &[("clk_i", clk.into()), ("button_i", bit), ("button_o", clean.bit(k))],
                )?;
            }
            raw = clean.into();
        }

        let mut seen = raw.clone();
        let mut prev = None;
        if self.edge_detect {
            let p = b.bus("prev_inputs", self.input_width)?;
            let chg = b.bus("input_chgs", self.input_width)?;
            let r = raw.clone();
            b.comb("detect_chg")
                .reads([raw.clone(), p.into()])
                .drives([chg])
                .body(move |ctx| {
                    let v = ctx.get(&r)? & !ctx.get(p)?;
                    ctx.set(chg, v)
                })?;
            seen = chg.into();
            prev = Some(p);
        }

        let reset_cnt = match self.reset_edges {
            0 => None,
            n => Some(b.internal_bus("reset_cnt", clog2(u64::from(n) + 1))?),
        };

        let mut reads = vec![seen.clone(), SignalRef::from(state)];
        let mut drives = vec![SignalRef::from(state)];
        if let Some(p) = prev {
            reads.push(raw.clone());
            drives.push(p.into());
        }
        if let Some(r) = reset_cnt {
            reads.push(r.into());
            drives.push(r.into());
        }

        let transition = Rc::clone(&self.transition);
        let (initial, policy) = (self.initial, self.policy);
        let reset_edges = u64::from(self.reset_edges);
        let label = io.instance().to_string();
        b.seq("next_state_logic", clk, Edge::Rising)
            .reads(reads)
            .drives(drives)
            .body(move |ctx| {
                if let Some(p) = prev {
                    let v = ctx.get(&raw)?;
                    ctx.set(p, v)?;
                }
                if let Some(r) = reset_cnt {
                    let n = ctx.get(r)?;
                    if n < reset_edges {
                        ctx.set(r, n + 1)?;
                        return ctx.set(state, initial.index() as u64);
                    }
                }
                let current = ctx.get(state)?;
                let next = match S::from_index(current) {
                    Some(s) => transition(s, ctx.get(&seen)?),
                    None if policy == UnknownStatePolicy::Fail => {
                        return Err(AccessError::UnknownState {
                            signal: state,
                            value: current,
                        });
                    }
                    None => {
                        tracing::warn!(
                            fsm = %label,
                            value = current,
                            tick = ctx.time(),
                            "undeclared state, returning to {}",
                            initial.name()
                        );
                        initial
                    }
                };
                ctx.set(state, next.index() as u64)
            })?;

        let output = Rc::clone(&self.output);
        let unknown = self.unknown_output;
        let rout = outputs.clone();
        b.comb("output_logic")
            .reads([state])
            .drives([outputs])
            .body(move |ctx| {
                let pattern = match S::from_index(ctx.get(state)?) {
                    Some(s) => output(s),
                    None => unknown,
                };
                ctx.set(&rout, pattern)
            })?;
        Ok(())
    }
}

/// States of the four-state walker built by [`classic_fsm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassicState {
    /// Initial state; output `0b0001`.
    A,
    /// Output `0b0010`.
    B,
    /// Output `0b0100`.
    C,
    /// Output `0b1000`.
    D,
}

impl StateEnum for ClassicState {
    const ALL: &'static [Self] = &[Self::A, Self::B, Self::C, Self::D];

    fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

/// The classic walker: input bit 0 steps forward (A, B, C, D, A), bit 1
/// steps backward, forward wins if both are set. The first three edges hold
/// state A. Outputs are one-hot per state.
pub fn classic_fsm() -> Fsm<ClassicState> {
    use ClassicState::*;
    Fsm::new(
        2,
        4,
        A,
        |state, inputs| {
            let (fwd, bck) = (inputs & 0b01 != 0, inputs & 0b10 != 0);
            match (state, fwd, bck) {
                (A, true, _) => B,
                (B, true, _) => C,
                (C, true, _) => D,
                (D, true, _) => A,
                (A, false, true) => D,
                (B, false, true) => A,
                (C, false, true) => B,
                (D, false, true) => C,
                (s, false, false) => s,
            }
        },
        |state| 1 << state.index(),
    )
    .reset_edges(3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tock_ir::SignalId;
    use tock_sim::{SimError, Simulation};

    const NOP: u64 = 0b00;
    const FWD: u64 = 0b01;
    const BCK: u64 = 0b10;

    struct Bench {
        sim: Simulation,
        clk: SignalId,
        inputs: SignalId,
        outputs: SignalId,
        state: SignalId,
    }

    impl Bench {
        fn new<S: StateEnum>(fsm: Fsm<S>, input_width: u32, output_width: u32) -> Self {
            let mut b = DesignBuilder::new("top");
            let clk = b.wire("clk").unwrap();
            let inputs = b.bus("inputs", input_width).unwrap();
            let outputs = b.bus("outputs", output_width).unwrap();
            b.instantiate(
                "fsm",
                &fsm,
                &[("clk_i", clk.into()), ("inputs_i", inputs.into()), ("outputs_o", outputs.into())],
            )
            .unwrap();
            let sim = Simulation::new(b.finish().unwrap()).unwrap();
            let state = sim.signal("fsm.state").unwrap();
            Self {
                sim,
                clk,
                inputs,
                outputs,
                state,
            }
        }

        /// Applies each input for one clock and returns the state names after each edge.
        fn run(&mut self, seq: &[u64]) -> String {
            let mut names = String::new();
            for &v in seq {
                self.sim.set(self.inputs, v).unwrap();
                self.sim.tick_clock(self.clk).unwrap();
                names.push_str(self.sim.state_name(self.state).unwrap_or("?"));
            }
            names
        }
    }

    #[test]
    fn classic_walks_forward_and_back() {
        let mut t = Bench::new(classic_fsm(), 2, 4);
        assert_eq!(t.sim.value(t.outputs), 0b0001);
        let states = t.run(&[NOP, NOP, NOP, NOP, FWD, FWD, FWD, BCK, BCK, BCK]);
        assert_eq!(states, "AAAABCDCBA");
        assert_eq!(t.sim.value(t.outputs), 0b0001);
        t.run(&[FWD, FWD]);
        assert_eq!(t.sim.value(t.outputs), 0b0100);
    }

    #[test]
    fn reset_period_holds_initial_state() {
        let mut t = Bench::new(classic_fsm(), 2, 4);
        let states = t.run(&[FWD, FWD, FWD, FWD, FWD]);
        assert_eq!(states, "AAABC");
    }

    #[test]
    fn edge_detection_acts_once_per_press() {
        let mut t = Bench::new(classic_fsm().edge_detect(true), 2, 4);
        let states = t.run(&[NOP, NOP, NOP, NOP, FWD, FWD, FWD, BCK, BCK, BCK]);
        assert_eq!(states, "AAAABBBAAA");
        let states = t.run(&[FWD, NOP, FWD, NOP, FWD, NOP, BCK, NOP, BCK, NOP, BCK, NOP]);
        assert_eq!(states, "BBCCDDCCBBAA");
        let chgs = t.sim.signal("fsm.input_chgs").unwrap();
        assert_eq!(t.sim.value(chgs), 0);
    }

    #[test]
    fn debounced_inputs_ignore_glitches() {
        let mut t = Bench::new(classic_fsm().edge_detect(true).debounce(2), 2, 4);
        t.run(&[NOP; 4]);
        let glitch = t.run(&[FWD, NOP, FWD, NOP, NOP, NOP, NOP, NOP]);
        assert_eq!(glitch, "AAAAAAAA");
        t.run(&[FWD; 8]);
        assert_eq!(t.sim.state_name(t.state), Some("B"));
        t.run(&[NOP; 8]);
        t.run(&[FWD; 8]);
        assert_eq!(t.sim.state_name(t.state), Some("C"));
        assert_eq!(t.sim.value(t.outputs), 0b0100);
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Tri {
        X,
        Y,
        Z,
    }

    impl StateEnum for Tri {
        const ALL: &'static [Self] = &[Tri::X, Tri::Y, Tri::Z];

        fn name(self) -> &'static str {
            match self {
                Tri::X => "X",
                Tri::Y => "Y",
                Tri::Z => "Z",
            }
        }
    }

    fn tri_fsm() -> Fsm<Tri> {
        Fsm::new(
            1,
            3,
            Tri::X,
            |s, go| match (s, go) {
                (s, 0) => s,
                (Tri::X, _) => Tri::Y,
                (Tri::Y, _) => Tri::Z,
                (Tri::Z, _) => Tri::X,
            },
            |s| 1 << s.index(),
        )
    }

    #[test]
    fn unreachable_state_recovers_to_initial() {
        let mut t = Bench::new(tri_fsm(), 1, 3);
        t.run(&[1]);
        assert_eq!(t.sim.state_name(t.state), Some("Y"));
        t.sim.set(t.clk, 0).unwrap();
        t.sim.set(t.state, 3).unwrap();
        t.sim.advance(1).unwrap();
        assert_eq!(t.sim.state_name(t.state), None);
        assert_eq!(t.sim.value(t.outputs), 0b111);
        t.sim.set(t.clk, 1).unwrap();
        t.sim.advance(1).unwrap();
        assert_eq!(t.sim.state_name(t.state), Some("X"));
        assert_eq!(t.sim.value(t.outputs), 0b001);
    }

    #[test]
    fn unreachable_state_fails_under_strict_policy() {
        let mut t = Bench::new(tri_fsm().policy(UnknownStatePolicy::Fail).unknown_output(0), 1, 3);
        t.sim.set(t.state, 3).unwrap();
        t.sim.advance(1).unwrap();
        assert_eq!(t.sim.value(t.outputs), 0);
        t.sim.set(t.clk, 1).unwrap();
        let err = t.sim.advance(1).unwrap_err();
        assert!(matches!(
            err,
            SimError::Access {
                source: AccessError::UnknownState { value: 3, .. },
                ..
            }
        ));
    }

    #[test]
    fn policy_from_config_setting() {
        assert_eq!(UnknownStatePolicy::from(UnknownStateSetting::Fail), UnknownStatePolicy::Fail);
        assert_eq!(UnknownStatePolicy::from(UnknownStateSetting::default()), UnknownStatePolicy::Recover);
    }

    #[test]
    fn state_signal_declares_names() {
        let t = Bench::new(classic_fsm(), 2, 4);
        let decl = t.sim.design().signal(t.state);
        assert_eq!(decl.width, 2);
        assert_eq!(decl.states.as_deref().map(<[String]>::len), Some(4));
        assert_eq!(decl.state_name(2), Some("C"));
    }
}
