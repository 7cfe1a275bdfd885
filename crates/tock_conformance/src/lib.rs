//! Conformance test helpers for the tock simulator.
//!
//! Provides a [`Bench`] that wraps one building block in a top-level chunk
//! with a signal per port, plus small reference circuits (flip-flop chains,
//! swapping registers, combinational loops) used by the integration tests
//! to check scheduling semantics end to end.

#![warn(missing_docs)]

use std::collections::HashMap;

use tock_blocks::Dff;
use tock_config::TockConfig;
use tock_ir::{Chunk, Design, DesignBuilder, Edge, SignalId, SignalRef};
use tock_sim::{SimConfig, SimError, Simulation};

/// A simulated block with its ports bound to top-level signals of the same
/// name (`clk_i`, `d_i`, ...).
pub struct Bench {
    /// The running simulation.
    pub sim: Simulation,
    ports: HashMap<String, SignalId>,
}

impl Bench {
    /// Elaborates `block` as instance `dut` and starts a default simulation.
    pub fn new(block: &dyn Chunk) -> Self {
        Self::with_config(block, SimConfig::default())
    }

    /// Like [`Bench::new`] with explicit scheduler limits.
    pub fn with_config(block: &dyn Chunk, config: SimConfig) -> Self {
        let mut b = DesignBuilder::new("bench");
        let mut ports = HashMap::new();
        let mut bindings: Vec<(String, SignalRef)> = Vec::new();
        for port in block.ports() {
            let signal = b.bus(&port.name, port.width).unwrap();
            ports.insert(port.name.clone(), signal);
            bindings.push((port.name, signal.into()));
        }
        let bindings: Vec<(&str, SignalRef)> = bindings
            .iter()
            .map(|(name, r)| (name.as_str(), r.clone()))
            .collect();
        b.instantiate("dut", block, &bindings).unwrap();
        let sim = Simulation::with_config(b.finish().unwrap(), config).unwrap();
        Self { sim, ports }
    }

    /// The top-level signal bound to `port`.
    pub fn port(&self, port: &str) -> SignalId {
        *self
            .ports
            .get(port)
            .unwrap_or_else(|| panic!("no port named {port}"))
    }

    /// Drives an input port for the following cycles.
    pub fn set(&mut self, port: &str, value: u64) {
        let id = self.port(port);
        self.sim.set(id, value).unwrap();
    }

    /// Current value of a port.
    pub fn get(&self, port: &str) -> u64 {
        self.sim.value(self.port(port))
    }

    /// Runs one full cycle of `clk_i`.
    pub fn cycle(&mut self) -> Result<(), SimError> {
        let clk = self.port("clk_i");
        self.sim.tick_clock(clk)
    }

    /// Runs `n` cycles and returns `port` sampled after each rising edge.
    pub fn sample(&mut self, port: &str, n: usize) -> Vec<u64> {
        (0..n)
            .map(|_| {
                self.cycle().unwrap();
                self.get(port)
            })
            .collect()
    }
}

/// `n` flip-flops in series from `d` to `q`, with the stages exposed as
/// `stage0..stage{n-1}` where the last stage is `q`.
pub fn dff_chain(n: usize) -> Design {
    let mut b = DesignBuilder::new("chain");
    let clk = b.wire("clk").unwrap();
    let mut prev = b.wire("d").unwrap();
    for k in 0..n {
        let name = if k + 1 == n { "q".to_string() } else { format!("stage{k}") };
        let next = b.wire(&name).unwrap();
        b.instantiate(
            &format!("ff{k}"),
            &Dff,
            &[("clk_i", clk.into()), ("d_i", prev.into()), ("q_o", next.into())],
        )
        .unwrap();
        prev = next;
    }
    b.finish().unwrap()
}

/// Two 8-bit registers `a` and `b` that exchange values on every rising
/// edge of `clk`, as two independent processes.
pub fn swapping_registers(a_init: u64, b_init: u64) -> Design {
    let mut b = DesignBuilder::new("swap");
    let clk = b.wire("clk").unwrap();
    let ra = b.bus_with_init("a", 8, a_init).unwrap();
    let rb = b.bus_with_init("b", 8, b_init).unwrap();
    for (name, from, to) in [("a_from_b", rb, ra), ("b_from_a", ra, rb)] {
        b.seq(name, clk, Edge::Rising)
            .reads([from])
            .drives([to])
            .body(move |ctx| {
                let v = ctx.get(from)?;
                ctx.set(to, v)
            })
            .unwrap();
    }
    b.finish().unwrap()
}

/// A ring of `n` inverters, which never settles for odd `n`.
pub fn inverter_ring(n: usize) -> Design {
    let mut b = DesignBuilder::new("ring");
    let nodes: Vec<SignalId> = (0..n).map(|k| b.wire(&format!("n{k}")).unwrap()).collect();
    for k in 0..n {
        let (input, output) = (nodes[k], nodes[(k + 1) % n]);
        b.comb(&format!("inv{k}"))
            .reads([input])
            .drives([output])
            .body(move |ctx| {
                let v = ctx.get(input)?;
                ctx.set(output, v ^ 1)
            })
            .unwrap();
    }
    b.finish().unwrap()
}

/// Parses a `tock.toml` body, panicking on invalid input.
pub fn config(toml: &str) -> TockConfig {
    tock_config::load_config_from_str(toml).unwrap()
}
