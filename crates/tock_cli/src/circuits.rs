//! Catalog of built-in circuits.
//!
//! Each entry wraps one block from `tock_blocks` in a top-level chunk whose
//! signals are named after the block's ports without the `_i`/`_o` suffix,
//! so `--set` assignments and trace files use short names like `clk` and
//! `cnt`.

use tock_blocks::{
    classic_fsm, Adder, Blinker, Counter, CounterEnRst, Debouncer, DualPortRam, PwmGlitchless,
    PwmPeriodic, RecordPlay, Register, SimpleRam, UnknownStatePolicy, WaxWane,
};
use tock_ir::{Chunk, Design, DesignBuilder, ElabError, SignalRef};

/// Build-time knobs shared by every circuit.
#[derive(Debug, Clone, Copy)]
pub struct CircuitParams {
    /// The circuit's size parameter.
    pub param: u64,
    /// Unknown-state policy for circuits containing state machines.
    pub policy: UnknownStatePolicy,
}

/// One catalog entry.
pub struct Circuit {
    /// Name used on the command line.
    pub name: &'static str,
    /// One-line description.
    pub about: &'static str,
    /// Meaning of the size parameter.
    pub param_doc: &'static str,
    /// Parameter used when none is given.
    pub default_param: u64,
    /// Clock signal name, or `None` for purely combinational circuits.
    pub clock: Option<&'static str>,
    build: fn(&CircuitParams) -> Result<Box<dyn Chunk>, ElabError>,
}

impl Circuit {
    /// Elaborates the circuit under a top chunk named after it.
    pub fn elaborate(&self, params: &CircuitParams) -> Result<Design, ElabError> {
        let block = (self.build)(params)?;
        wrap(self.name, block.as_ref())
    }
}

fn width(param: u64) -> Result<u32, ElabError> {
    u32::try_from(param).map_err(|_| ElabError::InvalidParameter {
        chunk: "circuit".into(),
        reason: format!("parameter {param} is not a valid width"),
    })
}

/// Every built-in circuit, in display order.
pub const CIRCUITS: &[Circuit] = &[
    Circuit {
        name: "blinker",
        about: "LED driven by the top bit of a free-running counter",
        param_doc: "counter length in bits",
        default_param: 3,
        clock: Some("clk"),
        build: |p| Ok(Box::new(Blinker { length: width(p.param)? })),
    },
    Circuit {
        name: "counter",
        about: "register plus ripple adder counting every edge",
        param_doc: "counter width",
        default_param: 4,
        clock: Some("clk"),
        build: |p| Ok(Box::new(Counter { width: width(p.param)? })),
    },
    Circuit {
        name: "counter_en_rst",
        about: "counter with enable and synchronous reset",
        param_doc: "counter width",
        default_param: 4,
        clock: Some("clk"),
        build: |p| Ok(Box::new(CounterEnRst { width: width(p.param)? })),
    },
    Circuit {
        name: "register",
        about: "bank of D flip-flops",
        param_doc: "register width",
        default_param: 8,
        clock: Some("clk"),
        build: |p| Ok(Box::new(Register { width: width(p.param)? })),
    },
    Circuit {
        name: "adder",
        about: "combinational ripple-carry adder",
        param_doc: "operand width",
        default_param: 4,
        clock: None,
        build: |p| Ok(Box::new(Adder { width: width(p.param)? })),
    },
    Circuit {
        name: "ram",
        about: "single-port RAM, 8-bit words, read-first",
        param_doc: "address width",
        default_param: 4,
        clock: Some("clk"),
        build: |p| {
            Ok(Box::new(SimpleRam {
                addr_width: width(p.param)?,
                data_width: 8,
                policy: Default::default(),
            }))
        },
    },
    Circuit {
        name: "dualport_ram",
        about: "RAM with separate read and write addresses, 8-bit words",
        param_doc: "address width",
        default_param: 4,
        clock: Some("clk"),
        build: |p| {
            Ok(Box::new(DualPortRam {
                addr_width: width(p.param)?,
                data_width: 8,
            }))
        },
    },
    Circuit {
        name: "debouncer",
        about: "button debouncer",
        param_doc: "edges the input must stay stable",
        default_param: 3,
        clock: Some("clk"),
        build: |p| Ok(Box::new(Debouncer { time: p.param })),
    },
    Circuit {
        name: "classic_fsm",
        about: "four-state walker with edge-detected forward/back inputs",
        param_doc: "input debounce time (0 disables debouncing)",
        default_param: 0,
        clock: Some("clk"),
        build: |p| {
            let fsm = classic_fsm().edge_detect(true).policy(p.policy);
            Ok(Box::new(match p.param {
                0 => fsm,
                time => fsm.debounce(time),
            }))
        },
    },
    Circuit {
        name: "pwm",
        about: "periodic PWM with an 8-bit threshold",
        param_doc: "period in edges",
        default_param: 10,
        clock: Some("clk"),
        build: |p| {
            Ok(Box::new(PwmPeriodic {
                duration: p.param,
                threshold_width: 8,
            }))
        },
    },
    Circuit {
        name: "pwm_glitchless",
        about: "PWM latching its 8-bit threshold at period end",
        param_doc: "period in edges",
        default_param: 10,
        clock: Some("clk"),
        build: |p| {
            Ok(Box::new(PwmGlitchless {
                interval: p.param,
                threshold_width: 8,
            }))
        },
    },
    Circuit {
        name: "wax_wane",
        about: "LED brightness following a triangle ramp",
        param_doc: "ramp width in bits",
        default_param: 6,
        clock: Some("clk"),
        build: |p| Ok(Box::new(WaxWane { length: width(p.param)? })),
    },
    Circuit {
        name: "record_play",
        about: "records button B into RAM and replays it on the LEDs",
        param_doc: "sample-enable rollover in clocks",
        default_param: 3,
        clock: Some("clk"),
        build: |p| {
            Ok(Box::new(RecordPlay {
                rollover: p.param,
                policy: p.policy,
                ..RecordPlay::default()
            }))
        },
    },
];

/// Looks up a circuit by name.
pub fn find(name: &str) -> Option<&'static Circuit> {
    CIRCUITS.iter().find(|c| c.name == name)
}

/// Port name without its `_i`/`_o` suffix.
fn short_name(port: &str) -> &str {
    port.strip_suffix("_i")
        .or_else(|| port.strip_suffix("_o"))
        .unwrap_or(port)
}

/// Instantiates `block` as `name` with one top-level signal per port. Ports
/// whose short names collide, like `data_i` and `data_o`, keep their full name.
fn wrap(name: &str, block: &dyn Chunk) -> Result<Design, ElabError> {
    let ports = block.ports();
    let mut b = DesignBuilder::new(&format!("{name}_top"));
    let mut bindings: Vec<(&str, SignalRef)> = Vec::with_capacity(ports.len());
    for port in &ports {
        let short = short_name(&port.name);
        let clashes = ports
            .iter()
            .filter(|p| short_name(&p.name) == short)
            .count()
            > 1;
        let signal = b.bus(if clashes { &port.name } else { short }, port.width)?;
        bindings.push((port.name.as_str(), signal.into()));
    }
    b.instantiate(name, block, &bindings)?;
    b.finish()
}
