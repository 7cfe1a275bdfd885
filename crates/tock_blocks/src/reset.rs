//! Power-on reset and periodic sample-enable generators.

use tock_ir::{Chunk, DesignBuilder, Edge, ElabError, PortSpec, Ports};

use crate::{clog2, invalid};

/// Holds `reset_o` high for the first `edges` rising edges, then low.
#[derive(Debug, Clone, Copy)]
pub struct ResetGen {
    /// Length of the reset pulse in edges, at least 1.
    pub edges: u64,
}

impl Chunk for ResetGen {
    fn kind(&self) -> &str {
        "reset_gen"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("clk_i", 1), PortSpec::output("reset_o", 1)]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        if self.edges == 0 {
            return Err(invalid("reset_gen", "reset must last at least one edge"));
        }
        let clk = io.clock("clk_i")?;
        let reset = io.get("reset_o")?;
        let cnt = b.internal_bus("cntr", clog2(self.edges + 1))?;
        let edges = self.edges;
        let rr = reset.clone();
        b.seq("logic", clk, Edge::Rising)
            .reads([cnt])
            .drives([cnt.into(), reset])
            .body(move |ctx| {
                let n = ctx.get(cnt)?;
                if n < edges {
                    ctx.set(cnt, n + 1)?;
                    ctx.set(&rr, 1)
                } else {
                    ctx.set(&rr, 0)
                }
            })?;
        Ok(())
    }
}

/// Pulses `sample_o` for one clock every `rollover + 1` clocks.
#[derive(Debug, Clone, Copy)]
pub struct SampleEnable {
    /// Counter value at which the pulse fires and the counter restarts.
    pub rollover: u64,
}

impl SampleEnable {
    /// Sample enable for a `clock_hz` clock sampling at `sample_hz`.
    pub fn from_frequencies(clock_hz: u64, sample_hz: u64) -> Result<Self, ElabError> {
        if sample_hz == 0 {
            return Err(invalid("sample_en", "sample frequency must be positive"));
        }
        Ok(Self {
            rollover: clock_hz.div_ceil(sample_hz).saturating_sub(1),
        })
    }
}

impl Chunk for SampleEnable {
    fn kind(&self) -> &str {
        "sample_en"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("clk_i", 1), PortSpec::output("sample_o", 1)]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        let clk = io.clock("clk_i")?;
        let sample = io.get("sample_o")?;
        let cnt = b.internal_bus("cntr", clog2(self.rollover + 1))?;
        let rollover = self.rollover;
        let rs = sample.clone();
        b.seq("counter", clk, Edge::Rising)
            .reads([cnt])
            .drives([cnt.into(), sample])
            .body(move |ctx| {
                let n = ctx.get(cnt)?;
                if n == rollover {
                    ctx.set(cnt, 0)?;
                    ctx.set(&rs, 1)
                } else {
                    ctx.set(cnt, n + 1)?;
                    ctx.set(&rs, 0)
                }
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tock_sim::Simulation;

    fn outputs(chunk: &dyn Chunk, port: &str, edges: usize) -> Vec<u64> {
        let mut b = DesignBuilder::new("top");
        let clk = b.wire("clk").unwrap();
        let out = b.wire("out").unwrap();
        b.instantiate("dut", chunk, &[("clk_i", clk.into()), (port, out.into())])
            .unwrap();
        let mut sim = Simulation::new(b.finish().unwrap()).unwrap();
        (0..edges)
            .map(|_| {
                sim.tick_clock(clk).unwrap();
                sim.value(out)
            })
            .collect()
    }

    #[test]
    fn reset_pulse_length() {
        assert_eq!(outputs(&ResetGen { edges: 1 }, "reset_o", 4), vec![1, 0, 0, 0]);
        assert_eq!(outputs(&ResetGen { edges: 3 }, "reset_o", 6), vec![1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn zero_length_reset_is_rejected() {
        let mut b = DesignBuilder::new("top");
        let clk = b.wire("clk").unwrap();
        let out = b.wire("out").unwrap();
        let err = b
            .instantiate("rst", &ResetGen { edges: 0 }, &[("clk_i", clk.into()), ("reset_o", out.into())])
            .unwrap_err();
        assert!(matches!(err, ElabError::InvalidParameter { .. }));
    }

    #[test]
    fn sample_pulse_every_rollover() {
        let pulses = outputs(&SampleEnable { rollover: 3 }, "sample_o", 12);
        assert_eq!(pulses, vec![0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1]);
        let every = outputs(&SampleEnable { rollover: 0 }, "sample_o", 3);
        assert_eq!(every, vec![1, 1, 1]);
    }

    #[test]
    fn rollover_from_frequencies() {
        assert_eq!(SampleEnable::from_frequencies(12_000_000, 100).unwrap().rollover, 119_999);
        assert_eq!(SampleEnable::from_frequencies(10, 3).unwrap().rollover, 3);
        assert_eq!(SampleEnable::from_frequencies(1, 100).unwrap().rollover, 0);
        assert!(SampleEnable::from_frequencies(1, 0).is_err());
    }
}
