//! Pulse-width modulators and the triangle ramp that sweeps one.

use tock_common::mask;
use tock_ir::{Chunk, DesignBuilder, Edge, ElabError, PortSpec, Ports};

use crate::{clog2, invalid};

/// Free-running PWM: a `width`-bit counter wraps every `2^width` edges and
/// `pwm_o` is high while the counter is below `threshold_i`.
#[derive(Debug, Clone, Copy)]
pub struct PwmSimple {
    /// Counter and threshold width.
    pub width: u32,
}

impl Chunk for PwmSimple {
    fn kind(&self) -> &str {
        "pwm_simple"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("clk_i", 1),
            PortSpec::input("threshold_i", self.width),
            PortSpec::output("pwm_o", 1),
        ]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        let clk = io.clock("clk_i")?;
        let (threshold, pwm) = (io.get("threshold_i")?, io.get("pwm_o")?);
        let cnt = b.bus("cnt", self.width)?;

        b.seq("cntr_logic", clk, Edge::Rising)
            .reads([cnt])
            .drives([cnt])
            .body(move |ctx| {
                let v = ctx.get(cnt)?;
                ctx.set(cnt, v.wrapping_add(1))
            })?;

        let (rt, rp) = (threshold.clone(), pwm.clone());
        b.comb("output_logic")
            .reads([cnt.into(), threshold])
            .drives([pwm])
            .body(move |ctx| {
                let high = ctx.get(cnt)? < ctx.get(&rt)?;
                ctx.set(&rp, u64::from(high))
            })?;
        Ok(())
    }
}

/// PWM with an explicit period: the counter runs `0..duration` and wraps.
#[derive(Debug, Clone, Copy)]
pub struct PwmPeriodic {
    /// Pulse period in edges.
    pub duration: u64,
    /// Width of `threshold_i`.
    pub threshold_width: u32,
}

impl Chunk for PwmPeriodic {
    fn kind(&self) -> &str {
        "pwm_periodic"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("clk_i", 1),
            PortSpec::input("threshold_i", self.threshold_width),
            PortSpec::output("pwm_o", 1),
        ]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        if self.duration == 0 {
            return Err(invalid("pwm_periodic", "duration must be at least 1"));
        }
        let clk = io.clock("clk_i")?;
        let (threshold, pwm) = (io.get("threshold_i")?, io.get("pwm_o")?);
        let cnt = b.bus("cnt", clog2(self.duration))?;
        let last = self.duration - 1;

        b.seq("cntr_logic", clk, Edge::Rising)
            .reads([cnt])
            .drives([cnt])
            .body(move |ctx| {
                let v = ctx.get(cnt)?;
                ctx.set(cnt, if v == last { 0 } else { v + 1 })
            })?;

        let (rt, rp) = (threshold.clone(), pwm.clone());
        b.comb("output_logic")
            .reads([cnt.into(), threshold])
            .drives([pwm])
            .body(move |ctx| {
                let high = ctx.get(cnt)? < ctx.get(&rt)?;
                ctx.set(&rp, u64::from(high))
            })?;
        Ok(())
    }
}

/// Periodic PWM that latches `threshold_i` into `threshold_r` only at the end
/// of each period, so a threshold change never produces a runt pulse. The
/// first period runs with a zero threshold.
#[derive(Debug, Clone, Copy)]
pub struct PwmGlitchless {
    /// Pulse period in edges.
    pub interval: u64,
    /// Width of `threshold_i`.
    pub threshold_width: u32,
}

impl Chunk for PwmGlitchless {
    fn kind(&self) -> &str {
        "pwm_glitchless"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("clk_i", 1),
            PortSpec::input("threshold_i", self.threshold_width),
            PortSpec::output("pwm_o", 1),
        ]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        if self.interval == 0 {
            return Err(invalid("pwm_glitchless", "interval must be at least 1"));
        }
        let clk = io.clock("clk_i")?;
        let (threshold, pwm) = (io.get("threshold_i")?, io.get("pwm_o")?);
        let cnt = b.bus("cnt", clog2(self.interval))?;
        let threshold_r = b.bus("threshold_r", self.threshold_width)?;
        let last = self.interval - 1;

        let rt = threshold.clone();
        b.seq("cntr_logic", clk, Edge::Rising)
            .reads([cnt.into(), threshold])
            .drives([cnt, threshold_r])
            .body(move |ctx| {
                let v = ctx.get(cnt)?;
                if v == last {
                    ctx.set(cnt, 0)?;
                    let t = ctx.get(&rt)?;
                    ctx.set(threshold_r, t)
                } else {
                    ctx.set(cnt, v + 1)
                }
            })?;

        let rp = pwm.clone();
        b.comb("output_logic")
            .reads([cnt, threshold_r])
            .drives([pwm])
            .body(move |ctx| {
                let high = ctx.get(cnt)? < ctx.get(threshold_r)?;
                ctx.set(&rp, u64::from(high))
            })?;
        Ok(())
    }
}

/// Triangle wave on `ramp_o`: counts 1 up to `2^width - 1`, back down to 0,
/// and up again.
#[derive(Debug, Clone, Copy)]
pub struct Ramp {
    /// Output width, at least 2.
    pub width: u32,
}

impl Chunk for Ramp {
    fn kind(&self) -> &str {
        "ramp"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("clk_i", 1), PortSpec::output("ramp_o", self.width)]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        if self.width < 2 {
            return Err(invalid("ramp", "width must be at least 2"));
        }
        let clk = io.clock("clk_i")?;
        let ramp = io.get("ramp_o")?;
        let delta = b.internal_bus("delta", self.width)?;
        let top = mask(self.width);

        let r = ramp.clone();
        b.seq("logic", clk, Edge::Rising)
            .reads([ramp.clone(), delta.into()])
            .drives([ramp, delta.into()])
            .body(move |ctx| {
                let (v, d) = (ctx.get(&r)?, ctx.get(delta)?);
                ctx.set(&r, v.wrapping_add(d) & top)?;
                if v == 1 {
                    ctx.set(delta, 1)
                } else if v == top - 1 {
                    // Minus one in two's complement.
                    ctx.set(delta, top)
                } else if d == 0 {
                    ctx.set(delta, 1)?;
                    ctx.set(&r, 1)
                } else {
                    Ok(())
                }
            })?;
        Ok(())
    }
}

/// An LED that slowly brightens and dims: a [`Ramp`] of `length` bits whose
/// top four bits set the threshold of a 4-bit [`PwmSimple`].
#[derive(Debug, Clone, Copy)]
pub struct WaxWane {
    /// Ramp width, at least 4.
    pub length: u32,
}

impl Chunk for WaxWane {
    fn kind(&self) -> &str {
        "wax_wane"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("clk_i", 1), PortSpec::output("led_o", 1)]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        if self.length < 4 {
            return Err(invalid("wax_wane", "length must be at least 4"));
        }
        let clk = io.clock("clk_i")?;
        let led = io.get("led_o")?;
        let ramp = b.bus("ramp", self.length)?;
        b.instantiate(
            "ramp_gen",
            &Ramp { width: self.length },
            &[("clk_i", clk.into()), ("ramp_o", ramp.into())],
        )?;
        b.instantiate(
            "pwm",
            &PwmSimple { width: 4 },
            &[
                ("clk_i", clk.into()),
                ("threshold_i", ramp.slice(self.length - 4, self.length)),
                ("pwm_o", led),
            ],
        )?;
        Ok(())
    }
}
