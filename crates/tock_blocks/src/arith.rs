//! Adders and counters.
//!
//! [`Adder`] is a ripple-carry chain of [`FullAdderBit`]s. [`Counter`] feeds
//! its own output back through an adder into a [`Register`], the canonical
//! sequential feedback loop. [`Blinker`] drives an LED from a counter's most
//! significant bit.

use tock_ir::{Chunk, DesignBuilder, Edge, ElabError, PortSpec, Ports, SignalRef};

use crate::dff::Register;
use crate::invalid;

/// One bit of a ripple-carry adder.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullAdderBit;

impl Chunk for FullAdderBit {
    fn kind(&self) -> &str {
        "full_adder_bit"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("a_i", 1),
            PortSpec::input("b_i", 1),
            PortSpec::input("c_i", 1),
            PortSpec::output("s_o", 1),
            PortSpec::output("c_o", 1),
        ]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        let (a, bb, c) = (io.get("a_i")?, io.get("b_i")?, io.get("c_i")?);
        let (s, co) = (io.get("s_o")?, io.get("c_o")?);
        let reads = [a.clone(), bb.clone(), c.clone()];
        let drives = [s.clone(), co.clone()];
        b.comb("logic").reads(reads).drives(drives).body(move |ctx| {
            let (x, y, z) = (ctx.get(&a)?, ctx.get(&bb)?, ctx.get(&c)?);
            ctx.set(&s, x ^ y ^ z)?;
            ctx.set(&co, (x & y) | (x & z) | (y & z))
        })?;
        Ok(())
    }
}

/// A `width`-bit ripple-carry adder: `s_o = (a_i + b_i) mod 2^width`, with
/// the final carry on `c_o`.
#[derive(Debug, Clone, Copy)]
pub struct Adder {
    /// Operand and sum width.
    pub width: u32,
}

impl Chunk for Adder {
    fn kind(&self) -> &str {
        "adder"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("a_i", self.width),
            PortSpec::input("b_i", self.width),
            PortSpec::output("s_o", self.width),
            PortSpec::output("c_o", 1),
        ]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        let (a, bb, s, c_out) = (io.get("a_i")?, io.get("b_i")?, io.get("s_o")?, io.get("c_o")?);
        // carry[k] is the carry out of stage k, for every stage but the last.
        let carry = if self.width > 1 {
            Some(b.internal_bus("c", self.width - 1)?)
        } else {
            None
        };
        let zero = SignalRef::constant(1, 0).map_err(|e| invalid("adder", e.to_string()))?;
        for k in 0..self.width {
            let c_in = match (k, carry) {
                (0, _) | (_, None) => zero.clone(),
                (_, Some(c)) => c.bit(k - 1),
            };
            let c_o = match carry {
                Some(c) if k + 1 < self.width => c.bit(k),
                _ => c_out.clone(),
            };
            let bindings = [
                ("a_i", b.bit_of(&a, k)?),
                ("b_i", b.bit_of(&bb, k)?),
                ("c_i", c_in),
                ("s_o", b.bit_of(&s, k)?),
                ("c_o", c_o),
            ];
            b.instantiate(&format!("fa{k}"), &FullAdderBit, &bindings)?;
        }
        Ok(())
    }
}

/// A free-running `width`-bit counter: an [`Adder`] adding one to the
/// current count, loaded into a [`Register`] on every rising edge.
#[derive(Debug, Clone, Copy)]
pub struct Counter {
    /// Counter width.
    pub width: u32,
}

impl Chunk for Counter {
    fn kind(&self) -> &str {
        "counter"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("clk_i", 1), PortSpec::output("cnt_o", self.width)]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        let clk = io.clock("clk_i")?;
        let cnt = io.get("cnt_o")?;
        let one = SignalRef::constant(self.width, 1).map_err(|e| invalid("counter", e.to_string()))?;
        let next_cnt = b.internal_bus("next_cnt", self.width)?;
        let carry = b.internal_bus("carry", 1)?;
        b.instantiate(
            "adder",
            &Adder { width: self.width },
            &[
                ("a_i", one),
                ("b_i", cnt.clone()),
                ("s_o", next_cnt.into()),
                ("c_o", carry.into()),
            ],
        )?;
        b.instantiate(
            "register",
            &Register { width: self.width },
            &[("clk_i", clk.into()), ("d_i", next_cnt.into()), ("q_o", cnt)],
        )?;
        Ok(())
    }
}

/// A counter with synchronous reset and count enable. Reset wins over enable.
#[derive(Debug, Clone, Copy)]
pub struct CounterEnRst {
    /// Counter width.
    pub width: u32,
}

impl Chunk for CounterEnRst {
    fn kind(&self) -> &str {
        "counter_en_rst"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("clk_i", 1),
            PortSpec::input("en_i", 1),
            PortSpec::input("rst_i", 1),
            PortSpec::output("cnt_o", self.width),
        ]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        let clk = io.clock("clk_i")?;
        let (en, rst, out) = (io.get("en_i")?, io.get("rst_i")?, io.get("cnt_o")?);
        let cnt = b.internal_bus("cnt", self.width)?;

        let (ren, rrst) = (en.clone(), rst.clone());
        b.seq("next_state_logic", clk, Edge::Rising)
            .reads([en, rst, cnt.into()])
            .drives([cnt])
            .body(move |ctx| {
                if ctx.is_high(&rrst)? {
                    ctx.set(cnt, 0)
                } else if ctx.is_high(&ren)? {
                    let v = ctx.get(cnt)?;
                    ctx.set(cnt, v + 1)
                } else {
                    Ok(())
                }
            })?;

        let rout = out.clone();
        b.comb("output_logic").reads([cnt]).drives([out]).body(move |ctx| {
            let v = ctx.get(cnt)?;
            ctx.set(&rout, v)
        })?;
        Ok(())
    }
}

/// Blinks `led_o` from the most significant bit of a `length`-bit [`Counter`],
/// so the LED toggles every `2^(length-1)` clocks.
#[derive(Debug, Clone, Copy)]
pub struct Blinker {
    /// Counter length in bits.
    pub length: u32,
}

impl Chunk for Blinker {
    fn kind(&self) -> &str {
        "blinker"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("clk_i", 1), PortSpec::output("led_o", 1)]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        if self.length == 0 {
            return Err(invalid("blinker", "length must be at least 1"));
        }
        let clk = io.clock("clk_i")?;
        let led = io.get("led_o")?;
        let cnt = b.bus("cnt", self.length)?;
        b.instantiate(
            "counter",
            &Counter { width: self.length },
            &[("clk_i", clk.into()), ("cnt_o", cnt.into())],
        )?;
        let msb = cnt.bit(self.length - 1);
        let (rmsb, rled) = (msb.clone(), led.clone());
        b.comb("output_logic").reads([msb]).drives([led]).body(move |ctx| {
            let v = ctx.get(&rmsb)?;
            ctx.set(&rled, v)
        })?;
        Ok(())
    }
}
