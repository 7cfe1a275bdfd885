//! D flip-flop and the register built from it.

use tock_ir::{Chunk, DesignBuilder, Edge, ElabError, PortSpec, Ports};

/// A rising-edge D flip-flop: `q_o` takes `d_i` on each rising edge of `clk_i`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dff;

impl Chunk for Dff {
    fn kind(&self) -> &str {
        "dff"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("clk_i", 1),
            PortSpec::input("d_i", 1),
            PortSpec::output("q_o", 1),
        ]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        let clk = io.clock("clk_i")?;
        let d = io.get("d_i")?;
        let q = io.get("q_o")?;
        let (rd, rq) = (d.clone(), q.clone());
        b.seq("logic", clk, Edge::Rising)
            .reads([d])
            .drives([q])
            .body(move |ctx| {
                let v = ctx.get(&rd)?;
                ctx.set(&rq, v)
            })?;
        Ok(())
    }
}

/// A `width`-bit register made of one [`Dff`] per bit.
#[derive(Debug, Clone, Copy)]
pub struct Register {
    /// Number of bits.
    pub width: u32,
}

impl Chunk for Register {
    fn kind(&self) -> &str {
        "register"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("clk_i", 1),
            PortSpec::input("d_i", self.width),
            PortSpec::output("q_o", self.width),
        ]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        let clk = io.clock("clk_i")?;
        let d = io.get("d_i")?;
        let q = io.get("q_o")?;
        for k in 0..self.width {
            let dk = b.bit_of(&d, k)?;
            let qk = b.bit_of(&q, k)?;
            b.instantiate(
                &format!("dff{k}"),
                &Dff,
                &[("clk_i", clk.into()), ("d_i", dk), ("q_o", qk)],
            )?;
        }
        Ok(())
    }
}
