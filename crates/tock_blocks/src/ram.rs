//! Synchronous RAM variants.
//!
//! All three store `2^addr_width` words of `data_width` bits in a memory
//! array that is only touched by one rising-edge process. They differ in
//! when the read port updates:
//!
//! - [`Ram`] reads only on edges where the write flag is low (and the
//!   optional enable is high). A write leaves `data_o` unchanged.
//! - [`SimpleRam`] reads on every edge. When a write and a read of the same
//!   address coincide, [`ReadPolicy`] decides whether `data_o` shows the old
//!   word or the one being written.
//! - [`DualPortRam`] has separate write and read addresses. The read port
//!   always returns the word stored before the edge.

use tock_ir::{Chunk, DesignBuilder, Edge, ElabError, PortSpec, Ports};

/// Rising-edge RAM whose read is gated behind the write flag.
#[derive(Debug, Clone, Copy)]
pub struct Ram {
    /// Address width; the RAM holds `2^addr_width` words.
    pub addr_width: u32,
    /// Word width.
    pub data_width: u32,
    /// Adds an `en_i` port. While it is low the RAM neither reads nor writes.
    pub enable: bool,
}

impl Chunk for Ram {
    fn kind(&self) -> &str {
        "ram"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports = vec![PortSpec::input("clk_i", 1)];
        if self.enable {
            ports.push(PortSpec::input("en_i", 1));
        }
        ports.extend([
            PortSpec::input("wr_i", 1),
            PortSpec::input("addr_i", self.addr_width),
            PortSpec::input("data_i", self.data_width),
            PortSpec::output("data_o", self.data_width),
        ]);
        ports
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        let clk = io.clock("clk_i")?;
        let en = if self.enable { Some(io.get("en_i")?) } else { None };
        let (wr, addr) = (io.get("wr_i")?, io.get("addr_i")?);
        let (data_i, data_o) = (io.get("data_i")?, io.get("data_o")?);
        let mem = b.memory("mem", self.addr_width, self.data_width)?;

        let mut reads = vec![wr.clone(), addr.clone(), data_i.clone()];
        reads.extend(en.clone());
        let rout = data_o.clone();
        b.seq("logic", clk, Edge::Rising)
            .reads(reads)
            .drives([data_o])
            .memories([mem])
            .body(move |ctx| {
                if let Some(en) = &en {
                    if !ctx.is_high(en)? {
                        return Ok(());
                    }
                }
                let a = ctx.get(&addr)?;
                if ctx.is_high(&wr)? {
                    let v = ctx.get(&data_i)?;
                    ctx.write_memory_next(mem, a, v)
                } else {
                    let word = ctx.read_memory(mem, a)?;
                    ctx.set(&rout, word.as_u64())
                }
            })?;
        Ok(())
    }
}

/// Same-cycle read/write ordering for [`SimpleRam`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPolicy {
    /// `data_o` shows the word stored before the edge (read-old-value).
    #[default]
    ReadFirst,
    /// `data_o` shows the word being written on this edge.
    WriteFirst,
}

/// Rising-edge RAM that reads `addr_i` on every edge.
#[derive(Debug, Clone, Copy)]
pub struct SimpleRam {
    /// Address width; the RAM holds `2^addr_width` words.
    pub addr_width: u32,
    /// Word width.
    pub data_width: u32,
    /// Read-during-write behavior.
    pub policy: ReadPolicy,
}

impl Chunk for SimpleRam {
    fn kind(&self) -> &str {
        "simple_ram"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("clk_i", 1),
            PortSpec::input("wr_i", 1),
            PortSpec::input("addr_i", self.addr_width),
            PortSpec::input("data_i", self.data_width),
            PortSpec::output("data_o", self.data_width),
        ]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        let clk = io.clock("clk_i")?;
        let (wr, addr) = (io.get("wr_i")?, io.get("addr_i")?);
        let (data_i, data_o) = (io.get("data_i")?, io.get("data_o")?);
        let mem = b.memory("mem", self.addr_width, self.data_width)?;
        let policy = self.policy;

        let reads = [wr.clone(), addr.clone(), data_i.clone()];
        let rout = data_o.clone();
        b.seq("logic", clk, Edge::Rising)
            .reads(reads)
            .drives([data_o])
            .memories([mem])
            .body(move |ctx| {
                let a = ctx.get(&addr)?;
                let stored = ctx.read_memory(mem, a)?.as_u64();
                if ctx.is_high(&wr)? {
                    let v = ctx.get(&data_i)?;
                    ctx.write_memory_next(mem, a, v)?;
                    if policy == ReadPolicy::WriteFirst {
                        return ctx.set(&rout, v);
                    }
                }
                ctx.set(&rout, stored)
            })?;
        Ok(())
    }
}

/// Rising-edge RAM with independent write and read addresses.
#[derive(Debug, Clone, Copy)]
pub struct DualPortRam {
    /// Address width of both ports.
    pub addr_width: u32,
    /// Word width.
    pub data_width: u32,
}

impl Chunk for DualPortRam {
    fn kind(&self) -> &str {
        "dualport_ram"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("clk_i", 1),
            PortSpec::input("wr_i", 1),
            PortSpec::input("wr_addr_i", self.addr_width),
            PortSpec::input("rd_addr_i", self.addr_width),
            PortSpec::input("data_i", self.data_width),
            PortSpec::output("data_o", self.data_width),
        ]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        let clk = io.clock("clk_i")?;
        let wr = io.get("wr_i")?;
        let (wr_addr, rd_addr) = (io.get("wr_addr_i")?, io.get("rd_addr_i")?);
        let (data_i, data_o) = (io.get("data_i")?, io.get("data_o")?);
        let mem = b.memory("mem", self.addr_width, self.data_width)?;

        let reads = [wr.clone(), wr_addr.clone(), rd_addr.clone(), data_i.clone()];
        let rout = data_o.clone();
        b.seq("logic", clk, Edge::Rising)
            .reads(reads)
            .drives([data_o])
            .memories([mem])
            .body(move |ctx| {
                if ctx.is_high(&wr)? {
                    let (a, v) = (ctx.get(&wr_addr)?, ctx.get(&data_i)?);
                    ctx.write_memory_next(mem, a, v)?;
                }
                let word = ctx.read_memory(mem, ctx.get(&rd_addr)?)?;
                ctx.set(&rout, word.as_u64())
            })?;
        Ok(())
    }
}
