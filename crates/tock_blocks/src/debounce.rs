//! Button debouncer.

use tock_ir::{Chunk, DesignBuilder, Edge, ElabError, PortSpec, Ports};

use crate::clog2;

/// Filters a bouncing one-bit input.
///
/// Every rising edge the input is compared with the previous sample. A
/// change reloads the stability counter with `time`; an unchanged sample
/// counts it down to zero. `button_o` copies the previous sample only on
/// edges where the counter has already reached zero, so an input must hold
/// steady for `time + 1` consecutive edges before the output follows it, one
/// edge later. Shorter glitches never reach the output.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    /// Number of edges the input must stay unchanged.
    pub time: u64,
}

impl Chunk for Debouncer {
    fn kind(&self) -> &str {
        "debouncer"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("clk_i", 1),
            PortSpec::input("button_i", 1),
            PortSpec::output("button_o", 1),
        ]
    }

    fn build(&self, b: &mut DesignBuilder, io: &Ports) -> Result<(), ElabError> {
        let clk = io.clock("clk_i")?;
        let (button_i, button_o) = (io.get("button_i")?, io.get("button_o")?);
        let cnt = b.bus("dbcnt", clog2(self.time + 1))?;
        let prev = b.wire("prev_button")?;
        let time = self.time;

        let rin = button_i.clone();
        b.seq("next_state_logic", clk, Edge::Rising)
            .reads([button_i, prev.into(), cnt.into()])
            .drives([cnt, prev])
            .body(move |ctx| {
                let sample = ctx.get(&rin)?;
                if sample == ctx.get(prev)? {
                    let c = ctx.get(cnt)?;
                    if c != 0 {
                        ctx.set(cnt, c - 1)?;
                    }
                } else {
                    ctx.set(cnt, time)?;
                }
                ctx.set(prev, sample)
            })?;

        let rout = button_o.clone();
        b.seq("output_logic", clk, Edge::Rising)
            .reads([cnt, prev])
            .drives([button_o])
            .body(move |ctx| {
                if ctx.get(cnt)? == 0 {
                    let v = ctx.get(prev)?;
                    ctx.set(&rout, v)?;
                }
                Ok(())
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tock_ir::SignalId;
    use tock_sim::Simulation;

    fn bench(time: u64) -> (Simulation, SignalId, SignalId, SignalId) {
        let mut b = DesignBuilder::new("top");
        let clk = b.wire("clk").unwrap();
        let button_i = b.wire("button_i").unwrap();
        let button_o = b.wire("button_o").unwrap();
        b.instantiate(
            "db",
            &Debouncer { time },
            &[("clk_i", clk.into()), ("button_i", button_i.into()), ("button_o", button_o.into())],
        )
        .unwrap();
        (Simulation::new(b.finish().unwrap()).unwrap(), clk, button_i, button_o)
    }

    fn drive(sim: &mut Simulation, clk: SignalId, input: SignalId, level: u64, edges: u64) -> Vec<u64> {
        let out = sim.signal("button_o").unwrap();
        sim.set(input, level).unwrap();
        (0..edges)
            .map(|_| {
                sim.tick_clock(clk).unwrap();
                sim.value(out)
            })
            .collect()
    }

    #[test]
    fn counter_width_fits_threshold() {
        let (sim, ..) = bench(3);
        let cnt = sim.signal("db.dbcnt").unwrap();
        assert_eq!(sim.bits(cnt).width(), 2);
        let (sim, ..) = bench(120_000);
        assert_eq!(sim.bits(sim.signal("db.dbcnt").unwrap()).width(), 17);
    }

    #[test]
    fn stable_input_passes_after_threshold() {
        let (mut sim, clk, input, _) = bench(3);
        let outs = drive(&mut sim, clk, input, 1, 6);
        // Change seen on edge 1, counter 3,2,1,0 over edges 1..4, output on edge 5.
        assert_eq!(outs, vec![0, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn glitches_are_filtered() {
        let (mut sim, clk, input, output) = bench(3);
        let mut outs = drive(&mut sim, clk, input, 1, 2);
        outs.extend(drive(&mut sim, clk, input, 0, 2));
        outs.extend(drive(&mut sim, clk, input, 1, 2));
        outs.extend(drive(&mut sim, clk, input, 0, 6));
        assert!(outs.iter().all(|&v| v == 0), "{outs:?}");
        assert_eq!(sim.value(output), 0);
    }

    #[test]
    fn release_follows_press() {
        let (mut sim, clk, input, output) = bench(2);
        drive(&mut sim, clk, input, 1, 5);
        assert_eq!(sim.value(output), 1);
        let outs = drive(&mut sim, clk, input, 0, 5);
        assert_eq!(outs, vec![1, 1, 1, 0, 0]);
        assert_eq!(sim.value(output), 0);
    }
}
