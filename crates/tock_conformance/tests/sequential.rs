//! Clocked semantics: edge-triggered capture, atomic commit, polarity, and
//! stimulus validation.

use proptest::prelude::*;
use tock_conformance::{dff_chain, swapping_registers};
use tock_ir::{DesignBuilder, Edge};
use tock_sim::{SimError, Simulation};

proptest! {
    #[test]
    fn dff_chain_delays_input_by_its_length(
        n in 1usize..6,
        bits in proptest::collection::vec(0u64..2, 1..24),
    ) {
        let mut sim = Simulation::new(dff_chain(n)).unwrap();
        let (clk, d, q) = (
            sim.signal("clk").unwrap(),
            sim.signal("d").unwrap(),
            sim.signal("q").unwrap(),
        );
        for (i, &bit) in bits.iter().enumerate() {
            sim.set(d, bit).unwrap();
            sim.tick_clock(clk).unwrap();
            let expected = if i + 1 >= n { bits[i + 1 - n] } else { 0 };
            prop_assert_eq!(sim.value(q), expected, "edge {}", i + 1);
        }
    }
}

#[test]
fn registers_swap_atomically() {
    let mut sim = Simulation::new(swapping_registers(0x12, 0x34)).unwrap();
    let (clk, a, b) = (
        sim.signal("clk").unwrap(),
        sim.signal("a").unwrap(),
        sim.signal("b").unwrap(),
    );
    sim.tick_clock(clk).unwrap();
    assert_eq!((sim.value(a), sim.value(b)), (0x34, 0x12));
    sim.tick_clock(clk).unwrap();
    assert_eq!((sim.value(a), sim.value(b)), (0x12, 0x34));
}

#[test]
fn level_changes_without_edges_do_nothing() {
    let mut sim = Simulation::new(dff_chain(1)).unwrap();
    let (clk, d, q) = (
        sim.signal("clk").unwrap(),
        sim.signal("d").unwrap(),
        sim.signal("q").unwrap(),
    );
    sim.set(clk, 1).unwrap();
    sim.advance(1).unwrap();
    sim.set(d, 1).unwrap();
    sim.advance(5).unwrap();
    assert_eq!(sim.value(q), 0, "clock held high");
    sim.set(clk, 0).unwrap();
    sim.advance(1).unwrap();
    assert_eq!(sim.value(q), 0, "falling edge");
    sim.set(clk, 1).unwrap();
    sim.advance(1).unwrap();
    assert_eq!(sim.value(q), 1);
}

#[test]
fn edge_polarity_selects_processes() {
    let mut b = DesignBuilder::new("top");
    let clk = b.wire("clk").unwrap();
    let counts = [
        (Edge::Rising, b.bus("rising", 8).unwrap()),
        (Edge::Falling, b.bus("falling", 8).unwrap()),
        (Edge::Both, b.bus("both", 8).unwrap()),
    ];
    for (edge, count) in counts {
        b.seq(&format!("{edge:?}"), clk, edge)
            .reads([count])
            .drives([count])
            .body(move |ctx| {
                let v = ctx.get(count)?;
                ctx.set(count, v + 1)
            })
            .unwrap();
    }
    let mut sim = Simulation::new(b.finish().unwrap()).unwrap();
    sim.run_clock(clk, 5).unwrap();
    // The first tick_clock drives clk low from its initial low: no edge.
    assert_eq!(sim.value_by_name("rising").unwrap(), 5);
    assert_eq!(sim.value_by_name("falling").unwrap(), 4);
    assert_eq!(sim.value_by_name("both").unwrap(), 9);
}

#[test]
fn oversized_stimulus_is_rejected() {
    let mut sim = Simulation::new(swapping_registers(0, 0)).unwrap();
    let a = sim.signal("a").unwrap();
    let err = sim.set(a, 0x100).unwrap_err();
    assert!(matches!(err, SimError::Stimulus { width: 8, value: 0x100, .. }));
    assert!(matches!(sim.signal("nope"), Err(SimError::UnknownName(_))));
}
