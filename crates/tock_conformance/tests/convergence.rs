//! Scheduler limits: combinational settling and cascaded clock edges.

use tock_conformance::{config, inverter_ring};
use tock_ir::{Design, DesignBuilder, Edge, SignalId};
use tock_sim::{SimConfig, SimError, Simulation};

fn limits(toml: &str) -> SimConfig {
    SimConfig::from_config(&config(toml))
}

#[test]
fn odd_inverter_ring_never_settles() {
    let err = Simulation::with_config(inverter_ring(3), limits("[simulation]\nmax_settle_iterations = 7\n"))
        .err()
        .expect("ring must not settle");
    match err {
        SimError::Convergence {
            time,
            iterations,
            signals,
        } => {
            assert_eq!(time, 0);
            assert_eq!(iterations, 7);
            assert_eq!(signals, ["n0", "n1", "n2"]);
        }
        other => panic!("expected convergence error, got {other}"),
    }
}

/// `depth` buffers in series from `a` to `y`.
fn buffer_chain(depth: usize) -> (Design, SignalId) {
    let mut b = DesignBuilder::new("chain");
    let a = b.wire("a").unwrap();
    let mut prev = a;
    for k in 0..depth {
        let next = b.wire(&format!("b{k}")).unwrap();
        b.comb(&format!("buf{k}"))
            .reads([prev])
            .drives([next])
            .body(move |ctx| {
                let v = ctx.get(prev)?;
                ctx.set(next, v)
            })
            .unwrap();
        prev = next;
    }
    (b.finish().unwrap(), a)
}

#[test]
fn settle_cap_counts_delta_iterations() {
    let (design, a) = buffer_chain(5);
    let mut sim = Simulation::with_config(design, limits("[simulation]\nmax_settle_iterations = 5\n")).unwrap();
    sim.set(a, 1).unwrap();
    sim.advance(1).unwrap();
    assert_eq!(sim.value_by_name("b4").unwrap(), 1);
    assert_eq!(sim.stats().deltas, 1 + 5);

    let (design, a) = buffer_chain(5);
    let mut sim = Simulation::with_config(design, limits("[simulation]\nmax_settle_iterations = 4\n")).unwrap();
    sim.set(a, 1).unwrap();
    assert!(matches!(
        sim.advance(1),
        Err(SimError::Convergence { iterations: 4, .. })
    ));
}

#[test]
fn failed_step_is_not_resumed() {
    let (design, a) = buffer_chain(5);
    let mut sim = Simulation::with_config(design, limits("[simulation]\nmax_settle_iterations = 4\n")).unwrap();
    sim.set(a, 1).unwrap();
    let first = sim.advance(1).unwrap_err();
    assert!(matches!(first, SimError::Convergence { .. }));

    for _ in 0..2 {
        match sim.advance(1) {
            Err(SimError::Aborted { time, reason }) => {
                assert_eq!(time, 0);
                assert_eq!(reason, first.to_string());
            }
            other => panic!("expected aborted run, got {other:?}"),
        }
    }
    assert!(matches!(sim.set(a, 0), Err(SimError::Aborted { .. })));
    assert_eq!(sim.value_by_name("b4").unwrap(), 0);
}

#[test]
fn edge_cascade_failure_ends_the_run() {
    let cfg = config("[simulation]\nmax_edge_rounds = 3\n");
    let (design, ping) = ping_pong();
    let mut sim = Simulation::with_config(design, SimConfig::from_config(&cfg)).unwrap();
    sim.set(ping, 1).unwrap();
    assert!(sim.advance(1).is_err());
    assert!(matches!(sim.advance(1), Err(SimError::Aborted { .. })));
}

/// Two flops on both edges of each other's output.
fn ping_pong() -> (Design, SignalId) {
    let mut b = DesignBuilder::new("pingpong");
    let ping = b.wire("ping").unwrap();
    let pong = b.wire("pong").unwrap();
    for (name, clock, out) in [("hit", ping, pong), ("return", pong, ping)] {
        b.seq(name, clock, Edge::Both)
            .reads([out])
            .drives([out])
            .body(move |ctx| {
                let v = ctx.get(out)?;
                ctx.set(out, v ^ 1)
            })
            .unwrap();
    }
    (b.finish().unwrap(), ping)
}

#[test]
fn edge_cascade_stops_at_round_cap() {
    let (design, ping) = ping_pong();
    let mut sim = Simulation::with_config(design, limits("[simulation]\nmax_edge_rounds = 5\n")).unwrap();
    sim.set(ping, 1).unwrap();
    let err = sim.advance(1).unwrap_err();
    assert!(matches!(err, SimError::Convergence { iterations: 5, .. }));
    assert!(err.to_string().contains("did not converge"), "{err}");
}

#[test]
fn default_limits_allow_a_long_finite_cascade() {
    let (design, a) = buffer_chain(200);
    let mut sim = Simulation::new(design).unwrap();
    sim.set(a, 1).unwrap();
    sim.advance(1).unwrap();
    assert_eq!(sim.value_by_name("b199").unwrap(), 1);
}
