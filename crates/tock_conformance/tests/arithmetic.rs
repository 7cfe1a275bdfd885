//! Adders and counters checked against integer arithmetic.

use proptest::prelude::*;
use tock_blocks::{Adder, Counter, CounterEnRst};
use tock_common::mask;
use tock_conformance::Bench;

fn check_adder(width: u32) {
    let mut bench = Bench::new(&Adder { width });
    let inputs = [bench.port("a_i"), bench.port("b_i")];
    let (s, c) = (bench.port("s_o"), bench.port("c_o"));
    let combos = bench
        .sim
        .exhaustive(&inputs, |sim, v| {
            let total = v[0] + v[1];
            assert_eq!(sim.value(s), total & mask(width), "{} + {}", v[0], v[1]);
            assert_eq!(sim.value(c), total >> width, "carry of {} + {}", v[0], v[1]);
        })
        .unwrap();
    assert_eq!(combos, 1 << (2 * width));
}

#[test]
fn adder_width_1() {
    check_adder(1);
}

#[test]
fn adder_width_4() {
    check_adder(4);
}

#[test]
fn adder_width_8() {
    check_adder(8);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn counter_counts_modulo_width(width in 1u32..8, cycles in 0usize..300) {
        let mut bench = Bench::new(&Counter { width });
        for _ in 0..cycles {
            bench.cycle().unwrap();
        }
        prop_assert_eq!(bench.get("cnt_o"), cycles as u64 & mask(width));
    }
}

#[test]
fn counter_enable_and_reset() {
    let mut bench = Bench::new(&CounterEnRst { width: 3 });
    bench.set("en_i", 1);
    assert_eq!(bench.sample("cnt_o", 10), vec![1, 2, 3, 4, 5, 6, 7, 0, 1, 2]);
    bench.set("en_i", 0);
    assert_eq!(bench.sample("cnt_o", 2), vec![2, 2]);
    bench.set("rst_i", 1);
    bench.set("en_i", 1);
    assert_eq!(bench.sample("cnt_o", 2), vec![0, 0]);
    bench.set("rst_i", 0);
    assert_eq!(bench.sample("cnt_o", 3), vec![1, 2, 3]);
}
