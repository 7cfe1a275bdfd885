//! Synchronous building blocks for tock designs.
//!
//! Every block is a [`Chunk`](tock_ir::Chunk) expressed purely through the
//! `tock_ir` builder: flip-flops and registers, ripple adders and counters,
//! RAM variants, a button debouncer, a generic finite-state machine, PWM
//! generators, and the small utility blocks used by the record/playback
//! controller. Larger blocks are composed from smaller ones by instantiation,
//! so the elaborated hierarchy mirrors the structure of the hardware.
//!
//! Port names follow the `_i` / `_o` suffix convention for inputs and outputs.

#![warn(missing_docs)]

pub mod arith;
pub mod debounce;
pub mod dff;
pub mod fsm;
pub mod pwm;
pub mod ram;
pub mod record_play;
pub mod reset;

pub use arith::{Adder, Blinker, Counter, CounterEnRst, FullAdderBit};
pub use debounce::Debouncer;
pub use dff::{Dff, Register};
pub use fsm::{classic_fsm, ClassicState, Fsm, StateEnum, UnknownStatePolicy};
pub use pwm::{PwmGlitchless, PwmPeriodic, PwmSimple, Ramp, WaxWane};
pub use ram::{DualPortRam, Ram, ReadPolicy, SimpleRam};
pub use record_play::{RecordPlay, RecordState};
pub use reset::{ResetGen, SampleEnable};

use tock_ir::ElabError;

/// Number of bits needed to count `0..n`, i.e. `ceil(log2(n))`, at least 1.
pub fn clog2(n: u64) -> u32 {
    if n <= 2 {
        return 1;
    }
    u64::BITS - (n - 1).leading_zeros()
}

pub(crate) fn invalid(chunk: &str, reason: impl Into<String>) -> ElabError {
    ElabError::InvalidParameter {
        chunk: chunk.to_string(),
        reason: reason.into(),
    }
}
