//! Simulation time: whole ticks plus delta iterations within a tick.
//!
//! A tick is the unit the testbench advances by. Deltas count the
//! combinational settle iterations performed while a tick is being evaluated
//! and reset whenever time advances.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A simulation time point.
///
/// Ordered by tick first, then by delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimTime {
    /// Testbench time in ticks.
    pub tick: u64,
    /// Delta iteration within the current tick.
    pub delta: u32,
}

impl SimTime {
    /// Tick zero, delta zero.
    pub fn zero() -> Self {
        Self { tick: 0, delta: 0 }
    }

    /// A time at the start of `tick`.
    pub fn from_tick(tick: u64) -> Self {
        Self { tick, delta: 0 }
    }

    /// The next delta iteration at the same tick.
    pub fn next_delta(&self) -> Self {
        Self {
            tick: self.tick,
            delta: self.delta + 1,
        }
    }

    /// Advances by `ticks`, resetting the delta counter.
    pub fn advance(&self, ticks: u64) -> Self {
        Self {
            tick: self.tick.saturating_add(ticks),
            delta: 0,
        }
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tick.cmp(&other.tick).then(self.delta.cmp(&other.delta))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tick)?;
        if self.delta > 0 {
            write!(f, "+d{}", self.delta)?;
        }
        Ok(())
    }
}
