//! Shared foundational types used across the tock simulation crates.
//!
//! This crate provides [`Bits`], the fixed-width unsigned value carried by
//! every wire and bus, together with the bit-level errors raised when a width
//! or range is violated.

#![warn(missing_docs)]

pub mod bits;

pub use bits::{check_range, check_width, mask, Bits, BitsError, MAX_WIDTH};
