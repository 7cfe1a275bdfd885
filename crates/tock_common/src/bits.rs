//! Fixed-width unsigned values for wires and buses.
//!
//! A [`Bits`] value is a two-state bit vector of 1 to [`MAX_WIDTH`] bits. All
//! arithmetic is unsigned and wraps modulo `2^width`; values wider than the
//! declared width are truncated, never sign-extended.
//!
//! Bit index 0 is the least significant bit. Concatenation places its first
//! operand in the most significant bits, so `concat([a, b])` reads as
//! `{a, b}` in HDL notation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Widest signal the kernel supports.
pub const MAX_WIDTH: u32 = 64;

/// Errors raised by width and range violations on [`Bits`] values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BitsError {
    /// A width of zero bits was requested.
    #[error("width must be at least one bit")]
    ZeroWidth,

    /// A width larger than [`MAX_WIDTH`] was requested.
    #[error("width {0} exceeds the {MAX_WIDTH}-bit limit")]
    TooWide(u32),

    /// A slice or bit index lies outside the value's width.
    #[error("bit range [{lo}, {hi}) out of range for width {width}")]
    SliceOutOfRange {
        /// Lowest bit index (inclusive).
        lo: u32,
        /// Highest bit index (exclusive).
        hi: u32,
        /// Width of the value being sliced.
        width: u32,
    },
}

/// A fixed-width unsigned value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bits {
    width: u32,
    value: u64,
}

impl Bits {
    /// Creates a value of the given width, truncating `value` to fit.
    pub fn new(width: u32, value: u64) -> Result<Self, BitsError> {
        check_width(width)?;
        Ok(Self {
            width,
            value: value & mask(width),
        })
    }

    /// Creates an all-zero value of the given width.
    pub fn zero(width: u32) -> Result<Self, BitsError> {
        Self::new(width, 0)
    }

    /// Returns the number of bits in this value.
    pub fn width(self) -> u32 {
        self.width
    }

    /// Returns the value as an unsigned integer.
    pub fn as_u64(self) -> u64 {
        self.value
    }

    /// Returns `true` if every bit is zero.
    pub fn is_zero(self) -> bool {
        self.value == 0
    }

    /// Returns the bit at `index`.
    pub fn bit(self, index: u32) -> Result<bool, BitsError> {
        if index >= self.width {
            return Err(BitsError::SliceOutOfRange {
                lo: index,
                hi: index.saturating_add(1),
                width: self.width,
            });
        }
        Ok((self.value >> index) & 1 == 1)
    }

    /// Extracts bits `lo..hi` as a new value of width `hi - lo`.
    pub fn slice(self, lo: u32, hi: u32) -> Result<Self, BitsError> {
        check_range(lo, hi, self.width)?;
        Ok(Self {
            width: hi - lo,
            value: (self.value >> lo) & mask(hi - lo),
        })
    }

    /// Returns a copy with bits `lo..lo + field.width()` replaced by `field`.
    pub fn with_slice(self, lo: u32, field: Bits) -> Result<Self, BitsError> {
        let hi = lo.saturating_add(field.width);
        check_range(lo, hi, self.width)?;
        let field_mask = mask(field.width) << lo;
        Ok(Self {
            width: self.width,
            value: (self.value & !field_mask) | (field.value << lo),
        })
    }

    /// Concatenates values with the first part in the most significant bits.
    pub fn concat(parts: &[Bits]) -> Result<Self, BitsError> {
        let width: u32 = parts.iter().map(|p| p.width).sum();
        check_width(width)?;
        let value = parts
            .iter()
            .fold(0u64, |acc, p| (acc.checked_shl(p.width).unwrap_or(0)) | p.value);
        Ok(Self { width, value })
    }
}

/// Returns the bit mask covering the low `width` bits.
pub fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Validates that `width` lies in `1..=MAX_WIDTH`.
pub fn check_width(width: u32) -> Result<(), BitsError> {
    match width {
        0 => Err(BitsError::ZeroWidth),
        w if w > MAX_WIDTH => Err(BitsError::TooWide(w)),
        _ => Ok(()),
    }
}

/// Validates that `lo..hi` is a non-empty range inside `width`.
pub fn check_range(lo: u32, hi: u32, width: u32) -> Result<(), BitsError> {
    if lo >= hi || hi > width {
        return Err(BitsError::SliceOutOfRange { lo, hi, width });
    }
    Ok(())
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", (self.value >> i) & 1)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bits({}'b{self})", self.width)
    }
}
