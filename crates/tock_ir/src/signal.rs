//! Signal declarations and bus views.
//!
//! A [`SignalDecl`] is an atomic value cell: a single wire or a fixed-width
//! bus. A [`SignalRef`] is a view over signals: the whole signal, a
//! contiguous slice, a concatenation, or a constant. Views are how ports
//! alias parent signals and how processes name what they read and drive.

use serde::{Deserialize, Serialize};
use tock_common::{check_range, mask, Bits, BitsError};

use crate::arena::Arena;
use crate::error::AccessError;
use crate::ids::{ChunkId, SignalId};

/// A wire or bus in the elaborated design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalDecl {
    /// The signal's handle.
    pub id: SignalId,
    /// Hierarchical name, e.g. `blinker.cnt`.
    pub name: String,
    /// Bit width (1..=64).
    pub width: u32,
    /// Value the signal holds before the first step.
    pub init: Bits,
    /// The chunk instance that declared this signal.
    pub chunk: ChunkId,
    /// `false` for anonymous helper signals that trace recorders skip.
    pub traced: bool,
    /// State names for signals restricted to an enumeration; the encoded
    /// value of a state is its index in this list.
    pub states: Option<Vec<String>>,
}

impl SignalDecl {
    /// Returns the state name for an encoded value, if this is a state signal
    /// and the value is a declared member.
    pub fn state_name(&self, value: u64) -> Option<&str> {
        self.states
            .as_ref()
            .and_then(|s| s.get(value as usize))
            .map(String::as_str)
    }
}

/// A contiguous run of bits `lo..hi` within one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    /// The underlying signal.
    pub signal: SignalId,
    /// Lowest bit (inclusive).
    pub lo: u32,
    /// Highest bit (exclusive).
    pub hi: u32,
}

impl Segment {
    /// Returns the bit mask this segment covers within its signal.
    pub fn mask(&self) -> u64 {
        mask(self.hi - self.lo) << self.lo
    }
}

/// A view over one or more signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalRef {
    /// The whole signal.
    Signal(SignalId),
    /// Bits `lo..hi` of a signal.
    Slice {
        /// The sliced signal.
        signal: SignalId,
        /// Lowest bit (inclusive).
        lo: u32,
        /// Highest bit (exclusive).
        hi: u32,
    },
    /// A concatenation; the first part occupies the most significant bits.
    Concat(Vec<SignalRef>),
    /// A constant value. Readable, never writable.
    Const(Bits),
}

impl SignalRef {
    /// Creates a constant reference.
    pub fn constant(width: u32, value: u64) -> Result<Self, BitsError> {
        Ok(Self::Const(Bits::new(width, value)?))
    }

    /// Creates a concatenation, first part most significant.
    pub fn concat<I, R>(parts: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<SignalRef>,
    {
        Self::Concat(parts.into_iter().map(Into::into).collect())
    }

    /// Returns the width of the view, validating every slice against the
    /// declared signal widths.
    pub fn width(&self, signals: &Arena<SignalId, SignalDecl>) -> Result<u32, BitsError> {
        self.width_with(&|id| signals.try_get(id).map(|s| s.width))
    }

    /// Returns the width of the view using a width lookup.
    ///
    /// The lookup returns `None` for unknown signals, which is reported as an
    /// out-of-range slice of width zero.
    pub fn width_with(&self, width_of: &dyn Fn(SignalId) -> Option<u32>) -> Result<u32, BitsError> {
        match self {
            SignalRef::Signal(id) => width_of(*id).ok_or(BitsError::SliceOutOfRange {
                lo: 0,
                hi: 0,
                width: 0,
            }),
            SignalRef::Slice { signal, lo, hi } => {
                let width = width_of(*signal).unwrap_or(0);
                check_range(*lo, *hi, width)?;
                Ok(hi - lo)
            }
            SignalRef::Concat(parts) => {
                if parts.is_empty() {
                    return Err(BitsError::ZeroWidth);
                }
                let mut total = 0u32;
                for p in parts {
                    total += p.width_with(width_of)?;
                }
                tock_common::check_width(total)?;
                Ok(total)
            }
            SignalRef::Const(b) => Ok(b.width()),
        }
    }

    /// Returns the signal bit-runs covered by this view, most significant
    /// first. Constants contribute no segments.
    pub fn segments(&self, width_of: &dyn Fn(SignalId) -> Option<u32>) -> Vec<Segment> {
        let mut out = Vec::new();
        self.collect_segments(width_of, &mut out);
        out
    }

    fn collect_segments(&self, width_of: &dyn Fn(SignalId) -> Option<u32>, out: &mut Vec<Segment>) {
        match self {
            SignalRef::Signal(id) => out.push(Segment {
                signal: *id,
                lo: 0,
                hi: width_of(*id).unwrap_or(0),
            }),
            SignalRef::Slice { signal, lo, hi } => out.push(Segment {
                signal: *signal,
                lo: *lo,
                hi: *hi,
            }),
            SignalRef::Concat(parts) => {
                for p in parts {
                    p.collect_segments(width_of, out);
                }
            }
            SignalRef::Const(_) => {}
        }
    }

    /// Returns `true` if the view contains a constant anywhere.
    pub fn has_const(&self) -> bool {
        match self {
            SignalRef::Const(_) => true,
            SignalRef::Concat(parts) => parts.iter().any(SignalRef::has_const),
            _ => false,
        }
    }

    /// Returns the view of bits `lo..hi` of this view.
    ///
    /// Slicing a concatenation yields the overlapping pieces of its parts,
    /// still most significant first.
    pub fn sub_view(
        &self,
        lo: u32,
        hi: u32,
        width_of: &dyn Fn(SignalId) -> Option<u32>,
    ) -> Result<SignalRef, BitsError> {
        check_range(lo, hi, self.width_with(width_of)?)?;
        match self {
            SignalRef::Signal(id) => Ok(id.slice(lo, hi)),
            SignalRef::Slice { signal, lo: base, .. } => Ok(signal.slice(base + lo, base + hi)),
            SignalRef::Const(b) => Ok(SignalRef::Const(b.slice(lo, hi)?)),
            SignalRef::Concat(parts) => {
                let mut pieces = Vec::new();
                let mut offset = 0u32;
                for p in parts.iter().rev() {
                    let w = p.width_with(width_of)?;
                    let (plo, phi) = (lo.max(offset), hi.min(offset + w));
                    if plo < phi {
                        pieces.push(p.sub_view(plo - offset, phi - offset, width_of)?);
                    }
                    offset += w;
                }
                pieces.reverse();
                match pieces.len() {
                    1 => Ok(pieces.remove(0)),
                    _ => Ok(SignalRef::Concat(pieces)),
                }
            }
        }
    }

    /// Reads the view, given the current value of each signal.
    pub fn read_with(&self, value_of: &dyn Fn(SignalId) -> Bits) -> Result<Bits, BitsError> {
        match self {
            SignalRef::Signal(id) => Ok(value_of(*id)),
            SignalRef::Slice { signal, lo, hi } => value_of(*signal).slice(*lo, *hi),
            SignalRef::Concat(parts) => {
                let values = parts
                    .iter()
                    .map(|p| p.read_with(value_of))
                    .collect::<Result<Vec<_>, _>>()?;
                Bits::concat(&values)
            }
            SignalRef::Const(b) => Ok(*b),
        }
    }

    /// Splits a write of `value` into per-signal fields.
    ///
    /// `value` is truncated to the view's width. Each returned pair is the
    /// lowest bit position in the target signal and the field to store there.
    pub fn split_write(
        &self,
        value: u64,
        width_of: &dyn Fn(SignalId) -> Option<u32>,
    ) -> Result<Vec<(SignalId, u32, Bits)>, AccessError> {
        let width = self.width_with(width_of)?;
        let mut out = Vec::new();
        self.split_into(value & mask(width), width, width_of, &mut out)?;
        Ok(out)
    }

    fn split_into(
        &self,
        value: u64,
        width: u32,
        width_of: &dyn Fn(SignalId) -> Option<u32>,
        out: &mut Vec<(SignalId, u32, Bits)>,
    ) -> Result<(), AccessError> {
        match self {
            SignalRef::Signal(id) => out.push((*id, 0, Bits::new(width, value)?)),
            SignalRef::Slice { signal, lo, .. } => out.push((*signal, *lo, Bits::new(width, value)?)),
            SignalRef::Concat(parts) => {
                let mut offset = width;
                for p in parts {
                    let part_width = p.width_with(width_of)?;
                    offset -= part_width;
                    let field = (value >> offset) & mask(part_width);
                    p.split_into(field, part_width, width_of, out)?;
                }
            }
            SignalRef::Const(_) => return Err(AccessError::ConstTarget),
        }
        Ok(())
    }
}

impl From<SignalId> for SignalRef {
    fn from(id: SignalId) -> Self {
        SignalRef::Signal(id)
    }
}

impl From<&SignalRef> for SignalRef {
    fn from(r: &SignalRef) -> Self {
        r.clone()
    }
}

impl From<Bits> for SignalRef {
    fn from(b: Bits) -> Self {
        SignalRef::Const(b)
    }
}

impl SignalId {
    /// A one-bit view of bit `index`. The last index yields an empty view
    /// that fails width checks.
    pub fn bit(self, index: u32) -> SignalRef {
        SignalRef::Slice {
            signal: self,
            lo: index,
            hi: index.saturating_add(1),
        }
    }

    /// A view of bits `lo..hi`.
    pub fn slice(self, lo: u32, hi: u32) -> SignalRef {
        SignalRef::Slice {
            signal: self,
            lo,
            hi,
        }
    }
}
