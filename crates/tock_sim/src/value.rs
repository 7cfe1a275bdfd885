//! Runtime state of signals and memory arrays.
//!
//! A [`SignalState`] holds the committed value every reader sees and an
//! optional pending value that writers build up during an evaluation. The
//! pending value replaces the committed one only at [`SignalState::commit`].

use tock_common::{mask, Bits, BitsError};

/// Current and pending value of one signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignalState {
    value: Bits,
    pending: Option<Bits>,
}

impl SignalState {
    /// A signal holding `init` with nothing pending.
    pub fn new(init: Bits) -> Self {
        Self {
            value: init,
            pending: None,
        }
    }

    /// The committed value.
    pub fn value(&self) -> Bits {
        self.value
    }

    /// The pending value, if any write happened since the last commit.
    pub fn pending(&self) -> Option<Bits> {
        self.pending
    }

    /// Signal width in bits.
    pub fn width(&self) -> u32 {
        self.value.width()
    }

    /// Schedules `value`, truncated to the signal width, for the next commit.
    pub fn write_value(&mut self, value: u64) {
        let width = self.value.width();
        self.pending = Some(Bits::new(width, value).unwrap_or(self.value));
    }

    /// Schedules bits `lo..lo + field.width()` for the next commit, keeping the
    /// other pending bits as they are.
    pub fn write_next(&mut self, lo: u32, field: Bits) -> Result<(), BitsError> {
        let base = self.pending.unwrap_or(self.value);
        self.pending = Some(base.with_slice(lo, field)?);
        Ok(())
    }

    /// Drops the pending value without committing it.
    pub fn discard(&mut self) {
        self.pending = None;
    }

    /// Makes the pending value current and returns the mask of bits that changed.
    pub fn commit(&mut self) -> u64 {
        match self.pending.take() {
            Some(next) => {
                let changed = (self.value.as_u64() ^ next.as_u64()) & mask(self.value.width());
                self.value = next;
                changed
            }
            None => 0,
        }
    }
}

/// Cell storage of one memory array.
#[derive(Clone, Debug)]
pub struct MemoryState {
    data_width: u32,
    cells: Vec<u64>,
}

impl MemoryState {
    /// A zero-filled memory of `depth` cells.
    pub fn new(depth: u64, data_width: u32) -> Self {
        Self {
            data_width,
            cells: vec![0; depth as usize],
        }
    }

    /// Number of cells.
    pub fn depth(&self) -> u64 {
        self.cells.len() as u64
    }

    /// Reads a cell, or `None` past the end.
    pub fn read(&self, address: u64) -> Option<Bits> {
        let raw = *self.cells.get(usize::try_from(address).ok()?)?;
        Bits::new(self.data_width, raw).ok()
    }

    /// Stores `value` truncated to the cell width. Returns `false` past the end.
    pub fn write(&mut self, address: u64, value: u64) -> bool {
        let Ok(index) = usize::try_from(address) else {
            return false;
        };
        match self.cells.get_mut(index) {
            Some(cell) => {
                *cell = value & mask(self.data_width);
                true
            }
            None => false,
        }
    }
}
