//! Trace recording for simulation output.
//!
//! The [`TraceRecorder`] trait receives the value of every recorded signal
//! after each committed step. [`MemoryTrace`] keeps the changes in memory
//! for queries and JSON export; [`VcdRecorder`] writes IEEE 1364 Value
//! Change Dump text viewable in GTKWave or Surfer.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tock_common::Bits;
use tock_ir::SignalId;

use crate::error::SimError;

/// Sink for recorded signal values.
///
/// Signals are registered inside nested scopes before the first value is
/// recorded. Values are only passed on change, plus once per signal for the
/// first sample.
pub trait TraceRecorder {
    /// Opens a scope (one level of the chunk hierarchy).
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the innermost scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Registers a signal. `name` is the full hierarchical name.
    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError>;

    /// Records a value at `tick`.
    fn record(&mut self, tick: u64, id: SignalId, value: Bits) -> Result<(), SimError>;

    /// Flushes any buffered output.
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// A registered signal in a [`MemoryTrace`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracedSignal {
    /// Signal handle in the simulated design.
    pub id: SignalId,
    /// Hierarchical name.
    pub name: String,
    /// Bit width.
    pub width: u32,
}

/// One recorded value change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceChange {
    /// Tick of the change.
    pub tick: u64,
    /// The signal that changed.
    pub signal: SignalId,
    /// The new value.
    pub value: u64,
}

/// An in-memory trace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryTrace {
    /// Registered signals in registration order.
    pub signals: Vec<TracedSignal>,
    /// Value changes in recording order.
    pub changes: Vec<TraceChange>,
}

impl MemoryTrace {
    /// Creates an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, name: &str) -> Option<SignalId> {
        self.signals.iter().find(|s| s.name == name).map(|s| s.id)
    }

    /// The value of `name` as of `tick`, or `None` if it was not recorded by then.
    pub fn value_at(&self, name: &str, tick: u64) -> Option<u64> {
        let id = self.lookup(name)?;
        self.changes
            .iter()
            .rev()
            .find(|c| c.signal == id && c.tick <= tick)
            .map(|c| c.value)
    }

    /// Every recorded `(tick, value)` change of `name`.
    pub fn history(&self, name: &str) -> Vec<(u64, u64)> {
        match self.lookup(name) {
            Some(id) => self
                .changes
                .iter()
                .filter(|c| c.signal == id)
                .map(|c| (c.tick, c.value))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Serializes the trace as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl TraceRecorder for MemoryTrace {
    fn begin_scope(&mut self, _name: &str) -> Result<(), SimError> {
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        Ok(())
    }

    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError> {
        self.signals.push(TracedSignal {
            id,
            name: name.to_string(),
            width,
        });
        Ok(())
    }

    fn record(&mut self, tick: u64, id: SignalId, value: Bits) -> Result<(), SimError> {
        self.changes.push(TraceChange {
            tick,
            signal: id,
            value: value.as_u64(),
        });
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        Ok(())
    }
}

/// VCD (Value Change Dump) recorder following IEEE 1364.
///
/// Identifier codes are printable ASCII starting at `!`. One tick is written
/// as one `timescale` unit.
pub struct VcdRecorder<W: Write> {
    writer: W,
    id_map: Vec<(SignalId, String, u32)>,
    next_id: u32,
    header_written: bool,
    current_time: Option<u64>,
    timescale: String,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a recorder with a `1ns` timescale.
    pub fn new(writer: W) -> Self {
        Self::with_timescale(writer, "1ns")
    }

    /// Creates a recorder with an explicit timescale, e.g. `"10ns"`.
    pub fn with_timescale(writer: W, timescale: &str) -> Self {
        Self {
            writer,
            id_map: Vec::new(),
            next_id: 0,
            header_written: false,
            current_time: None,
            timescale: timescale.to_string(),
        }
    }

    /// Consumes the recorder and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ensure_header(&mut self) -> Result<(), SimError> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  tock {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  {}", self.timescale)?;
        writeln!(self.writer, "$end")?;
        Ok(())
    }

    fn make_id_code(index: u32) -> String {
        let mut result = String::new();
        let mut idx = index;
        loop {
            result.push((b'!' + (idx % 94) as u8) as char);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        result
    }

    fn format_value(value: Bits, width: u32) -> String {
        if width == 1 {
            if value.is_zero() { "0" } else { "1" }.to_string()
        } else {
            format!("b{value}")
        }
    }
}

impl<W: Write> TraceRecorder for VcdRecorder<W> {
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.ensure_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError> {
        self.ensure_header()?;
        let id_code = Self::make_id_code(self.next_id);
        self.next_id += 1;
        let local = name.rsplit('.').next().unwrap_or(name);
        writeln!(self.writer, "$var wire {width} {id_code} {local} $end")?;
        self.id_map.push((id, id_code, width));
        Ok(())
    }

    fn record(&mut self, tick: u64, id: SignalId, value: Bits) -> Result<(), SimError> {
        self.ensure_header()?;
        if self.current_time != Some(tick) {
            if self.current_time.is_none() {
                writeln!(self.writer, "$enddefinitions $end")?;
            }
            writeln!(self.writer, "#{tick}")?;
            self.current_time = Some(tick);
        }
        let Some((_, id_code, width)) = self.id_map.iter().find(|(sid, _, _)| *sid == id) else {
            return Err(SimError::UnknownName(id.to_string()));
        };
        let text = Self::format_value(value, *width);
        if *width == 1 {
            writeln!(self.writer, "{text}{id_code}")?;
        } else {
            writeln!(self.writer, "{text} {id_code}")?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        if self.current_time.is_none() {
            self.ensure_header()?;
            writeln!(self.writer, "$enddefinitions $end")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
