//! Elaboration: building a [`Design`] from signals, processes, and chunks.
//!
//! The builder is scoped to one chunk instance at a time. Every declaration
//! is prefixed with the current instance path, so a signal `cnt` declared
//! inside instance `blink.counter` is named `blink.counter.cnt`. All
//! structural checks happen here, and the first failure aborts elaboration.

use std::collections::BTreeMap;

use tock_common::{check_width, Bits};

use crate::arena::Arena;
use crate::chunk::{Chunk, ChunkInstance, PortDirection, Ports};
use crate::design::Design;
use crate::error::{AccessError, ElabError};
use crate::ids::{ChunkId, MemoryId, ProcessId, SignalId};
use crate::memory::{MemoryDecl, MAX_ADDR_WIDTH};
use crate::process::{Edge, ProcessContext, ProcessDecl, ProcessFn, ProcessKind};
use crate::signal::{SignalDecl, SignalRef};

/// Incrementally builds a [`Design`].
pub struct DesignBuilder {
    name: String,
    signals: Arena<SignalId, SignalDecl>,
    processes: Arena<ProcessId, ProcessDecl>,
    bodies: Vec<ProcessFn>,
    memories: Arena<MemoryId, MemoryDecl>,
    chunks: Arena<ChunkId, ChunkInstance>,
    current: ChunkId,
    kinds: Vec<String>,
}

impl DesignBuilder {
    /// Starts a design whose top-level scope is named `name`.
    pub fn new(name: &str) -> Self {
        let mut chunks = Arena::new();
        let top = chunks.alloc(ChunkInstance {
            id: ChunkId::from_raw(0),
            name: name.to_string(),
            path: String::new(),
            kind: name.to_string(),
            parent: None,
            ports: Vec::new(),
            signals: Vec::new(),
            processes: Vec::new(),
            memories: Vec::new(),
            children: Vec::new(),
        });
        Self {
            name: name.to_string(),
            signals: Arena::new(),
            processes: Arena::new(),
            bodies: Vec::new(),
            memories: Arena::new(),
            chunks,
            current: top,
            kinds: Vec::new(),
        }
    }

    fn qualify(&self, local: &str) -> String {
        let path = &self.chunks[self.current].path;
        if path.is_empty() {
            local.to_string()
        } else {
            format!("{path}.{local}")
        }
    }

    fn width_of(&self) -> impl Fn(SignalId) -> Option<u32> + '_ {
        |id| self.signals.try_get(id).map(|s| s.width)
    }

    /// Width of a view, validated against the declared signals.
    pub fn width(&self, r: &SignalRef) -> Result<u32, tock_common::BitsError> {
        r.width(&self.signals)
    }

    /// Bits `lo..hi` of a view, e.g. one bit of a bus bound to a port.
    pub fn sub_view(&self, r: &SignalRef, lo: u32, hi: u32) -> Result<SignalRef, ElabError> {
        r.sub_view(lo, hi, &self.width_of())
            .map_err(|source| ElabError::InvalidRef {
                context: self.qualify(&format!("[{lo}..{hi}]")),
                source,
            })
    }

    /// Bit `index` of a view.
    pub fn bit_of(&self, r: &SignalRef, index: u32) -> Result<SignalRef, ElabError> {
        self.sub_view(r, index, index.saturating_add(1))
    }

    fn declare_signal(
        &mut self,
        local: &str,
        width: u32,
        init: u64,
        traced: bool,
        states: Option<Vec<String>>,
    ) -> Result<SignalId, ElabError> {
        let name = self.qualify(local);
        let init = Bits::new(width, init).map_err(|source| ElabError::InvalidWidth {
            name: name.clone(),
            source,
        })?;
        let id = self.signals.next_id();
        self.signals.alloc(SignalDecl {
            id,
            name,
            width,
            init,
            chunk: self.current,
            traced,
            states,
        });
        self.chunks[self.current].signals.push(id);
        Ok(id)
    }

    /// Declares a one-bit signal.
    pub fn wire(&mut self, name: &str) -> Result<SignalId, ElabError> {
        self.bus(name, 1)
    }

    /// Declares a bus of `width` bits, initially zero.
    pub fn bus(&mut self, name: &str, width: u32) -> Result<SignalId, ElabError> {
        self.declare_signal(name, width, 0, true, None)
    }

    /// Declares a bus with an initial value, truncated to `width`.
    pub fn bus_with_init(&mut self, name: &str, width: u32, init: u64) -> Result<SignalId, ElabError> {
        self.declare_signal(name, width, init, true, None)
    }

    /// Declares a helper bus that trace recorders skip.
    pub fn internal_bus(&mut self, name: &str, width: u32) -> Result<SignalId, ElabError> {
        self.declare_signal(name, width, 0, false, None)
    }

    /// Declares a signal restricted to the named `states`, starting at
    /// `states[initial]`. The encoded value of each state is its index.
    pub fn state_signal(
        &mut self,
        name: &str,
        states: &[&str],
        initial: usize,
    ) -> Result<SignalId, ElabError> {
        let invalid = |reason: String| ElabError::InvalidStates {
            name: self.qualify(name),
            reason,
        };
        if states.is_empty() {
            return Err(invalid("no states declared".into()));
        }
        for (i, s) in states.iter().enumerate() {
            if states[..i].contains(s) {
                return Err(invalid(format!("state '{s}' declared twice")));
            }
        }
        if initial >= states.len() {
            return Err(invalid(format!(
                "initial state index {initial} out of {} states",
                states.len()
            )));
        }
        let width = (usize::BITS - (states.len() - 1).leading_zeros()).max(1);
        let names = states.iter().map(|s| s.to_string()).collect();
        self.declare_signal(name, width, initial as u64, true, Some(names))
    }

    /// Declares a memory of `2^addr_width` cells of `data_width` bits.
    pub fn memory(&mut self, name: &str, addr_width: u32, data_width: u32) -> Result<MemoryId, ElabError> {
        let name = self.qualify(name);
        if addr_width > MAX_ADDR_WIDTH {
            return Err(ElabError::InvalidMemory {
                name,
                reason: format!("address width {addr_width} exceeds {MAX_ADDR_WIDTH}"),
            });
        }
        check_width(data_width).map_err(|source| ElabError::InvalidWidth {
            name: name.clone(),
            source,
        })?;
        let id = self.memories.next_id();
        self.memories.alloc(MemoryDecl {
            id,
            name,
            chunk: self.current,
            addr_width,
            data_width,
        });
        self.chunks[self.current].memories.push(id);
        Ok(id)
    }

    /// Starts a combinational process.
    pub fn comb(&mut self, name: &str) -> ProcessBuilder<'_> {
        ProcessBuilder::new(self, name, ProcessKind::Combinational)
    }

    /// Starts a sequential process triggered by `edge` of `clock`.
    pub fn seq(&mut self, name: &str, clock: SignalId, edge: Edge) -> ProcessBuilder<'_> {
        ProcessBuilder::new(self, name, ProcessKind::Sequential { clock, edge })
    }

    /// Instantiates `chunk` as a child of the current scope.
    ///
    /// Every declared port must be bound exactly once, to a view of exactly
    /// the port's width. Output ports cannot be bound to constants.
    pub fn instantiate(
        &mut self,
        name: &str,
        chunk: &dyn Chunk,
        bindings: &[(&str, SignalRef)],
    ) -> Result<ChunkId, ElabError> {
        let path = self.qualify(name);
        let kind = chunk.kind().to_string();
        if self.kinds.contains(&kind) {
            let mut trail = self.kinds.clone();
            trail.push(kind.clone());
            return Err(ElabError::RecursiveInstantiation {
                kind,
                path: trail.join(" > "),
            });
        }

        let specs = chunk.ports();
        let mut bound: BTreeMap<&str, &SignalRef> = BTreeMap::new();
        for (port, r) in bindings {
            if !specs.iter().any(|p| p.name == *port) {
                return Err(ElabError::UnknownPort {
                    instance: path,
                    port: port.to_string(),
                });
            }
            if bound.insert(*port, r).is_some() {
                return Err(ElabError::DuplicatePort {
                    instance: path,
                    port: port.to_string(),
                });
            }
        }

        let mut ports = Vec::with_capacity(specs.len());
        for spec in specs {
            let Some(r) = bound.get(spec.name.as_str()).copied() else {
                return Err(ElabError::MissingPort {
                    instance: path,
                    port: spec.name,
                });
            };
            let found = r.width(&self.signals).map_err(|source| ElabError::InvalidRef {
                context: format!("{path}.{}", spec.name),
                source,
            })?;
            if found != spec.width {
                return Err(ElabError::PortWidthMismatch {
                    instance: path,
                    port: spec.name,
                    expected: spec.width,
                    found,
                });
            }
            if spec.direction == PortDirection::Output && r.has_const() {
                return Err(ElabError::ConstOutput {
                    instance: path,
                    port: spec.name,
                });
            }
            ports.push((spec, r.clone()));
        }

        let parent = self.current;
        let id = self.chunks.next_id();
        let io = Ports::new(
            path.clone(),
            ports.iter().map(|(s, r)| (s.name.clone(), r.clone())).collect(),
        );
        self.chunks.alloc(ChunkInstance {
            id,
            name: name.to_string(),
            path: path.clone(),
            kind: kind.clone(),
            parent: Some(parent),
            ports,
            signals: Vec::new(),
            processes: Vec::new(),
            memories: Vec::new(),
            children: Vec::new(),
        });
        self.chunks[parent].children.push(id);
        tracing::trace!(instance = %path, kind = %kind, "elaborating chunk");

        self.current = id;
        self.kinds.push(kind);
        let built = chunk.build(self, &io);
        self.kinds.pop();
        self.current = parent;
        built.map(|()| id)
    }

    fn push_process(&mut self, decl: ProcessDecl, body: ProcessFn) -> ProcessId {
        let id = self.processes.alloc(decl);
        self.bodies.push(body);
        self.chunks[self.current].processes.push(id);
        id
    }

    fn check_drivers(&self) -> Result<(), ElabError> {
        let width_of = self.width_of();
        let mut owners: BTreeMap<SignalId, Vec<(u64, ProcessId)>> = BTreeMap::new();
        for (pid, decl) in self.processes.iter() {
            for r in &decl.drives {
                for seg in r.segments(&width_of) {
                    let mask = seg.mask();
                    let entry = owners.entry(seg.signal).or_default();
                    if let Some(&(_, other)) = entry
                        .iter()
                        .find(|(m, owner)| *owner != pid && m & mask != 0)
                    {
                        return Err(ElabError::MultipleDrivers {
                            signal: self.signals[seg.signal].name.clone(),
                            first: self.processes[other].name.clone(),
                            second: decl.name.clone(),
                        });
                    }
                    entry.push((mask, pid));
                }
            }
        }
        Ok(())
    }

    /// Finishes elaboration, checking that no two processes drive the same bit.
    pub fn finish(self) -> Result<Design, ElabError> {
        self.check_drivers()?;
        tracing::debug!(
            design = %self.name,
            signals = self.signals.len(),
            processes = self.processes.len(),
            memories = self.memories.len(),
            chunks = self.chunks.len(),
            "elaboration finished"
        );
        Ok(Design::new(
            self.name,
            self.signals,
            self.processes,
            self.bodies,
            self.memories,
            self.chunks,
        ))
    }
}

/// Declares one process: its read set, drive set, memories, and body.
#[must_use = "a process is only declared once `body` is called"]
pub struct ProcessBuilder<'b> {
    builder: &'b mut DesignBuilder,
    name: String,
    kind: ProcessKind,
    reads: Vec<SignalRef>,
    drives: Vec<SignalRef>,
    memories: Vec<MemoryId>,
}

impl<'b> ProcessBuilder<'b> {
    fn new(builder: &'b mut DesignBuilder, name: &str, kind: ProcessKind) -> Self {
        let name = builder.qualify(name);
        Self {
            builder,
            name,
            kind,
            reads: Vec::new(),
            drives: Vec::new(),
            memories: Vec::new(),
        }
    }

    /// Adds views to the read set.
    pub fn reads<I, R>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<SignalRef>,
    {
        self.reads.extend(refs.into_iter().map(Into::into));
        self
    }

    /// Adds views to the drive set.
    pub fn drives<I, R>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<SignalRef>,
    {
        self.drives.extend(refs.into_iter().map(Into::into));
        self
    }

    /// Grants access to memories. Only sequential bodies may use them.
    pub fn memories<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = MemoryId>,
    {
        self.memories.extend(ids);
        self
    }

    /// Validates the declaration and registers `body`.
    pub fn body<F>(mut self, body: F) -> Result<ProcessId, ElabError>
    where
        F: FnMut(&mut dyn ProcessContext) -> Result<(), AccessError> + 'static,
    {
        let b = &*self.builder;
        for r in self.reads.iter().chain(&self.drives) {
            r.width(&b.signals).map_err(|source| ElabError::InvalidRef {
                context: self.name.clone(),
                source,
            })?;
        }
        if self.drives.iter().any(SignalRef::has_const) {
            return Err(ElabError::ConstDriven { process: self.name });
        }
        for m in &self.memories {
            if b.memories.try_get(*m).is_none() {
                return Err(ElabError::InvalidMemory {
                    name: m.to_string(),
                    reason: format!("not declared (used by '{}')", self.name),
                });
            }
        }
        if let ProcessKind::Sequential { clock, .. } = self.kind {
            let width = b
                .signals
                .try_get(clock)
                .map(|s| s.width)
                .ok_or_else(|| ElabError::InvalidRef {
                    context: self.name.clone(),
                    source: tock_common::BitsError::SliceOutOfRange { lo: 0, hi: 0, width: 0 },
                })?;
            if width != 1 {
                return Err(ElabError::ClockWidth {
                    process: self.name,
                    width,
                });
            }
            let clock_ref = SignalRef::Signal(clock);
            if !self.reads.contains(&clock_ref) {
                self.reads.push(clock_ref);
            }
        }

        let builder = self.builder;
        let id = builder.processes.next_id();
        let decl = ProcessDecl {
            id,
            name: self.name,
            chunk: builder.current,
            kind: self.kind,
            reads: self.reads,
            drives: self.drives,
            memories: self.memories,
        };
        Ok(builder.push_process(decl, Box::new(body)))
    }
}
