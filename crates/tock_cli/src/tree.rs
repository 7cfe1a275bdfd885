//! `tock tree`: print the elaborated chunk hierarchy of a circuit.

use std::fmt::Write as _;

use tock_ir::{
    ChunkInstance, Design, DesignVisitor, MemoryDecl, ProcessDecl, ProcessKind, SignalDecl,
};

use crate::circuits::{self, CircuitParams};
use crate::{GlobalArgs, TreeArgs};

/// Runs the `tock tree` command.
pub fn run(args: &TreeArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = global.load_config()?;
    let circuit = circuits::find(&args.circuit)
        .ok_or_else(|| format!("unknown circuit '{}' (see `tock list`)", args.circuit))?;
    let design = circuit.elaborate(&CircuitParams {
        param: args.param.unwrap_or(circuit.default_param),
        policy: config.simulation.unknown_state.into(),
    })?;
    print!("{}", render(&design, args.detail));
    Ok(0)
}

/// Renders the hierarchy, one chunk per line, indented by depth.
pub fn render(design: &Design, detail: bool) -> String {
    let mut printer = TreePrinter {
        out: String::new(),
        depth: 0,
        detail,
    };
    design.walk(&mut printer);
    printer.out
}

struct TreePrinter {
    out: String,
    depth: usize,
    detail: bool,
}

impl TreePrinter {
    fn line(&mut self, extra: usize, text: std::fmt::Arguments<'_>) {
        let indent = "  ".repeat(self.depth + extra);
        let _ = writeln!(self.out, "{indent}{text}");
    }
}

impl DesignVisitor for TreePrinter {
    fn enter_chunk(&mut self, _design: &Design, chunk: &ChunkInstance, depth: usize) {
        self.depth = depth;
        self.line(0, format_args!("{} ({})", chunk.name, chunk.kind));
    }

    fn visit_signal(&mut self, _design: &Design, signal: &SignalDecl) {
        if !self.detail {
            return;
        }
        let local = signal.name.rsplit('.').next().unwrap_or(&signal.name);
        match &signal.states {
            Some(states) => self.line(1, format_args!("signal {local}: {{{}}}", states.join(", "))),
            None => self.line(1, format_args!("signal {local}: {}", signal.width)),
        }
    }

    fn visit_memory(&mut self, _design: &Design, memory: &MemoryDecl) {
        if self.detail {
            let local = memory.name.rsplit('.').next().unwrap_or(&memory.name);
            self.line(
                1,
                format_args!("memory {local}: {} x {}", memory.depth(), memory.data_width),
            );
        }
    }

    fn visit_process(&mut self, design: &Design, process: &ProcessDecl) {
        if !self.detail {
            return;
        }
        let local = process.name.rsplit('.').next().unwrap_or(&process.name);
        match process.kind {
            ProcessKind::Combinational => self.line(1, format_args!("comb {local}")),
            ProcessKind::Sequential { clock, edge } => self.line(
                1,
                format_args!("seq {local} @ {:?} {}", edge, design.signal(clock).name),
            ),
        }
    }

    fn exit_chunk(&mut self, _design: &Design, _chunk: &ChunkInstance, depth: usize) {
        self.depth = depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tock_blocks::UnknownStatePolicy;

    fn design(name: &str, param: u64) -> Design {
        circuits::find(name)
            .unwrap()
            .elaborate(&CircuitParams {
                param,
                policy: UnknownStatePolicy::Recover,
            })
            .unwrap()
    }

    #[test]
    fn blinker_hierarchy() {
        let text = render(&design("blinker", 3), false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "blinker_top (blinker_top)");
        assert_eq!(lines[1], "  blinker (blinker)");
        assert_eq!(lines[2], "    counter (counter)");
        assert!(lines.contains(&"      adder (adder)"));
        assert!(lines.contains(&"        fa0 (full_adder_bit)"));
    }

    #[test]
    fn detail_lists_contents() {
        let text = render(&design("ram", 2), true);
        assert!(text.contains("memory mem: 4 x 8"), "{text}");
        assert!(text.contains("seq logic @ Rising clk"), "{text}");
        let fsm = render(&design("classic_fsm", 0), true);
        assert!(fsm.contains("signal state: {A, B, C, D}"), "{fsm}");
        assert!(fsm.contains("comb detect_chg"), "{fsm}");
    }
}
