//! `tock sim`: elaborate a built-in circuit, clock it, and write a trace.

use std::path::PathBuf;

use tock_config::{TockConfig, TraceFormat};
use tock_sim::{SimConfig, Simulation};
use tracing::info;

use crate::circuits::{self, CircuitParams};
use crate::{GlobalArgs, SimArgs, TraceFormatArg};

/// Runs the `tock sim` command. Returns exit code 0 on success.
pub fn run(args: &SimArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = global.load_config()?;
    let sim = simulate(args, &config)?;

    if !global.quiet {
        for signal in &sim.trace().signals {
            println!("{:<32} {:>#x}", signal.name, sim.value(signal.id));
        }
        let stats = sim.stats();
        eprintln!(
            "   Finished {} at tick {} ({} steps, {} deltas, {} process firings)",
            args.circuit,
            sim.time(),
            stats.steps,
            stats.deltas,
            stats.seq_firings
        );
    }
    Ok(0)
}

/// Elaborates and runs the circuit named in `args`, writing the configured
/// trace file, and returns the finished simulation.
pub fn simulate(args: &SimArgs, config: &TockConfig) -> Result<Simulation, Box<dyn std::error::Error>> {
    let circuit = circuits::find(&args.circuit)
        .ok_or_else(|| format!("unknown circuit '{}' (see `tock list`)", args.circuit))?;
    let params = CircuitParams {
        param: args.param.unwrap_or(circuit.default_param),
        policy: config.simulation.unknown_state.into(),
    };
    let design = circuit.elaborate(&params)?;
    info!(
        circuit = circuit.name,
        param = params.param,
        signals = design.signals.len(),
        processes = design.processes.len(),
        "elaborated"
    );

    let format = match args.trace_format {
        Some(TraceFormatArg::Vcd) => TraceFormat::Vcd,
        Some(TraceFormatArg::Json) => TraceFormat::Json,
        Some(TraceFormatArg::None) => TraceFormat::None,
        None => config.trace.format,
    };
    let trace_path = args
        .output
        .clone()
        .or_else(|| config.trace.path.clone())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let ext = if format == TraceFormat::Json { "json" } else { "vcd" };
            PathBuf::from(format!("{}.{ext}", circuit.name))
        });

    let mut sim = Simulation::with_config(design, SimConfig::from_config(config))?;
    if format == TraceFormat::Vcd {
        sim.add_recorder(tock_sim::vcd_file_recorder(&trace_path)?)?;
    }
    for (name, value) in &args.set {
        sim.set_by_name(name, *value)?;
    }
    match circuit.clock {
        Some(clock) => {
            let clk = sim.signal(clock)?;
            sim.run_clock(clk, args.cycles)?;
        }
        None => {
            for _ in 0..args.cycles {
                sim.advance(1)?;
            }
        }
    }
    sim.finish()?;

    if format == TraceFormat::Json {
        std::fs::write(&trace_path, sim.trace().to_json()?)?;
    }
    if format != TraceFormat::None {
        info!(path = %trace_path.display(), "trace written");
    }
    Ok(sim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tock_config::load_config_from_str;

    fn args(circuit: &str, cycles: u64, format: TraceFormatArg, output: Option<PathBuf>) -> SimArgs {
        SimArgs {
            circuit: circuit.into(),
            param: None,
            cycles,
            set: Vec::new(),
            trace_format: Some(format),
            output: output.map(|p| p.to_string_lossy().into_owned()),
        }
    }

    #[test]
    fn blinker_runs_and_writes_vcd() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blink.vcd");
        let sim = simulate(
            &args("blinker", 8, TraceFormatArg::Vcd, Some(path.clone())),
            &TockConfig::default(),
        )
        .unwrap();
        assert_eq!(sim.value_by_name("blinker.cnt").unwrap(), 0);
        let vcd = std::fs::read_to_string(&path).unwrap();
        assert!(vcd.contains("$enddefinitions"));
        assert!(vcd.contains("led"));
    }

    #[test]
    fn register_with_inputs_and_json_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reg.json");
        let mut a = args("register", 2, TraceFormatArg::Json, Some(path.clone()));
        a.set = vec![("d".into(), 0x5A)];
        let sim = simulate(&a, &TockConfig::default()).unwrap();
        assert_eq!(sim.value_by_name("q").unwrap(), 0x5A);
        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(json.is_object());
    }

    #[test]
    fn combinational_circuit_advances_ticks() {
        let mut a = args("adder", 1, TraceFormatArg::None, None);
        a.set = vec![("a".into(), 9), ("b".into(), 8)];
        let sim = simulate(&a, &TockConfig::default()).unwrap();
        assert_eq!(sim.value_by_name("s").unwrap(), 1);
        assert_eq!(sim.value_by_name("c").unwrap(), 1);
    }

    #[test]
    fn combinational_circuit_steps_once_per_tick() {
        let sim = simulate(&args("adder", 3, TraceFormatArg::None, None), &TockConfig::default()).unwrap();
        assert_eq!(sim.time().tick, 3);
        assert_eq!(sim.stats().steps, 3);
    }

    #[test]
    fn config_selects_traced_signals() {
        let config = load_config_from_str("[trace]\nformat = \"none\"\nsignals = [\"led\"]\n").unwrap();
        let mut a = args("blinker", 4, TraceFormatArg::None, None);
        a.trace_format = None;
        let sim = simulate(&a, &config).unwrap();
        let names: Vec<&str> = sim.trace().signals.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["led"]);
    }

    #[test]
    fn unknown_circuit_and_input_are_errors() {
        let err = simulate(&args("nope", 1, TraceFormatArg::None, None), &TockConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("unknown circuit"));

        let mut a = args("counter", 1, TraceFormatArg::None, None);
        a.set = vec![("missing".into(), 1)];
        assert!(simulate(&a, &TockConfig::default()).is_err());
    }
}
