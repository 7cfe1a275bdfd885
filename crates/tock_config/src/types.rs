//! Strongly-typed representation of `tock.toml`.

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TockConfig {
    /// Scheduler limits and runtime policies.
    #[serde(default)]
    pub simulation: SimulationSettings,
    /// Trace output.
    #[serde(default)]
    pub trace: TraceSettings,
}

/// The `[simulation]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSettings {
    /// Maximum delta iterations while settling combinational logic in one step.
    #[serde(default = "default_max_settle_iterations")]
    pub max_settle_iterations: u32,
    /// Maximum cascaded clock-edge rounds in one step.
    #[serde(default = "default_max_edge_rounds")]
    pub max_edge_rounds: u32,
    /// What state machines do when their state signal holds an undeclared value.
    #[serde(default)]
    pub unknown_state: UnknownStateSetting,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            max_settle_iterations: default_max_settle_iterations(),
            max_edge_rounds: default_max_edge_rounds(),
            unknown_state: UnknownStateSetting::default(),
        }
    }
}

fn default_max_settle_iterations() -> u32 {
    1000
}

fn default_max_edge_rounds() -> u32 {
    64
}

/// State machine behavior on an undeclared state value.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnknownStateSetting {
    /// Log a warning and return to the initial state (default).
    #[default]
    Recover,
    /// Abort the simulation with an unknown-state error.
    Fail,
}

/// The `[trace]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceSettings {
    /// Output format.
    #[serde(default)]
    pub format: TraceFormat,
    /// Output file; `None` lets the caller choose.
    pub path: Option<String>,
    /// Hierarchical names of signals to record; empty records every named signal.
    #[serde(default)]
    pub signals: Vec<String>,
}

/// Trace output format.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TraceFormat {
    /// Value Change Dump (IEEE 1364), the default.
    #[default]
    Vcd,
    /// JSON dump of the in-memory trace.
    Json,
    /// No trace file.
    None,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_config_from_str;

    #[test]
    fn defaults_when_empty() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.simulation.max_settle_iterations, 1000);
        assert_eq!(config.simulation.max_edge_rounds, 64);
        assert_eq!(config.simulation.unknown_state, UnknownStateSetting::Recover);
        assert_eq!(config.trace.format, TraceFormat::Vcd);
        assert!(config.trace.path.is_none());
        assert!(config.trace.signals.is_empty());
    }

    #[test]
    fn trace_format_all_variants() {
        for (input, expected) in [
            ("vcd", TraceFormat::Vcd),
            ("json", TraceFormat::Json),
            ("none", TraceFormat::None),
        ] {
            let toml = format!(
                r#"
[trace]
format = "{input}"
"#
            );
            let config = load_config_from_str(&toml).unwrap();
            assert_eq!(config.trace.format, expected);
        }
    }

    #[test]
    fn unknown_state_fail() {
        let config = load_config_from_str(
            r#"
[simulation]
unknown_state = "fail"
"#,
        )
        .unwrap();
        assert_eq!(config.simulation.unknown_state, UnknownStateSetting::Fail);
        assert_eq!(config.simulation.max_edge_rounds, 64);
    }
}
