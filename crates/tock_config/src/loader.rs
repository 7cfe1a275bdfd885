//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::TockConfig;
use std::path::Path;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "tock.toml";

/// Loads and validates `<dir>/tock.toml`.
pub fn load_config(dir: &Path) -> Result<TockConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<TockConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<TockConfig, ConfigError> {
    let config: TockConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &TockConfig) -> Result<(), ConfigError> {
    if config.simulation.max_settle_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "simulation.max_settle_iterations must be at least 1".to_string(),
        ));
    }
    if config.simulation.max_edge_rounds == 0 {
        return Err(ConfigError::ValidationError(
            "simulation.max_edge_rounds must be at least 1".to_string(),
        ));
    }
    if let Some(path) = &config.trace.path {
        if path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "trace.path must not be empty".to_string(),
            ));
        }
    }
    if let Some(blank) = config.trace.signals.iter().find(|s| s.trim().is_empty()) {
        return Err(ConfigError::ValidationError(format!(
            "trace.signals contains an empty name ({blank:?})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TraceFormat;

    #[test]
    fn parse_full_config() {
        let toml = r#"
[simulation]
max_settle_iterations = 50
max_edge_rounds = 4
unknown_state = "recover"

[trace]
format = "json"
path = "out/trace.json"
signals = ["clk", "blink.cnt"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.simulation.max_settle_iterations, 50);
        assert_eq!(config.simulation.max_edge_rounds, 4);
        assert_eq!(config.trace.format, TraceFormat::Json);
        assert_eq!(config.trace.path.as_deref(), Some("out/trace.json"));
        assert_eq!(config.trace.signals, vec!["clk", "blink.cnt"]);
    }

    #[test]
    fn zero_settle_iterations_rejected() {
        let err = load_config_from_str("[simulation]\nmax_settle_iterations = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn zero_edge_rounds_rejected() {
        let err = load_config_from_str("[simulation]\nmax_edge_rounds = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn blank_trace_signal_rejected() {
        let err = load_config_from_str("[trace]\nsignals = [\"clk\", \" \"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn unknown_field_rejected() {
        let err = load_config_from_str("[simulation]\nmax_deltas = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[trace]\nformat = \"none\"\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.trace.format, TraceFormat::None);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
