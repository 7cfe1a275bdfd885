//! Error types for configuration loading.

/// Errors raised while reading or validating `tock.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("simulation.max_edge_rounds must be at least 1".into());
        assert_eq!(
            format!("{err}"),
            "validation error: simulation.max_edge_rounds must be at least 1"
        );
    }

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError("expected '=' at line 3".to_string());
        assert_eq!(
            format!("{err}"),
            "failed to parse configuration: expected '=' at line 3"
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ConfigError::from(io);
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
