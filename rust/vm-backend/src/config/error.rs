//! Configuration error types with actionable user messages.

use std::fmt;

/// Configuration errors that say what is wrong and how to fix it.
#[derive(Debug, Clone)]
pub enum ConfigurationError {
    /// Invalid configuration value.
    Invalid {
        /// What is wrong.
        message: String,
        /// How to fix it.
        fix_hint: String,
    },
    /// Multiple errors occurred.
    Multiple(Vec<ConfigurationError>),
}

impl std::error::Error for ConfigurationError {}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { message, fix_hint } => {
                write!(
                    f,
                    "Invalid configuration: {message}\n\nHow to fix: {fix_hint}"
                )
            }
            Self::Multiple(errors) => {
                writeln!(f, "Multiple configuration errors:")?;
                for (i, err) in errors.iter().enumerate() {
                    writeln!(f, "\n{}. {}", i + 1, err)?;
                }
                Ok(())
            }
        }
    }
}

impl ConfigurationError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid(message: impl Into<String>, fix_hint: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
            fix_hint: fix_hint.into(),
        }
    }

    /// Collapse a list of errors: `Ok` when empty, the error itself when
    /// there is one, [`Self::Multiple`] otherwise.
    pub fn collect(mut errors: Vec<ConfigurationError>) -> ConfigResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(errors)),
        }
    }

    /// Number of errors (1 for single errors, N for multiple).
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Multiple(errors) => errors.len(),
            Self::Invalid { .. } => 1,
        }
    }
}

/// Result type for configuration validation.
pub type ConfigResult<T> = Result<T, ConfigurationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_error_display() {
        let err = ConfigurationError::invalid(
            "server.address \"nowhere\" has no port",
            "Use host:port, for example 0.0.0.0:8080 or :8080",
        );
        let msg = err.to_string();
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("nowhere"));
        assert!(msg.contains("How to fix"));
    }

    #[test]
    fn test_collect() {
        assert!(ConfigurationError::collect(Vec::new()).is_ok());

        let single = ConfigurationError::collect(vec![ConfigurationError::invalid("a", "b")])
            .unwrap_err();
        assert_eq!(single.count(), 1);

        let err = ConfigurationError::collect(vec![
            ConfigurationError::invalid("Error 1", "Fix 1"),
            ConfigurationError::invalid("Error 2", "Fix 2"),
        ])
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Multiple configuration errors"));
        assert!(msg.contains("1."));
        assert!(msg.contains("2."));
        assert_eq!(err.count(), 2);
    }
}
