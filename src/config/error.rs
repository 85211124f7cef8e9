//! Errors raised while loading and validating [`Settings`](super::Settings)

use std::fmt::Display;

use thiserror::Error;

use crate::crypto::CipherError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// `field` is the dotted settings path, e.g. `redis.pool_size`
    #[error("Validation error: {field} - {message}")]
    ValidationError { field: String, message: String },

    /// A `FABRIC_*` variable holds a value outside its allowed set
    #[error("Invalid value '{value}' for {var}; expected one of: {expected}")]
    EnvVarError {
        var: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Mutual exclusivity error: {0}")]
    MutualExclusivityError(String),

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// A pool setting of `section` that exceeds its upper bound `limit_field`
    pub fn pool_bound(
        section: &str,
        field: &str,
        value: impl Display,
        limit_field: &str,
        limit: impl Display,
    ) -> Self {
        ConfigError::ValidationError {
            field: format!("{section}.{field}"),
            message: format!("{field} ({value}) cannot exceed {limit_field} ({limit})."),
        }
    }

    /// `tenancy.passphrase_key` rejected by the credential cipher
    pub fn passphrase(source: CipherError) -> Self {
        ConfigError::ValidationError {
            field: "tenancy.passphrase_key".to_string(),
            message: source.to_string(),
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        ConfigError::FileNotFound(path.into())
    }

    pub fn mutual_exclusivity(message: impl Into<String>) -> Self {
        ConfigError::MutualExclusivityError(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_bound_names_section_and_limit() {
        let err = ConfigError::pool_bound("redis", "min_idle_connections", 12, "pool_size", 10);
        match err {
            ConfigError::ValidationError { field, message } => {
                assert_eq!(field, "redis.min_idle_connections");
                assert_eq!(message, "min_idle_connections (12) cannot exceed pool_size (10).");
            }
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_env_var_error_display() {
        let err = ConfigError::EnvVarError {
            var: "FABRIC_APP_ENV",
            value: "qa".to_string(),
            expected: "development, test",
        };
        assert_eq!(
            err.to_string(),
            "Invalid value 'qa' for FABRIC_APP_ENV; expected one of: development, test"
        );
    }
}
