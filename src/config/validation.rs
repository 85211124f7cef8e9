//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use crate::config::error::ConfigError;
use crate::config::settings::{
    FileSettings, LoggerSettings, MongoConfig, RedisConfig, Settings, SqlConfig, TenancyConfig,
};
use crate::crypto::CredentialCipher;

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid log formats
const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

impl SqlConfig {
    /// Validate MySQL pool configuration
    ///
    /// # Validation Rules
    /// - Max open connections must be greater than 0
    /// - Max idle connections must not exceed max open connections
    /// - Connection timeout must be greater than 0
    /// - A configured master needs a port and a database
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_open_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_open_connections",
                "Max open connections must be greater than 0.",
            ));
        }

        if self.max_idle_connections > self.max_open_connections {
            return Err(ConfigError::pool_bound(
                "database",
                "max_idle_connections",
                self.max_idle_connections,
                "max_open_connections",
                self.max_open_connections,
            ));
        }

        if self.connection_timeout == 0 {
            return Err(ConfigError::validation(
                "database.connection_timeout",
                "Connection timeout must be greater than 0 seconds.",
            ));
        }

        if self.master.is_configured() {
            if self.master.port == 0 {
                return Err(ConfigError::validation(
                    "database.master.port",
                    "Port must be between 1 and 65535.",
                ));
            }
            if self.master.database.trim().is_empty() {
                return Err(ConfigError::validation(
                    "database.master.database",
                    "Database name is required when a master host is configured.",
                ));
            }
        }

        Ok(())
    }
}

impl MongoConfig {
    /// Validate MongoDB client configuration
    ///
    /// # Validation Rules
    /// - Max pool size must be greater than 0
    /// - Min pool size must not exceed max pool size
    /// - Connect timeout must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connection_pool_size == 0 {
            return Err(ConfigError::validation(
                "mongo.max_connection_pool_size",
                "Max connection pool size must be greater than 0.",
            ));
        }

        if self.min_connection_pool_size > self.max_connection_pool_size {
            return Err(ConfigError::pool_bound(
                "mongo",
                "min_connection_pool_size",
                self.min_connection_pool_size,
                "max_connection_pool_size",
                self.max_connection_pool_size,
            ));
        }

        if self.connect_timeout == 0 {
            return Err(ConfigError::validation(
                "mongo.connect_timeout",
                "Connect timeout must be greater than 0 seconds.",
            ));
        }

        if self.master.is_configured() && self.master.database.trim().is_empty() {
            return Err(ConfigError::validation(
                "mongo.master.database",
                "Database name is required when a master host is configured.",
            ));
        }

        Ok(())
    }
}

impl RedisConfig {
    /// Validate Redis configuration
    ///
    /// # Validation Rules
    /// - Pool size must be greater than 0
    /// - Min idle connections must not exceed pool size
    /// - Dial, read, write and pool timeouts must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::validation(
                "redis.pool_size",
                "Pool size must be greater than 0.",
            ));
        }

        if self.min_idle_connections > self.pool_size {
            return Err(ConfigError::pool_bound(
                "redis",
                "min_idle_connections",
                self.min_idle_connections,
                "pool_size",
                self.pool_size,
            ));
        }

        for (field, value) in [
            ("redis.dial_timeout", self.dial_timeout),
            ("redis.read_timeout", self.read_timeout),
            ("redis.write_timeout", self.write_timeout),
            ("redis.pool_timeout", self.pool_timeout),
        ] {
            if value == 0 {
                return Err(ConfigError::validation(
                    field,
                    "Timeout must be greater than 0 milliseconds.",
                ));
            }
        }

        if self.master.is_configured() && self.master.port == 0 {
            return Err(ConfigError::validation(
                "redis.master.port",
                "Port must be between 1 and 65535.",
            ));
        }

        Ok(())
    }
}

impl TenancyConfig {
    /// Validate tenancy configuration
    ///
    /// # Validation Rules
    /// - A non-empty passphrase key must be base64 of 16, 24 or 32 bytes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.passphrase_key.is_empty() {
            CredentialCipher::from_passphrase(&self.passphrase_key)
                .map_err(ConfigError::passphrase)?;
        }

        Ok(())
    }
}

impl FileSettings {
    /// Validate file settings
    fn validate(&self) -> Result<(), ConfigError> {
        // If file logging is enabled, path must not be empty
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        // Validate log format
        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - If file logging is enabled, path must not be empty
    /// - Log format must be one of: full, compact, json
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        self.file.validate()?;

        Ok(())
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// This method validates all sub-configurations and returns the first
    /// validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logger.validate()?;
        self.database.validate()?;
        self.mongo.validate()?;
        self.redis.validate()?;
        self.tenancy.validate()?;
        Ok(())
    }
}
