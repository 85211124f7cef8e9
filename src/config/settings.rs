//! Configuration settings structures for tenant-fabric
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "tenant-fabric".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/app.log".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_max_idle_connections() -> u32 {
    2
}

fn default_max_open_connections() -> u32 {
    10
}

fn default_max_connection_lifetime() -> u64 {
    3600
}

fn default_max_idle_connection_lifetime() -> u64 {
    600
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_mongo_connect_timeout() -> u64 {
    10
}

fn default_mongo_max_pool_size() -> u32 {
    100
}

fn default_mongo_min_pool_size() -> u32 {
    0
}

fn default_redis_max_retries() -> u32 {
    3
}

fn default_redis_pool_size() -> u32 {
    10
}

fn default_redis_min_idle() -> u32 {
    0
}

fn default_redis_dial_timeout_ms() -> u64 {
    5000
}

fn default_redis_read_timeout_ms() -> u64 {
    3000
}

fn default_redis_write_timeout_ms() -> u64 {
    3000
}

fn default_redis_pool_timeout_ms() -> u64 {
    4000
}

fn default_cache_separator() -> String {
    "_".to_string()
}

fn default_span_label() -> String {
    "cache".to_string()
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Master Endpoint
// ============================================================================

/// Static master endpoint of one engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MasterEndpoint {
    #[serde(default)]
    pub database: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Host name; for Redis a comma separated list selects cluster mode
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub port: u16,

    /// Read replica hosts (Redis only)
    #[serde(default)]
    pub reads: Vec<String>,
}

impl MasterEndpoint {
    /// An endpoint without a host is treated as "not configured".
    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty()
    }
}

// ============================================================================
// MySQL Configuration
// ============================================================================

/// MySQL pool configuration shared by the master and every tenant pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlConfig {
    #[serde(default)]
    pub master: MasterEndpoint,

    /// Idle connections each pool keeps warm.
    ///
    /// bb8 has no idle ceiling, so this becomes the pool's `min_idle`: every
    /// pool opens this many connections at boot and refills to it.
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: u32,

    /// Maximum number of connections in each pool
    #[serde(default = "default_max_open_connections")]
    pub max_open_connections: u32,

    /// Connection lifetime in seconds, 0 disables the limit
    #[serde(default = "default_max_connection_lifetime")]
    pub max_connection_lifetime: u64,

    /// Idle connection lifetime in seconds, 0 disables the limit
    #[serde(default = "default_max_idle_connection_lifetime")]
    pub max_idle_connection_lifetime: u64,

    /// Checkout timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    /// Log every SQL statement at debug level
    #[serde(default)]
    pub debug: bool,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            master: MasterEndpoint::default(),
            max_idle_connections: default_max_idle_connections(),
            max_open_connections: default_max_open_connections(),
            max_connection_lifetime: default_max_connection_lifetime(),
            max_idle_connection_lifetime: default_max_idle_connection_lifetime(),
            connection_timeout: default_connection_timeout(),
            debug: false,
        }
    }
}

// ============================================================================
// MongoDB Configuration
// ============================================================================

/// MongoDB client configuration shared by the master and every tenant client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoConfig {
    #[serde(default)]
    pub master: MasterEndpoint,

    /// Connect and server selection timeout in seconds
    #[serde(default = "default_mongo_connect_timeout")]
    pub connect_timeout: u64,

    #[serde(default = "default_mongo_max_pool_size")]
    pub max_connection_pool_size: u32,

    #[serde(default = "default_mongo_min_pool_size")]
    pub min_connection_pool_size: u32,

    /// Idle connection lifetime in seconds, 0 disables the limit
    #[serde(default = "default_max_idle_connection_lifetime")]
    pub max_idle_connection_lifetime: u64,

    /// Log every command at debug level
    #[serde(default)]
    pub debug: bool,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            master: MasterEndpoint::default(),
            connect_timeout: default_mongo_connect_timeout(),
            max_connection_pool_size: default_mongo_max_pool_size(),
            min_connection_pool_size: default_mongo_min_pool_size(),
            max_idle_connection_lifetime: default_max_idle_connection_lifetime(),
            debug: false,
        }
    }
}

// ============================================================================
// Redis Configuration
// ============================================================================

/// Redis configuration shared by the master and every tenant node
///
/// Timeouts are in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub master: MasterEndpoint,

    /// Key prefix of the master and tenant caches
    #[serde(default)]
    pub prefix: String,

    /// Cluster command retries
    #[serde(default = "default_redis_max_retries")]
    pub max_retries: u32,

    /// Connections per node
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: u32,

    #[serde(default = "default_redis_min_idle")]
    pub min_idle_connections: u32,

    #[serde(default = "default_redis_dial_timeout_ms")]
    pub dial_timeout: u64,

    #[serde(default = "default_redis_read_timeout_ms")]
    pub read_timeout: u64,

    #[serde(default = "default_redis_write_timeout_ms")]
    pub write_timeout: u64,

    #[serde(default = "default_redis_pool_timeout_ms")]
    pub pool_timeout: u64,

    /// Connection lifetime in seconds, 0 disables the limit
    #[serde(default)]
    pub max_connection_lifetime: u64,

    /// Idle connection lifetime in seconds, 0 disables the limit
    #[serde(default = "default_max_idle_connection_lifetime")]
    pub max_idle_connection_lifetime: u64,

    #[serde(default)]
    pub debug: bool,
}

impl RedisConfig {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout)
    }

    pub fn pool_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_timeout)
    }

    /// Upper bound for a single command round trip.
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout.max(self.write_timeout))
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            master: MasterEndpoint::default(),
            prefix: String::new(),
            max_retries: default_redis_max_retries(),
            pool_size: default_redis_pool_size(),
            min_idle_connections: default_redis_min_idle(),
            dial_timeout: default_redis_dial_timeout_ms(),
            read_timeout: default_redis_read_timeout_ms(),
            write_timeout: default_redis_write_timeout_ms(),
            pool_timeout: default_redis_pool_timeout_ms(),
            max_connection_lifetime: 0,
            max_idle_connection_lifetime: default_max_idle_connection_lifetime(),
            debug: false,
        }
    }
}

// ============================================================================
// Tenancy Configuration
// ============================================================================

/// Tenant bootstrap and cache facade configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Name of the alternate host key in tenant sub-configs, empty to disable
    #[serde(default)]
    pub host_override_param: String,

    /// Base64 AES key for tenant passwords, empty when passwords are plain text
    #[serde(default)]
    pub passphrase_key: String,

    /// Check the ticket MAC before decrypting
    #[serde(default)]
    pub verify_mac: bool,

    #[serde(default = "default_cache_separator")]
    pub cache_separator: String,

    /// Span name prefix of cache operations
    #[serde(default = "default_span_label")]
    pub span_label: String,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            host_override_param: String::new(),
            passphrase_key: String::new(),
            verify_mac: false,
            cache_separator: default_cache_separator(),
            span_label: default_span_label(),
        }
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// Whether console output is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether to use colored output
    #[serde(default = "default_true")]
    pub colored: bool,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    /// Whether file output is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Path to the log file
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Whether to append to existing file
    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_log_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level or filter directive, e.g. "info" or "tenant_fabric=debug"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output settings
    #[serde(default)]
    pub console: ConsoleSettings,

    /// File output settings
    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

impl LoggerSettings {
    /// Convert LoggerSettings to the runtime LoggerConfig
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console_config = ConsoleConfig::new(self.console.enabled, self.console.colored);
        let file_config = self.file.into_file_config()?;

        LoggerConfig::new(console_config, file_config, self.level).map_err(|e| {
            ConfigError::ValidationError {
                field: "logger".to_string(),
                message: e.to_string(),
            }
        })
    }
}

impl FileSettings {
    /// Convert FileSettings to FileConfig
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = self
            .format
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: e.to_string(),
            })?;

        Ok(FileConfig::new(
            self.enabled,
            PathBuf::from(self.path),
            self.append,
            format,
        ))
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application information
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerSettings,

    /// MySQL master and tenant pools
    #[serde(default)]
    pub database: SqlConfig,

    /// MongoDB master and tenant clients
    #[serde(default)]
    pub mongo: MongoConfig,

    /// Redis master and tenant nodes
    #[serde(default)]
    pub redis: RedisConfig,

    /// Tenant bootstrap options
    #[serde(default)]
    pub tenancy: TenancyConfig,
}
