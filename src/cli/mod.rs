//! CLI module for tenant-fabric
//!
//! This module provides command-line interface functionality including:
//! - Argument parsing with clap
//! - Configuration merging (CLI args + config files)
//! - Command execution and validation

pub mod config_merger;
pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

pub use config_merger::ConfigurationMerger;
pub use executor::execute_command;
pub use parser::{Cli, Commands, Environment, SecretAction};

use crate::config::{ConfigError, Settings};
use crate::error::AppResult;
use crate::logger::{LogLevelHandle, init_logger};

/// Load the configuration files and apply CLI overrides
///
/// # Errors
/// Returns error if configuration loading, merging, or validation fails
pub fn load_and_merge_config(cli: &Cli) -> Result<Settings, ConfigError> {
    let merger = ConfigurationMerger::from_config_path(cli.config.as_deref(), cli.env.map(Into::into))?;
    merger.merge_cli_args(cli)
}

/// Initialize logger from settings
///
/// # Errors
/// Returns error if logger configuration is invalid or a global subscriber
/// is already installed
pub fn init_logger_from_settings(settings: &Settings) -> AppResult<LogLevelHandle> {
    let logger_config = settings.logger.clone().into_logger_config()?;
    Ok(init_logger(logger_config)?)
}
