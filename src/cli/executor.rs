//! Command executor for dispatching CLI commands
//!
//! This module provides the main entry point for executing CLI commands
//! after parsing and configuration loading.

use super::handlers::{CheckCommandHandler, SecretCommandHandler, TenantsCommandHandler};
use super::parser::{Cli, Commands};
use crate::config::{ConfigError, Settings};
use crate::error::AppResult;

/// Execute a CLI command with the given settings
///
/// Runs `check` when no subcommand is given.
///
/// # Errors
/// Returns errors from command handlers or validation failures
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    validate_command_args(cli)?;

    match &cli.command {
        Some(Commands::Check { dry_run }) => CheckCommandHandler::new(settings).execute(*dry_run).await,
        None => CheckCommandHandler::new(settings).execute(false).await,
        Some(Commands::Tenants { .. }) => TenantsCommandHandler::new(settings).execute().await,
        Some(Commands::Secret { action, .. }) => SecretCommandHandler::new(settings).execute(action),
    }
}

/// Validate command arguments before execution
fn validate_command_args(cli: &Cli) -> AppResult<()> {
    cli.validate()
        .map_err(|msg| ConfigError::validation("cli_arguments".to_string(), msg))?;
    Ok(())
}
