//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::build;

/// Multi-tenant connection and cache fabric
#[derive(Parser, Debug)]
#[command(name = "tenant-fabric")]
#[command(about = "Multi-tenant MySQL, MongoDB and Redis connection fabric")]
#[command(long_about = "
tenant-fabric connects the master MySQL, MongoDB and Redis endpoints, reads
the tenant table from the MySQL master and opens one connection per tenant
and engine.

EXAMPLES:
    # Boot every connection, print counts and shut down
    tenant-fabric check

    # Only validate the configuration
    tenant-fabric check --dry-run

    # Use a single configuration file in production mode
    tenant-fabric --config /etc/fabric/fabric.toml --env production check

    # List tenants and the hosts they resolve to on the private network
    tenant-fabric tenants --host-param private_host

    # Encrypt a tenant password with the configured passphrase key
    tenant-fabric secret encrypt 's3cret'

    # Decrypt a stored ticket with an explicit key
    tenant-fabric secret decrypt eyJpdiI6... --key AAAAAAAAAAAAAAAAAAAAAA==
")]
#[command(version = build::CLAP_LONG_VERSION)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Load a single TOML file instead of the layered `config/` directory.
    /// The file must exist and be readable.
    ///
    /// Example: --config /etc/fabric/fabric.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects the `{environment}.toml` overlay instead of `FABRIC_APP_ENV`.
    ///
    /// Available values: development (dev), test, staging (stage), production (prod)
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    ///
    /// Raises the log level to debug. Cannot be used with --quiet.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    ///
    /// Lowers the log level to error. Cannot be used with --verbose.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect everything and report connection counts (default)
    ///
    /// Boots every master and tenant connection, prints the number of
    /// connections per engine and shuts them down again.
    ///
    /// Examples:
    ///   tenant-fabric check             # Connect and report
    ///   tenant-fabric check --dry-run   # Validate config only
    Check {
        /// Validate configuration and exit without connecting
        #[arg(long)]
        dry_run: bool,
    },
    /// List tenants and the engines each one declares
    ///
    /// Connects to the MySQL master, creates the tenant table when missing
    /// and prints one line per tenant.
    Tenants {
        /// Alternate host key to resolve in tenant sub-configs
        ///
        /// Overrides `tenancy.host_override_param` for this run.
        #[arg(long, value_name = "NAME", value_parser = super::validation::validate_host_param)]
        host_param: Option<String>,
    },
    /// Encrypt or decrypt tenant credentials
    Secret {
        #[command(subcommand)]
        action: SecretAction,

        /// Base64 passphrase key
        ///
        /// Overrides `tenancy.passphrase_key`. Must decode to 16, 24 or 32 bytes.
        #[arg(long, global = true, value_name = "KEY", value_parser = super::validation::validate_passphrase_key)]
        key: Option<String>,
    },
}

/// Credential ticket operations
#[derive(Subcommand, Debug, Clone)]
pub enum SecretAction {
    /// Encrypt a plaintext password into a ticket
    Encrypt {
        /// Plaintext to encrypt
        text: String,
    },
    /// Decrypt a ticket back into the plaintext password
    Decrypt {
        /// Base64 ticket as stored in the tenant table
        ticket: String,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

impl Cli {
    /// Validate CLI arguments and provide detailed error messages
    ///
    /// Covers combinations clap cannot express on its own.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use --verbose and --quiet together".to_string());
        }

        if let Some(Commands::Secret {
            action: SecretAction::Encrypt { text },
            ..
        }) = &self.command
            && text.is_empty()
        {
            return Err("Refusing to encrypt an empty password".to_string());
        }

        Ok(())
    }

    /// Get detailed help for validation errors
    pub fn get_validation_help() -> &'static str {
        r#"
Common validation errors and solutions:

Configuration file validation:
  - File must exist and be readable
  - File must be in TOML format
  - Example: --config /path/to/fabric.toml

Passphrase key validation:
  - Must be base64 and decode to 16, 24 or 32 bytes
  - Example: --key AAAAAAAAAAAAAAAAAAAAAA==

Host parameter validation:
  - Letters, digits, '_' and '-' only
  - Example: --host-param private_host

For more help, use: tenant-fabric help <subcommand>
"#
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const KEY: &str = "AAAAAAAAAAAAAAAAAAAAAA==";

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_flag() {
        let err = Cli::try_parse_from(["tenant-fabric", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["tenant-fabric", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_default_behavior() {
        let cli = Cli::try_parse_from(["tenant-fabric"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(!cli.quiet);
        assert!(cli.config.is_none());
        assert!(cli.env.is_none());
    }

    #[test]
    fn test_check_command() {
        let cli = Cli::try_parse_from(["tenant-fabric", "check", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Check { dry_run: true })));
    }

    #[test]
    fn test_tenants_command() {
        let cli = Cli::try_parse_from(["tenant-fabric", "tenants", "--host-param", "private_host"]).unwrap();
        match cli.command {
            Some(Commands::Tenants { host_param }) => assert_eq!(host_param.as_deref(), Some("private_host")),
            other => panic!("Expected Tenants command, got {other:?}"),
        }
        assert!(Cli::try_parse_from(["tenant-fabric", "tenants", "--host-param", "bad name"]).is_err());
    }

    #[test]
    fn test_secret_commands() {
        let cli = Cli::try_parse_from(["tenant-fabric", "secret", "encrypt", "pw", "--key", KEY]).unwrap();
        match cli.command {
            Some(Commands::Secret {
                action: SecretAction::Encrypt { text },
                key,
            }) => {
                assert_eq!(text, "pw");
                assert_eq!(key.as_deref(), Some(KEY));
            }
            other => panic!("Expected Secret command, got {other:?}"),
        }

        let cli = Cli::try_parse_from(["tenant-fabric", "secret", "decrypt", "ticket"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Secret {
                action: SecretAction::Decrypt { .. },
                key: None
            })
        ));

        assert!(Cli::try_parse_from(["tenant-fabric", "secret", "encrypt", "pw", "--key", "short"]).is_err());
    }

    #[test]
    fn test_env_aliases() {
        let cli = Cli::try_parse_from(["tenant-fabric", "--env", "prod"]).unwrap();
        let env: crate::config::Environment = cli.env.unwrap().into();
        assert!(env.is_production());
    }

    #[test]
    fn test_conflicting_verbose_quiet() {
        let err = Cli::try_parse_from(["tenant-fabric", "--verbose", "--quiet"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let cli = Cli::try_parse_from(["tenant-fabric", "secret", "encrypt", ""]).unwrap();
        assert!(cli.validate().is_err());
    }
}
