//! Configuration merger for CLI arguments and config files
//!
//! This module handles merging CLI argument overrides with file-based configuration,
//! implementing the configuration precedence logic.

use std::path::Path;

use super::parser::{Cli, Commands};
use crate::config::{ConfigError, ConfigLoader, Environment, Settings};

/// Applies CLI overrides on top of file-based configuration.
///
/// CLI arguments take precedence over configuration file values.
pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    /// Create a new configuration merger with base configuration
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Load the base configuration from `config_path`, or from the layered
    /// directory when no path is given.
    ///
    /// # Errors
    /// Returns ConfigError if configuration loading or validation fails
    pub fn from_config_path(
        config_path: Option<&Path>,
        environment: Option<Environment>,
    ) -> Result<Self, ConfigError> {
        let loader = match config_path {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::file_not_found(path.display().to_string()));
                }
                ConfigLoader::with_file(path)
            }
            None => ConfigLoader::new()?,
        };
        let loader = match environment {
            Some(env) => loader.environment_override(env),
            None => loader,
        };

        Ok(Self::new(loader.load()?))
    }

    /// Merge CLI arguments with the base configuration
    ///
    /// The merged settings are validated again before they are returned.
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        self.apply_global_overrides(&mut config, cli);

        if let Some(ref command) = cli.command {
            self.apply_command_overrides(&mut config, command);
        }

        config.validate()?;

        Ok(config)
    }

    fn apply_global_overrides(&self, config: &mut Settings, cli: &Cli) {
        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }
    }

    fn apply_command_overrides(&self, config: &mut Settings, command: &Commands) {
        match command {
            Commands::Check { .. } => {}
            Commands::Tenants { host_param } => {
                if let Some(param) = host_param {
                    config.tenancy.host_override_param = param.clone();
                }
            }
            Commands::Secret { key, .. } => {
                if let Some(key) = key {
                    config.tenancy.passphrase_key = key.clone();
                }
            }
        }
    }

    /// Get the current configuration (useful for inspection)
    pub fn config(&self) -> &Settings {
        &self.base_config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use clap::Parser;

    const KEY: &str = "AAAAAAAAAAAAAAAAAAAAAA==";

    fn merge(args: &[&str]) -> Result<Settings, ConfigError> {
        let cli = Cli::try_parse_from(args).unwrap();
        ConfigurationMerger::new(Settings::default()).merge_cli_args(&cli)
    }

    #[test]
    fn test_configuration_merger_new() {
        let base_config = Settings::default();
        let merger = ConfigurationMerger::new(base_config.clone());
        assert_eq!(merger.config(), &base_config);
    }

    #[test]
    fn test_verbose_and_quiet_flags() {
        assert_eq!(merge(&["tenant-fabric", "--verbose"]).unwrap().logger.level, "debug");
        assert_eq!(merge(&["tenant-fabric", "--quiet"]).unwrap().logger.level, "error");
    }

    #[test]
    fn test_tenants_host_param_override() {
        let merged = merge(&["tenant-fabric", "tenants", "--host-param", "lan_host"]).unwrap();
        assert_eq!(merged.tenancy.host_override_param, "lan_host");
    }

    #[test]
    fn test_secret_key_override() {
        let merged = merge(&["tenant-fabric", "secret", "--key", KEY, "encrypt", "pw"]).unwrap();
        assert_eq!(merged.tenancy.passphrase_key, KEY);
    }

    #[test]
    fn test_from_config_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let mut settings = Settings::default();
        settings.redis.prefix = "from_file".to_string();
        file.write_all(toml::to_string(&settings).unwrap().as_bytes())
            .unwrap();

        let merger = ConfigurationMerger::from_config_path(Some(file.path()), Some(Environment::Test)).unwrap();
        assert_eq!(merger.config().redis.prefix, "from_file");
    }

    #[test]
    fn test_missing_config_file() {
        let result = ConfigurationMerger::from_config_path(Some(Path::new("/no/such/fabric.toml")), None);
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
