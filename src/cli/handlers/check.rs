//! Check command handler
//!
//! Validates the configuration and, unless in dry-run mode, boots every
//! connection once and reports the counts.

use crate::config::{MasterEndpoint, Settings};
use crate::deps::DbDeps;
use crate::error::AppResult;

/// Handler for the check command
pub struct CheckCommandHandler {
    config: Settings,
}

impl CheckCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Execute the check command
    ///
    /// # Errors
    /// - Configuration validation errors
    /// - Any master or tenant connection failure (when not a dry run)
    pub async fn execute(&self, dry_run: bool) -> AppResult<()> {
        self.config.validate()?;
        println!("✓ Configuration is valid");
        for line in self.describe_masters() {
            println!("  {line}");
        }

        if dry_run {
            println!("Dry run completed successfully - no connections were opened");
            return Ok(());
        }

        let deps = DbDeps::init(&self.config).await?;
        for summary in deps.summary() {
            println!("✓ {summary}");
        }
        deps.shutdown().await;
        println!("All connections verified and closed");
        Ok(())
    }

    /// One line per engine describing its master endpoint.
    pub fn describe_masters(&self) -> Vec<String> {
        vec![
            describe("mysql", &self.config.database.master),
            describe("mongodb", &self.config.mongo.master),
            describe("redis", &self.config.redis.master),
        ]
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}

fn describe(engine: &str, master: &MasterEndpoint) -> String {
    if !master.is_configured() {
        return format!("{engine:<8} master: not configured");
    }
    let mut line = format!("{engine:<8} master: {}:{}", master.host, master.port);
    if !master.database.is_empty() {
        line.push_str(&format!(" / {}", master.database));
    }
    if !master.reads.is_empty() {
        line.push_str(&format!(" ({} read replicas)", master.reads.len()));
    }
    line
}
