//! Tenants command handler
//!
//! Lists the tenant table of the MySQL master.

use crate::config::Settings;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::tenant::{
    Engine, MongoTenantConfig, RedisTenantConfig, SqlTenantConfig, TenantConfigError, TenantConfigStore,
    TenantConnection,
};

/// Handler for the tenants command
pub struct TenantsCommandHandler {
    config: Settings,
}

impl TenantsCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Connects to the MySQL master, ensures the tenant table and prints it.
    ///
    /// # Errors
    /// - `MasterUnavailable` when no MySQL master is configured
    /// - Connection or query failures
    pub async fn execute(&self) -> AppResult<()> {
        let master = db::mysql::init_master_conn(&self.config.database).await?;
        let pool = master
            .client
            .as_ref()
            .ok_or(AppError::MasterUnavailable { engine: Engine::Mysql })?;

        let store = TenantConfigStore::new(pool.clone());
        store.ensure_table().await?;
        let tenants = store.list_tenants().await?;

        println!("{} tenants", tenants.len());
        let param = &self.config.tenancy.host_override_param;
        for tenant in &tenants {
            match describe_tenant(tenant, param) {
                Ok(line) => println!("  {line}"),
                Err(e) => println!("  {:>6} {:<16} invalid: {e}", tenant.tenant_id, tenant.code),
            }
        }

        master.closer.close().await;
        Ok(())
    }
}

/// `id code engine@host ...`, with hosts resolved through `host_param`.
pub fn describe_tenant(tenant: &TenantConnection, host_param: &str) -> Result<String, TenantConfigError> {
    let mut parts = Vec::new();
    for engine in tenant.engines()? {
        let host = match engine {
            Engine::Mysql => tenant
                .engine::<SqlTenantConfig>(engine)?
                .map(|c| c.host_for(host_param).to_string()),
            Engine::Mongodb => tenant
                .engine::<MongoTenantConfig>(engine)?
                .map(|c| c.host_for(host_param).to_string()),
            Engine::Redis => tenant
                .engine::<RedisTenantConfig>(engine)?
                .map(|c| c.host_for(host_param).to_string()),
        };
        if let Some(host) = host {
            parts.push(format!("{engine}@{host}"));
        }
    }

    let engines = if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(" ")
    };
    Ok(format!("{:>6} {:<16} {}", tenant.tenant_id, tenant.code, engines))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_tenant_resolves_hosts() {
        let tenant = TenantConnection::new(
            12,
            "acme",
            r#"{"mysql":{"host":"db.pub","port":3306,"database":"acme","lan":"10.0.0.5"},
                "redis":{"host":"r.pub","port":"6379"}}"#,
        );
        let line = describe_tenant(&tenant, "lan").unwrap();
        assert!(line.contains("mysql@10.0.0.5"));
        assert!(line.contains("redis@r.pub"));
        assert!(line.contains("acme"));
        assert!(!line.contains("mongodb"));
    }

    #[test]
    fn test_describe_tenant_without_engines() {
        let tenant = TenantConnection::new(3, "empty", "");
        assert!(describe_tenant(&tenant, "").unwrap().ends_with('-'));
    }

    #[test]
    fn test_describe_tenant_invalid_blob() {
        let tenant = TenantConnection::new(4, "broken", "{not json");
        assert!(describe_tenant(&tenant, "").is_err());
    }

    #[tokio::test]
    async fn test_requires_mysql_master() {
        let err = TenantsCommandHandler::new(Settings::default())
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MasterUnavailable { engine: Engine::Mysql }));
    }
}
