//! MySQL connection factory.

use tracing::{debug, info};

use crate::config::SqlConfig;
use crate::db::{AsyncDbPool, Closer, MasterConn, TenantConns, endpoint_url, establish_async_connection_pool};
use crate::error::AppError;
use crate::tenant::{Engine, SecretResolver, SqlTenantConfig, TenantConfigStore, TenantConnection};

const LABEL: &str = "mysql master";

/// Connects to the master MySQL database.
///
/// Returns an absent connection when no master host is configured.
pub async fn init_master_conn(config: &SqlConfig) -> Result<MasterConn<AsyncDbPool>, AppError> {
    let master = &config.master;
    if !master.is_configured() {
        info!("MySQL master is not configured, skipping");
        return Ok(MasterConn::absent(LABEL));
    }

    let url = endpoint_url(
        "mysql",
        &master.username,
        &master.password,
        &master.host,
        master.port,
        &master.database,
    )
    .map_err(|e| AppError::master(Engine::Mysql, e))?;
    let pool = establish_async_connection_pool(&url, config)
        .await
        .map_err(|e| AppError::master(Engine::Mysql, e))?;

    info!(host = %master.host, database = %master.database, "MySQL master connected");
    Ok(MasterConn {
        client: Some(pool),
        database: master.database.clone(),
        closer: Closer::noop(LABEL),
    })
}

/// Ensures the tenant table exists, then connects every tenant that declares MySQL.
pub async fn init_tenant_conns(
    config: &SqlConfig,
    master: &AsyncDbPool,
    host_override_param: &str,
    secrets: &SecretResolver,
) -> Result<TenantConns<AsyncDbPool>, AppError> {
    let store = TenantConfigStore::new(master.clone());
    store.ensure_table().await?;
    let tenants = store.list_tenants().await?;
    connect_tenants(config, &tenants, host_override_param, secrets).await
}

/// Connects the MySQL endpoint of each tenant in `tenants`.
pub async fn connect_tenants(
    config: &SqlConfig,
    tenants: &[TenantConnection],
    host_override_param: &str,
    secrets: &SecretResolver,
) -> Result<TenantConns<AsyncDbPool>, AppError> {
    let mut conns = TenantConns::default();

    for tenant in tenants {
        let Some(tenant_config) = tenant.engine::<SqlTenantConfig>(Engine::Mysql)? else {
            debug!(tenant_id = tenant.tenant_id, "Tenant declares no MySQL connection");
            conns.insert_absent(tenant.tenant_id);
            continue;
        };

        let pool = connect_tenant(config, &tenant_config, host_override_param, secrets)
            .await
            .map_err(|e| AppError::tenant(Engine::Mysql, tenant, e))?;
        debug!(tenant_id = tenant.tenant_id, database = %tenant_config.database, "Tenant MySQL connected");
        conns.insert(
            tenant.tenant_id,
            pool,
            tenant_config.database.clone(),
            Closer::noop(format!("mysql tenant {}", tenant.tenant_id)),
        );
    }

    info!(
        tenants = tenants.len(),
        connected = conns.connected(),
        "MySQL tenant connections ready"
    );
    Ok(conns)
}

async fn connect_tenant(
    config: &SqlConfig,
    tenant_config: &SqlTenantConfig,
    host_override_param: &str,
    secrets: &SecretResolver,
) -> anyhow::Result<AsyncDbPool> {
    let password = secrets.reveal(&tenant_config.password)?;
    let url = endpoint_url(
        "mysql",
        &tenant_config.username,
        &password,
        tenant_config.host_for(host_override_param),
        tenant_config.port,
        &tenant_config.database,
    )?;
    Ok(establish_async_connection_pool(&url, config).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MasterEndpoint;

    #[tokio::test]
    async fn test_unconfigured_master_is_absent() {
        let config = SqlConfig {
            master: MasterEndpoint::default(),
            ..SqlConfig::default()
        };
        let master = init_master_conn(&config).await.unwrap();
        assert!(master.client.is_none());
        master.closer.close().await;
    }

    #[tokio::test]
    async fn test_tenants_without_mysql_are_recorded_absent() {
        let tenants = vec![
            TenantConnection::new(1, "alpha", r#"{"redis":{"host":"r","port":6379}}"#),
            TenantConnection::new(2, "beta", ""),
        ];
        let conns = connect_tenants(&SqlConfig::default(), &tenants, "", &SecretResolver::plaintext())
            .await
            .unwrap();
        assert_eq!(conns.clients.len(), 2);
        assert_eq!(conns.connected(), 0);
        assert!(conns.closers.is_empty());
    }

    #[tokio::test]
    async fn test_undecryptable_password_aborts() {
        let key = {
            use base64::{Engine as _, engine::general_purpose::STANDARD};
            STANDARD.encode([3u8; 16])
        };
        let secrets = SecretResolver::new(&key, false).unwrap();
        let tenants = vec![TenantConnection::new(
            5,
            "epsilon",
            r#"{"mysql":{"username":"u","password":"not-a-ticket","host":"127.0.0.1","port":3306,"database":"d"}}"#,
        )];
        let err = connect_tenants(&SqlConfig::default(), &tenants, "", &secrets)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::TenantConnection { engine: Engine::Mysql, tenant_id: 5, .. }
        ));
    }
}
