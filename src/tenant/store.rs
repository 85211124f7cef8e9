//! Tenant repository backed by the master MySQL pool.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::AsyncDbPool;
use crate::error::AppError;
use crate::tenant::{TenantConnection, TenantConnectionRow};

pub const CREATE_TABLE_SQL: &str = r#"CREATE TABLE IF NOT EXISTS tenant_connections (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    uuid VARCHAR(36) NOT NULL,
    tenant_id BIGINT NOT NULL,
    code VARCHAR(64) NOT NULL,
    connections TEXT NOT NULL,
    created_by BIGINT NOT NULL DEFAULT 0,
    updated_by BIGINT NOT NULL DEFAULT 0,
    deleted_by BIGINT NULL,
    created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,
    deleted_at DATETIME NULL,
    UNIQUE KEY uk_tenant_connections_uuid (uuid),
    KEY idx_tenant_connections_tenant_id (tenant_id)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"#;

/// Reads tenant rows from the master database.
///
/// `AsyncDbPool` is an `Arc` internally, so the store is cheap to clone.
#[derive(Clone)]
pub struct TenantConfigStore {
    pool: AsyncDbPool,
}

impl TenantConfigStore {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    /// Creates the tenant table when it does not exist yet.
    pub async fn ensure_table(&self) -> Result<(), AppError> {
        let mut conn = self.pool.get().await?;
        diesel::sql_query(CREATE_TABLE_SQL)
            .execute(&mut conn)
            .await
            .map_err(|e| AppError::database("ensure tenant table", e))?;
        Ok(())
    }

    /// Lists every tenant that is not soft-deleted, ordered by tenant id.
    pub async fn list_tenants(&self) -> Result<Vec<TenantConnection>, AppError> {
        use crate::schema::tenant_connections::dsl::*;
        let mut conn = self.pool.get().await?;

        let rows = tenant_connections
            .filter(deleted_at.is_null())
            .order(tenant_id.asc())
            .select(TenantConnectionRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|e| AppError::database("list tenants", e))?;

        tracing::debug!(count = rows.len(), "Loaded tenant connection rows");
        Ok(rows.into_iter().map(TenantConnection::from).collect())
    }
}
