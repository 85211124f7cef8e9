use diesel::prelude::*;
use jiff::civil::DateTime;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::Validate;

use super::config::Engine;
use super::error::TenantConfigError;

/// Raw tenant row as stored in the master database.
#[derive(Debug, Queryable, Selectable, Clone)]
#[diesel(table_name = crate::schema::tenant_connections)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub struct TenantConnectionRow {
    pub id: i64,
    pub uuid: String,
    pub tenant_id: i64,
    pub code: String,
    pub connections: String,
    pub created_by: i64,
    pub updated_by: i64,
    pub deleted_by: Option<i64>,
    pub created_at: jiff_diesel::DateTime,
    pub updated_at: jiff_diesel::DateTime,
    pub deleted_at: Option<jiff_diesel::DateTime>,
}

/// A tenant and its per-engine connection descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct TenantConnection {
    pub id: i64,
    pub uuid: String,
    pub tenant_id: i64,
    pub code: String,
    pub connections: String,
    pub created_by: i64,
    pub updated_by: i64,
    pub deleted_by: Option<i64>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
    pub deleted_at: Option<DateTime>,
}

impl From<TenantConnectionRow> for TenantConnection {
    fn from(row: TenantConnectionRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            tenant_id: row.tenant_id,
            code: row.code,
            connections: row.connections,
            created_by: row.created_by,
            updated_by: row.updated_by,
            deleted_by: row.deleted_by,
            created_at: Some(row.created_at.to_jiff()),
            updated_at: Some(row.updated_at.to_jiff()),
            deleted_at: row.deleted_at.map(|at| at.to_jiff()),
        }
    }
}

impl TenantConnection {
    /// Builds a tenant record that only carries identity and the connections blob.
    pub fn new(tenant_id: i64, code: impl Into<String>, connections: impl Into<String>) -> Self {
        Self {
            id: tenant_id,
            uuid: String::new(),
            tenant_id,
            code: code.into(),
            connections: connections.into(),
            created_by: 0,
            updated_by: 0,
            deleted_by: None,
            created_at: None,
            updated_at: None,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Decodes the sub-object for `engine` into a validated config.
    ///
    /// A missing engine key (or an empty `connections` column) is `Ok(None)`.
    pub fn engine<T>(&self, engine: Engine) -> Result<Option<T>, TenantConfigError>
    where
        T: DeserializeOwned + Validate,
    {
        let mut map = self.connection_map()?;
        let Some(raw) = map.remove(engine.key()) else {
            return Ok(None);
        };
        if raw.is_null() {
            return Ok(None);
        }

        let config: T = serde_json::from_value(raw).map_err(|source| TenantConfigError::Decode {
            tenant_id: self.tenant_id,
            code: self.code.clone(),
            engine,
            source,
        })?;
        config.validate().map_err(|source| TenantConfigError::Invalid {
            tenant_id: self.tenant_id,
            code: self.code.clone(),
            engine,
            source,
        })?;
        Ok(Some(config))
    }

    /// Engines declared in the connections blob, in a stable order.
    pub fn engines(&self) -> Result<Vec<Engine>, TenantConfigError> {
        let map = self.connection_map()?;
        Ok(Engine::ALL
            .into_iter()
            .filter(|engine| map.get(engine.key()).is_some_and(|v| !v.is_null()))
            .collect())
    }

    fn connection_map(&self) -> Result<Map<String, Value>, TenantConfigError> {
        if self.connections.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&self.connections).map_err(|source| TenantConfigError::Malformed {
            tenant_id: self.tenant_id,
            code: self.code.clone(),
            source,
        })
    }
}
