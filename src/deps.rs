//! Boot-time aggregate of every master and tenant connection.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{self, MasterCache, RedisDbConn, TenantCache};
use crate::config::Settings;
use crate::db::{self, AsyncDbPool, Closer, MasterConn, TenantConns};
use crate::error::AppResult;
use crate::tenant::{Engine, SecretResolver};

/// Connection counts of one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSummary {
    pub engine: Engine,
    pub master: bool,
    /// Tenants listed for the engine, connected or not.
    pub tenants: usize,
    pub connected: usize,
}

impl fmt::Display for EngineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<8} master: {:<3} tenants: {} connected: {}",
            self.engine,
            if self.master { "yes" } else { "no" },
            self.tenants,
            self.connected
        )
    }
}

/// Every connection the process holds, built once by [`DbDeps::init`].
///
/// Tenant rows live in the MySQL master, so without one no tenant
/// connections are created for any engine.
#[derive(Debug)]
pub struct DbDeps {
    pub mysql_master: MasterConn<AsyncDbPool>,
    pub mysql_tenants: TenantConns<AsyncDbPool>,
    pub mongo_master: MasterConn<mongodb::Client>,
    pub mongo_tenants: TenantConns<mongodb::Client>,
    pub redis_master: MasterConn<Arc<RedisDbConn>>,
    pub redis_tenants: TenantConns<Arc<RedisDbConn>>,
    master_cache: MasterCache,
    tenant_cache: TenantCache,
}

impl DbDeps {
    /// Connects every master, then every tenant listed in the tenant table.
    ///
    /// Any tenant that declares an engine but cannot be decoded, decrypted or
    /// connected fails the whole call.
    pub async fn init(settings: &Settings) -> AppResult<Self> {
        let tenancy = &settings.tenancy;
        let secrets = SecretResolver::new(&tenancy.passphrase_key, tenancy.verify_mac)?;
        let host_param = tenancy.host_override_param.as_str();

        let mysql_master = db::mysql::init_master_conn(&settings.database).await?;
        let mongo_master = db::mongo::init_master_conn(&settings.mongo).await?;
        let redis_master = cache::factory::init_master_conn(&settings.redis).await?;

        let (mysql_tenants, mongo_tenants, redis_tenants) = match &mysql_master.client {
            Some(pool) => (
                db::mysql::init_tenant_conns(&settings.database, pool, host_param, &secrets).await?,
                db::mongo::init_tenant_conns(&settings.mongo, pool, host_param, &secrets).await?,
                cache::factory::init_tenant_conns(&settings.redis, pool, host_param, &secrets).await?,
            ),
            None => {
                warn!("MySQL master is not configured, tenant connections are skipped");
                Default::default()
            }
        };

        let deps = Self::from_parts(
            settings,
            mysql_master,
            mysql_tenants,
            mongo_master,
            mongo_tenants,
            redis_master,
            redis_tenants,
        );
        for summary in deps.summary() {
            info!(
                engine = %summary.engine,
                master = summary.master,
                tenants = summary.tenants,
                connected = summary.connected,
                "Connections ready"
            );
        }
        Ok(deps)
    }

    /// Assembles already established connections and builds the cache facades.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        settings: &Settings,
        mysql_master: MasterConn<AsyncDbPool>,
        mysql_tenants: TenantConns<AsyncDbPool>,
        mongo_master: MasterConn<mongodb::Client>,
        mongo_tenants: TenantConns<mongodb::Client>,
        redis_master: MasterConn<Arc<RedisDbConn>>,
        redis_tenants: TenantConns<Arc<RedisDbConn>>,
    ) -> Self {
        let master_cache = MasterCache::from_config(redis_master.client.clone(), &settings.redis, &settings.tenancy);
        let tenant_cache = TenantCache::from_config(redis_tenants.clients.clone(), &settings.redis, &settings.tenancy);
        Self {
            mysql_master,
            mysql_tenants,
            mongo_master,
            mongo_tenants,
            redis_master,
            redis_tenants,
            master_cache,
            tenant_cache,
        }
    }

    pub fn master_cache(&self) -> &MasterCache {
        &self.master_cache
    }

    pub fn tenant_cache(&self) -> &TenantCache {
        &self.tenant_cache
    }

    pub fn mysql_tenant(&self, tenant_id: i64) -> Option<&AsyncDbPool> {
        self.mysql_tenants.get(tenant_id)
    }

    /// Database handle of a tenant's MongoDB connection.
    pub fn mongo_database(&self, tenant_id: i64) -> Option<mongodb::Database> {
        let client = self.mongo_tenants.get(tenant_id)?;
        let name = self.mongo_tenants.databases.get(&tenant_id)?;
        Some(client.database(name))
    }

    pub fn summary(&self) -> Vec<EngineSummary> {
        vec![
            summarize(Engine::Mysql, &self.mysql_master, &self.mysql_tenants),
            summarize(Engine::Mongodb, &self.mongo_master, &self.mongo_tenants),
            summarize(Engine::Redis, &self.redis_master, &self.redis_tenants),
        ]
    }

    /// Runs every closer, tenants first.
    pub async fn shutdown(self) {
        let mut closers: Vec<Closer> = Vec::new();
        closers.extend(self.mysql_tenants.closers);
        closers.extend(self.mongo_tenants.closers);
        closers.extend(self.redis_tenants.closers);
        closers.extend([
            self.mysql_master.closer,
            self.mongo_master.closer,
            self.redis_master.closer,
        ]);

        let count = closers.len();
        for closer in closers {
            closer.close().await;
        }
        info!(closers = count, "Connections shut down");
    }
}

fn summarize<C>(engine: Engine, master: &MasterConn<C>, tenants: &TenantConns<C>) -> EngineSummary {
    EngineSummary {
        engine,
        master: master.is_connected(),
        tenants: tenants.clients.len(),
        connected: tenants.connected(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cache::testing::{MemoryNode, MemoryStore};

    fn memory_conn(store: &MemoryStore) -> Arc<RedisDbConn> {
        Arc::new(RedisDbConn::new(Arc::new(MemoryNode::with_store("mem", store.clone())), 0))
    }

    #[tokio::test]
    async fn test_init_without_masters_is_empty() {
        let deps = DbDeps::init(&Settings::default()).await.unwrap();
        let summary = deps.summary();
        assert_eq!(summary.len(), 3);
        assert!(summary.iter().all(|s| !s.master && s.tenants == 0));
        assert!(!deps.master_cache().is_connected());
        deps.shutdown().await;
    }

    #[tokio::test]
    async fn test_init_rejects_bad_passphrase() {
        let mut settings = Settings::default();
        settings.tenancy.passphrase_key = "short".to_string();
        assert!(matches!(
            DbDeps::init(&settings).await,
            Err(crate::error::AppError::Decryption(_))
        ));
    }

    #[tokio::test]
    async fn test_from_parts_wires_caches() {
        let mut settings = Settings::default();
        settings.redis.prefix = "app".to_string();

        let master_store = MemoryStore::default();
        let tenant_store = MemoryStore::default();
        let redis_master = MasterConn {
            client: Some(memory_conn(&master_store)),
            database: "0".to_string(),
            closer: Closer::noop("redis master"),
        };
        let mut redis_tenants = TenantConns::default();
        redis_tenants.insert(3, memory_conn(&tenant_store), "0", Closer::noop("redis tenant 3"));
        redis_tenants.insert_absent(4);

        let deps = DbDeps::from_parts(
            &settings,
            MasterConn::absent("mysql master"),
            TenantConns::default(),
            MasterConn::absent("mongodb master"),
            TenantConns::default(),
            redis_master,
            redis_tenants,
        );

        deps.master_cache().set_string("k", "m", Duration::ZERO).await.unwrap();
        deps.tenant_cache().set_string(3, "k", "t", Duration::ZERO).await.unwrap();
        assert!(master_store.contains("app_k"));
        assert!(tenant_store.contains("app_k"));
        assert_eq!(deps.tenant_cache().get_string(3, "k").await.unwrap(), "t");
        assert!(deps.tenant_cache().get_string(4, "k").await.is_err());

        let redis = deps.summary()[2];
        assert_eq!(redis, EngineSummary { engine: Engine::Redis, master: true, tenants: 2, connected: 1 });
        assert!(deps.mysql_tenant(3).is_none());
        assert!(deps.mongo_database(3).is_none());
        deps.shutdown().await;
    }
}
