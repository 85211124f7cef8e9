//! Redis connection factory.
//!
//! Planning (`RedisTopology`) is separated from connecting so the address
//! rules can be checked without a server.

use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{CacheError, ClusterNode, PooledNode, RedisDbConn, RedisNode};
use crate::config::{MasterEndpoint, RedisConfig};
use crate::db::{AsyncDbPool, Closer, MasterConn, TenantConns, endpoint_url, with_port};
use crate::error::AppError;
use crate::tenant::{Engine, RedisTenantConfig, SecretResolver, TenantConfigStore, TenantConnection};

const LABEL: &str = "redis master";
const DEFAULT_PORT: u16 = 6379;

/// Addresses and credentials of one Redis deployment, resolved before any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisTopology {
    /// `host:port` of the primary, or of every cluster seed node.
    pub nodes: Vec<String>,
    /// `host:port` of each read replica; always empty for a cluster.
    pub replicas: Vec<String>,
    pub username: String,
    pub password: String,
    /// Selected database index; always 0 for a cluster.
    pub database: i64,
    pub is_cluster: bool,
}

impl RedisTopology {
    fn plan(host: &str, port: u16, replicas: &[String], username: &str, password: &str, database: i64) -> Self {
        let port = if port == 0 { DEFAULT_PORT } else { port };
        let is_cluster = host.contains(',');
        let nodes = host
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(|h| with_port(h, port))
            .collect();
        let replicas = if is_cluster {
            Vec::new()
        } else {
            replicas
                .iter()
                .map(|r| r.trim())
                .filter(|r| !r.is_empty())
                .map(|r| with_port(r, port))
                .collect()
        };
        Self {
            nodes,
            replicas,
            username: username.to_string(),
            password: password.to_string(),
            database: if is_cluster { 0 } else { database },
            is_cluster,
        }
    }

    /// Plans the static master endpoint. `database` must be empty or an index.
    pub fn from_master(master: &MasterEndpoint) -> Result<Self, CacheError> {
        let database = match master.database.trim() {
            "" => 0,
            index => index.parse::<i64>().ok().filter(|i| *i >= 0).ok_or_else(|| {
                CacheError::InvalidParameter(format!("redis master database must be an index, got {index:?}"))
            })?,
        };
        Ok(Self::plan(
            &master.host,
            master.port,
            &master.reads,
            &master.username,
            &master.password,
            database,
        ))
    }

    /// Plans a tenant endpoint; `password` is the already decrypted secret.
    pub fn from_tenant(config: &RedisTenantConfig, host_override_param: &str, password: &str) -> Self {
        Self::plan(
            config.host_for(host_override_param),
            config.port,
            &config.read,
            "",
            password,
            config.database_index(),
        )
    }

    fn url(&self, node: &str) -> Result<String, url::ParseError> {
        let path = if self.is_cluster {
            String::new()
        } else {
            format!("/{}", self.database)
        };
        endpoint_url("redis", &self.username, &self.password, node, DEFAULT_PORT, &path)
    }

    pub fn node_urls(&self) -> Result<Vec<String>, url::ParseError> {
        self.nodes.iter().map(|n| self.url(n)).collect()
    }

    pub fn replica_urls(&self) -> Result<Vec<String>, url::ParseError> {
        self.replicas.iter().map(|r| self.url(r)).collect()
    }
}

/// Connects every node of `topology` and verifies each with `PING`.
pub async fn connect_topology(topology: &RedisTopology, config: &RedisConfig) -> anyhow::Result<RedisDbConn> {
    let urls = topology.node_urls()?;
    if topology.is_cluster {
        let node = ClusterNode::connect(&urls, config).await?;
        return Ok(RedisDbConn::new(Arc::new(node), 0)
            .with_cluster(true)
            .with_command_log(config.debug));
    }

    let primary_url = urls
        .first()
        .ok_or_else(|| anyhow::anyhow!("redis topology has no primary node"))?;
    let primary = PooledNode::connect(primary_url, config).await?;

    let mut reads: Vec<Arc<dyn RedisNode>> = Vec::with_capacity(topology.replicas.len());
    for url in topology.replica_urls()? {
        reads.push(Arc::new(PooledNode::connect(&url, config).await?));
    }

    Ok(RedisDbConn::new(Arc::new(primary), topology.database)
        .with_reads(reads)
        .with_command_log(config.debug))
}

/// Connects the master Redis endpoint.
///
/// Returns an absent connection when no master host is configured.
pub async fn init_master_conn(config: &RedisConfig) -> Result<MasterConn<Arc<RedisDbConn>>, AppError> {
    if !config.master.is_configured() {
        info!("Redis master is not configured, skipping");
        return Ok(MasterConn::absent(LABEL));
    }

    let topology = RedisTopology::from_master(&config.master).map_err(|e| AppError::master(Engine::Redis, e))?;
    let conn = connect_topology(&topology, config)
        .await
        .map_err(|e| AppError::master(Engine::Redis, e))?;

    info!(
        nodes = topology.nodes.len(),
        replicas = conn.read_count(),
        cluster = conn.is_cluster(),
        database = conn.name(),
        "Redis master connected"
    );
    Ok(MasterConn {
        client: Some(Arc::new(conn)),
        database: topology.database.to_string(),
        closer: Closer::noop(LABEL),
    })
}

/// Reads the tenant table from the MySQL master and connects each tenant's Redis.
pub async fn init_tenant_conns(
    config: &RedisConfig,
    master: &AsyncDbPool,
    host_override_param: &str,
    secrets: &SecretResolver,
) -> Result<TenantConns<Arc<RedisDbConn>>, AppError> {
    let tenants = TenantConfigStore::new(master.clone()).list_tenants().await?;
    connect_tenants(config, &tenants, host_override_param, secrets).await
}

/// Connects the Redis endpoint of each tenant in `tenants`.
pub async fn connect_tenants(
    config: &RedisConfig,
    tenants: &[TenantConnection],
    host_override_param: &str,
    secrets: &SecretResolver,
) -> Result<TenantConns<Arc<RedisDbConn>>, AppError> {
    let mut conns = TenantConns::default();

    for tenant in tenants {
        let Some(tenant_config) = tenant.engine::<RedisTenantConfig>(Engine::Redis)? else {
            debug!(tenant_id = tenant.tenant_id, "Tenant declares no Redis connection");
            conns.insert_absent(tenant.tenant_id);
            continue;
        };

        let conn = connect_tenant(config, &tenant_config, host_override_param, secrets)
            .await
            .map_err(|e| AppError::tenant(Engine::Redis, tenant, e))?;
        debug!(
            tenant_id = tenant.tenant_id,
            replicas = conn.read_count(),
            cluster = conn.is_cluster(),
            "Tenant Redis connected"
        );
        let database = conn.name().to_string();
        conns.insert(
            tenant.tenant_id,
            Arc::new(conn),
            database,
            Closer::noop(format!("redis tenant {}", tenant.tenant_id)),
        );
    }

    info!(
        tenants = tenants.len(),
        connected = conns.connected(),
        "Redis tenant connections ready"
    );
    Ok(conns)
}

async fn connect_tenant(
    config: &RedisConfig,
    tenant_config: &RedisTenantConfig,
    host_override_param: &str,
    secrets: &SecretResolver,
) -> anyhow::Result<RedisDbConn> {
    let password = secrets.reveal(&tenant_config.password)?;
    let topology = RedisTopology::from_tenant(tenant_config, host_override_param, &password);
    connect_topology(&topology, config).await
}
