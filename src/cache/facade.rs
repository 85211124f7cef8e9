//! Tenant-scoped cache API.
//!
//! Keys are stored as `<prefix><separator><key>`; an empty prefix leaves them
//! unchanged. Every call runs inside a span named `<span_label>.<method>`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Instrument, Span, info_span};

use crate::cache::{CacheError, FieldValuePair, KeyFieldPair, MSetArgs, RedisDbConn};
use crate::config::{RedisConfig, TenancyConfig};

/// Tenant id the master cache is bound to.
pub const MASTER_TENANT_ID: i64 = 0;

pub type TenantRedisMap = HashMap<i64, Option<Arc<RedisDbConn>>>;

/// Cache facade over every tenant's Redis handle.
#[derive(Clone)]
pub struct TenantCache {
    conns: Arc<TenantRedisMap>,
    prefix: String,
    separator: String,
    span_label: String,
}

impl TenantCache {
    pub fn new(
        conns: TenantRedisMap,
        prefix: impl Into<String>,
        separator: impl Into<String>,
        span_label: impl Into<String>,
    ) -> Self {
        Self {
            conns: Arc::new(conns),
            prefix: prefix.into(),
            separator: separator.into(),
            span_label: span_label.into(),
        }
    }

    /// Takes the prefix from the Redis config and the rest from tenancy settings.
    pub fn from_config(conns: TenantRedisMap, redis: &RedisConfig, tenancy: &TenancyConfig) -> Self {
        Self::new(conns, &redis.prefix, &tenancy.cache_separator, &tenancy.span_label)
    }

    /// Storage key of `key`.
    pub fn key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}{}{}", self.prefix, self.separator, key)
        }
    }

    /// Whether `tenant_id` has a live Redis connection.
    pub fn has_tenant(&self, tenant_id: i64) -> bool {
        matches!(self.conns.get(&tenant_id), Some(Some(_)))
    }

    pub fn tenant_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.conns.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn conn(&self, tenant_id: i64) -> Result<&RedisDbConn, CacheError> {
        match self.conns.get(&tenant_id) {
            Some(Some(conn)) => Ok(conn),
            _ => Err(CacheError::TenantUnavailable(tenant_id)),
        }
    }

    fn span(&self, method: &str, tenant_id: i64) -> Span {
        info_span!(
            "cache",
            otel.name = %format!("{}.{}", self.span_label, method),
            tenant_id
        )
    }

    async fn traced<T, F>(&self, method: &str, tenant_id: i64, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        fut.instrument(self.span(method, tenant_id)).await
    }

    fn prefixed_keys<K: AsRef<str>>(&self, keys: &[K]) -> Vec<String> {
        keys.iter().map(|k| self.key(k.as_ref())).collect()
    }

    fn prefixed_pairs(&self, args: impl Into<MSetArgs>) -> Result<Vec<(String, String)>, CacheError> {
        Ok(args
            .into()
            .into_pairs()?
            .into_iter()
            .map(|(k, v)| (self.key(&k), v))
            .collect())
    }

    // ========================================================================
    // Strings and JSON
    // ========================================================================

    /// Value of `key`; empty when absent.
    pub async fn get_string(&self, tenant_id: i64, key: &str) -> Result<String, CacheError> {
        self.traced("get_string", tenant_id, async {
            self.conn(tenant_id)?.get_string(&self.key(key)).await
        })
        .await
    }

    /// Stores `value`; a zero `ttl` stores without expiry.
    pub async fn set_string(&self, tenant_id: i64, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.traced("set_string", tenant_id, async {
            self.conn(tenant_id)?.set(&self.key(key), value, ttl).await
        })
        .await
    }

    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        tenant_id: i64,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.traced("set_json", tenant_id, async {
            let json = serde_json::to_string(value)?;
            self.conn(tenant_id)?.set(&self.key(key), &json, ttl).await
        })
        .await
    }

    /// Decoded value of `key`, `None` when absent.
    pub async fn get_json<T: DeserializeOwned>(&self, tenant_id: i64, key: &str) -> Result<Option<T>, CacheError> {
        self.traced("get_json", tenant_id, async {
            match self.conn(tenant_id)?.get(&self.key(key)).await? {
                Some(json) => Ok(Some(serde_json::from_str(&json)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn mget<K: AsRef<str>>(&self, tenant_id: i64, keys: &[K]) -> Result<Vec<Option<String>>, CacheError> {
        self.traced("mget", tenant_id, async {
            self.conn(tenant_id)?.mget(&self.prefixed_keys(keys)).await
        })
        .await
    }

    pub async fn mset(&self, tenant_id: i64, args: impl Into<MSetArgs>) -> Result<(), CacheError> {
        self.traced("mset", tenant_id, async {
            let conn = self.conn(tenant_id)?;
            conn.mset(self.prefixed_pairs(args)?).await
        })
        .await
    }

    pub async fn mset_with_ttl(
        &self,
        tenant_id: i64,
        args: impl Into<MSetArgs>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.traced("mset_with_ttl", tenant_id, async {
            let conn = self.conn(tenant_id)?;
            conn.mset_with_ttl(self.prefixed_pairs(args)?, ttl).await
        })
        .await
    }

    /// Decodes every present value; missing keys are `None`.
    pub async fn mget_json<T: DeserializeOwned, K: AsRef<str>>(
        &self,
        tenant_id: i64,
        keys: &[K],
    ) -> Result<Vec<Option<T>>, CacheError> {
        self.traced("mget_json", tenant_id, async {
            let values = self.conn(tenant_id)?.mget(&self.prefixed_keys(keys)).await?;
            values
                .into_iter()
                .map(|v| v.map(|json| serde_json::from_str(&json)).transpose())
                .collect::<Result<Vec<_>, _>>()
                .map_err(CacheError::from)
        })
        .await
    }

    pub async fn mset_json<T: Serialize, K: AsRef<str>>(
        &self,
        tenant_id: i64,
        entries: &[(K, T)],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.traced("mset_json", tenant_id, async {
            let conn = self.conn(tenant_id)?;
            let mut pairs = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                pairs.push((self.key(key.as_ref()), serde_json::to_string(value)?));
            }
            conn.mset_with_ttl(pairs, ttl).await
        })
        .await
    }

    pub async fn increment_value(&self, tenant_id: i64, key: &str, delta: i64) -> Result<i64, CacheError> {
        self.traced("increment_value", tenant_id, async {
            self.conn(tenant_id)?.increment_value(&self.key(key), delta).await
        })
        .await
    }

    // ========================================================================
    // Hashes
    // ========================================================================

    pub async fn hget(&self, tenant_id: i64, key: &str, field: &str) -> Result<Option<String>, CacheError> {
        self.traced("hget", tenant_id, async {
            self.conn(tenant_id)?.hget(&self.key(key), field).await
        })
        .await
    }

    pub async fn hgets(&self, tenant_id: i64, pairs: &[KeyFieldPair]) -> Result<Vec<Option<String>>, CacheError> {
        self.traced("hgets", tenant_id, async {
            let prefixed: Vec<KeyFieldPair> = pairs
                .iter()
                .map(|p| KeyFieldPair::new(self.key(&p.key), p.field.clone()))
                .collect();
            self.conn(tenant_id)?.hgets(&prefixed).await
        })
        .await
    }

    pub async fn hset(&self, tenant_id: i64, key: &str, fields: &[FieldValuePair]) -> Result<i64, CacheError> {
        self.traced("hset", tenant_id, async {
            self.conn(tenant_id)?.hset(&self.key(key), fields).await
        })
        .await
    }

    // ========================================================================
    // Lists and sets
    // ========================================================================

    pub async fn get_lrange(&self, tenant_id: i64, key: &str, start: i64, stop: i64) -> Result<Vec<String>, CacheError> {
        self.traced("get_lrange", tenant_id, async {
            self.conn(tenant_id)?.get_lrange(&self.key(key), start, stop).await
        })
        .await
    }

    pub async fn rpush<V: AsRef<str>>(&self, tenant_id: i64, key: &str, values: &[V]) -> Result<i64, CacheError> {
        self.traced("rpush", tenant_id, async {
            self.conn(tenant_id)?.rpush(&self.key(key), values).await
        })
        .await
    }

    pub async fn sadd<M: AsRef<str>>(&self, tenant_id: i64, key: &str, members: &[M]) -> Result<i64, CacheError> {
        self.traced("sadd", tenant_id, async {
            self.conn(tenant_id)?.sadd(&self.key(key), members).await
        })
        .await
    }

    pub async fn srem<M: AsRef<str>>(&self, tenant_id: i64, key: &str, members: &[M]) -> Result<i64, CacheError> {
        self.traced("srem", tenant_id, async {
            self.conn(tenant_id)?.srem(&self.key(key), members).await
        })
        .await
    }

    pub async fn smembers(&self, tenant_id: i64, key: &str) -> Result<Vec<String>, CacheError> {
        self.traced("smembers", tenant_id, async {
            self.conn(tenant_id)?.smembers(&self.key(key)).await
        })
        .await
    }

    pub async fn sismember(&self, tenant_id: i64, key: &str, member: &str) -> Result<bool, CacheError> {
        self.traced("sismember", tenant_id, async {
            self.conn(tenant_id)?.sismember(&self.key(key), member).await
        })
        .await
    }

    pub async fn srand_member_n(&self, tenant_id: i64, key: &str, count: i64) -> Result<Vec<String>, CacheError> {
        self.traced("srand_member_n", tenant_id, async {
            self.conn(tenant_id)?.srand_member_n(&self.key(key), count).await
        })
        .await
    }

    // ========================================================================
    // Keys
    // ========================================================================

    pub async fn del_key<K: AsRef<str>>(&self, tenant_id: i64, keys: &[K]) -> Result<i64, CacheError> {
        self.traced("del_key", tenant_id, async {
            self.conn(tenant_id)?.del_key(&self.prefixed_keys(keys)).await
        })
        .await
    }

    pub async fn expire_key(&self, tenant_id: i64, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        self.traced("expire_key", tenant_id, async {
            self.conn(tenant_id)?.expire_key(&self.key(key), ttl).await
        })
        .await
    }
}

impl fmt::Debug for TenantCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantCache")
            .field("tenants", &self.tenant_ids())
            .field("prefix", &self.prefix)
            .field("separator", &self.separator)
            .field("span_label", &self.span_label)
            .finish()
    }
}

/// Cache facade bound to the master Redis connection.
#[derive(Debug, Clone)]
pub struct MasterCache {
    inner: TenantCache,
}

impl MasterCache {
    pub fn new(
        conn: Option<Arc<RedisDbConn>>,
        prefix: impl Into<String>,
        separator: impl Into<String>,
        span_label: impl Into<String>,
    ) -> Self {
        let conns = HashMap::from([(MASTER_TENANT_ID, conn)]);
        Self {
            inner: TenantCache::new(conns, prefix, separator, span_label),
        }
    }

    pub fn from_config(conn: Option<Arc<RedisDbConn>>, redis: &RedisConfig, tenancy: &TenancyConfig) -> Self {
        Self::new(conn, &redis.prefix, &tenancy.cache_separator, &tenancy.span_label)
    }

    pub fn is_connected(&self) -> bool {
        self.inner.has_tenant(MASTER_TENANT_ID)
    }

    pub fn key(&self, key: &str) -> String {
        self.inner.key(key)
    }

    pub async fn get_string(&self, key: &str) -> Result<String, CacheError> {
        self.inner.get_string(MASTER_TENANT_ID, key).await
    }

    pub async fn set_string(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set_string(MASTER_TENANT_ID, key, value, ttl).await
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set_json(MASTER_TENANT_ID, key, value, ttl).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.inner.get_json(MASTER_TENANT_ID, key).await
    }

    pub async fn mget<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<Option<String>>, CacheError> {
        self.inner.mget(MASTER_TENANT_ID, keys).await
    }

    pub async fn mset(&self, args: impl Into<MSetArgs>) -> Result<(), CacheError> {
        self.inner.mset(MASTER_TENANT_ID, args).await
    }

    pub async fn mset_with_ttl(&self, args: impl Into<MSetArgs>, ttl: Duration) -> Result<(), CacheError> {
        self.inner.mset_with_ttl(MASTER_TENANT_ID, args, ttl).await
    }

    pub async fn mget_json<T: DeserializeOwned, K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<Option<T>>, CacheError> {
        self.inner.mget_json(MASTER_TENANT_ID, keys).await
    }

    pub async fn mset_json<T: Serialize, K: AsRef<str>>(&self, entries: &[(K, T)], ttl: Duration) -> Result<(), CacheError> {
        self.inner.mset_json(MASTER_TENANT_ID, entries, ttl).await
    }

    pub async fn increment_value(&self, key: &str, delta: i64) -> Result<i64, CacheError> {
        self.inner.increment_value(MASTER_TENANT_ID, key, delta).await
    }

    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheError> {
        self.inner.hget(MASTER_TENANT_ID, key, field).await
    }

    pub async fn hgets(&self, pairs: &[KeyFieldPair]) -> Result<Vec<Option<String>>, CacheError> {
        self.inner.hgets(MASTER_TENANT_ID, pairs).await
    }

    pub async fn hset(&self, key: &str, fields: &[FieldValuePair]) -> Result<i64, CacheError> {
        self.inner.hset(MASTER_TENANT_ID, key, fields).await
    }

    pub async fn get_lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, CacheError> {
        self.inner.get_lrange(MASTER_TENANT_ID, key, start, stop).await
    }

    pub async fn rpush<V: AsRef<str>>(&self, key: &str, values: &[V]) -> Result<i64, CacheError> {
        self.inner.rpush(MASTER_TENANT_ID, key, values).await
    }

    pub async fn sadd<M: AsRef<str>>(&self, key: &str, members: &[M]) -> Result<i64, CacheError> {
        self.inner.sadd(MASTER_TENANT_ID, key, members).await
    }

    pub async fn srem<M: AsRef<str>>(&self, key: &str, members: &[M]) -> Result<i64, CacheError> {
        self.inner.srem(MASTER_TENANT_ID, key, members).await
    }

    pub async fn smembers(&self, key: &str) -> Result<Vec<String>, CacheError> {
        self.inner.smembers(MASTER_TENANT_ID, key).await
    }

    pub async fn sismember(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        self.inner.sismember(MASTER_TENANT_ID, key, member).await
    }

    pub async fn srand_member_n(&self, key: &str, count: i64) -> Result<Vec<String>, CacheError> {
        self.inner.srand_member_n(MASTER_TENANT_ID, key, count).await
    }

    pub async fn del_key<K: AsRef<str>>(&self, keys: &[K]) -> Result<i64, CacheError> {
        self.inner.del_key(MASTER_TENANT_ID, keys).await
    }

    pub async fn expire_key(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        self.inner.expire_key(MASTER_TENANT_ID, key, ttl).await
    }
}
