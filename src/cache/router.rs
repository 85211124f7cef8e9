//! Per-tenant Redis handle with replica routing.
//!
//! Reads go to a replica when one is configured and fall back to the primary
//! once when the replica fails or has no value. Writes always hit the primary.
//! In cluster mode every command goes to the cluster node.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use redis::{RedisResult, Value};
use tracing::debug;

use crate::cache::reply;
use crate::cache::{CacheError, Command, FieldValuePair, KeyFieldPair, RandomSelector, RedisNode, ReplicaSelector};

/// Redis handle of one tenant (or of the master).
pub struct RedisDbConn {
    primary: Arc<dyn RedisNode>,
    reads: Vec<Arc<dyn RedisNode>>,
    name: i64,
    is_cluster: bool,
    selector: Arc<dyn ReplicaSelector>,
    log_commands: bool,
}

impl RedisDbConn {
    /// A standalone handle without replicas.
    pub fn new(primary: Arc<dyn RedisNode>, name: i64) -> Self {
        Self {
            primary,
            reads: Vec::new(),
            name,
            is_cluster: false,
            selector: Arc::new(RandomSelector),
            log_commands: false,
        }
    }

    pub fn with_reads(mut self, reads: Vec<Arc<dyn RedisNode>>) -> Self {
        self.reads = reads;
        self
    }

    pub fn with_cluster(mut self, is_cluster: bool) -> Self {
        self.is_cluster = is_cluster;
        self
    }

    pub fn with_selector(mut self, selector: Arc<dyn ReplicaSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Logs every command at `debug` level.
    pub fn with_command_log(mut self, enabled: bool) -> Self {
        self.log_commands = enabled;
        self
    }

    /// Selected database index.
    pub fn name(&self) -> i64 {
        self.name
    }

    pub fn read_count(&self) -> usize {
        self.reads.len()
    }

    pub fn is_cluster(&self) -> bool {
        self.is_cluster
    }

    pub fn primary(&self) -> &Arc<dyn RedisNode> {
        &self.primary
    }

    fn read_node(&self) -> Option<&Arc<dyn RedisNode>> {
        if self.is_cluster {
            return None;
        }
        match self.reads.len() {
            0 => None,
            1 => self.reads.first(),
            n => self.reads.get(self.selector.select(n) % n),
        }
    }

    fn trace(&self, kind: &str, cmds: &[Command]) {
        if self.log_commands {
            for cmd in cmds {
                debug!(db = self.name, kind, cmd = cmd.name(), key = %cmd.key(), "redis command");
            }
        }
    }

    /// Routes one read command.
    pub(crate) async fn read(&self, cmd: &Command) -> RedisResult<Value> {
        self.trace("read", std::slice::from_ref(cmd));
        if let Some(replica) = self.read_node() {
            match replica.query(cmd).await {
                Ok(value) if !reply::is_nil(&value) => return Ok(value),
                Ok(_) => {
                    debug!(replica = replica.addr(), cmd = cmd.name(), "Replica returned nil, retrying on primary");
                }
                Err(e) => {
                    debug!(replica = replica.addr(), cmd = cmd.name(), error = %e, "Replica read failed, retrying on primary");
                }
            }
        }
        self.primary.query(cmd).await
    }

    /// Routes one batch of read commands as a single pipeline.
    pub(crate) async fn read_pipeline(&self, cmds: &[Command]) -> RedisResult<Vec<Value>> {
        self.trace("read", cmds);
        if let Some(replica) = self.read_node() {
            match replica.query_pipeline(cmds).await {
                Ok(values) if !values.iter().any(reply::is_nil) => return Ok(values),
                Ok(_) => {
                    debug!(replica = replica.addr(), "Replica pipeline had nil replies, retrying on primary");
                }
                Err(e) => {
                    debug!(replica = replica.addr(), error = %e, "Replica pipeline failed, retrying on primary");
                }
            }
        }
        self.primary.query_pipeline(cmds).await
    }

    pub(crate) async fn write(&self, cmd: &Command) -> RedisResult<Value> {
        self.trace("write", std::slice::from_ref(cmd));
        self.primary.query(cmd).await
    }

    pub(crate) async fn write_pipeline(&self, cmds: &[Command]) -> RedisResult<Vec<Value>> {
        self.trace("write", cmds);
        self.primary.query_pipeline(cmds).await
    }

    // ========================================================================
    // Strings
    // ========================================================================

    /// Value of `key`, `None` when absent.
    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let value = self
            .read(&Command::new("GET").arg(key))
            .await
            .map_err(|e| CacheError::redis("get", key, e))?;
        reply::optional_string("get", value)
    }

    /// Value of `key`, empty when absent.
    pub async fn get_string(&self, key: &str) -> Result<String, CacheError> {
        Ok(self.get(key).await?.unwrap_or_default())
    }

    /// Stores `value`; a zero `ttl` stores without expiry.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let value = self
            .write(&set_command(key, value, ttl))
            .await
            .map_err(|e| CacheError::redis("set", key, e))?;
        reply::ok("set", value)
    }

    pub async fn increment_value(&self, key: &str, delta: i64) -> Result<i64, CacheError> {
        let value = self
            .write(&Command::new("INCRBY").arg(key).int_arg(delta))
            .await
            .map_err(|e| CacheError::redis("increment_value", key, e))?;
        reply::integer("increment_value", value)
    }

    // ========================================================================
    // Hashes
    // ========================================================================

    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheError> {
        let value = self
            .read(&Command::new("HGET").arg(key).arg(field))
            .await
            .map_err(|e| CacheError::redis("hget", key, e))?;
        reply::optional_string("hget", value)
    }

    /// One `HGET` per pair in a single pipeline; absent fields are `None`.
    pub async fn hgets(&self, pairs: &[KeyFieldPair]) -> Result<Vec<Option<String>>, CacheError> {
        if pairs.is_empty() {
            return Ok(Vec::new());
        }
        let cmds: Vec<Command> = pairs
            .iter()
            .map(|p| Command::new("HGET").arg(&p.key).arg(&p.field))
            .collect();
        let values = self
            .read_pipeline(&cmds)
            .await
            .map_err(|e| CacheError::redis("hgets", &pairs[0].key, e))?;
        values
            .into_iter()
            .map(|v| reply::optional_string("hgets", v))
            .collect()
    }

    /// Returns the number of fields that were newly created.
    pub async fn hset(&self, key: &str, fields: &[FieldValuePair]) -> Result<i64, CacheError> {
        if fields.is_empty() {
            return Err(CacheError::InvalidParameter("hset needs at least one field".to_string()));
        }
        let cmd = fields
            .iter()
            .fold(Command::new("HSET").arg(key), |cmd, f| cmd.arg(&f.field).arg(&f.value));
        let value = self
            .write(&cmd)
            .await
            .map_err(|e| CacheError::redis("hset", key, e))?;
        reply::integer("hset", value)
    }

    // ========================================================================
    // Lists
    // ========================================================================

    pub async fn get_lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, CacheError> {
        let value = self
            .read(&Command::new("LRANGE").arg(key).int_arg(start).int_arg(stop))
            .await
            .map_err(|e| CacheError::redis("get_lrange", key, e))?;
        reply::strings("get_lrange", value)
    }

    /// Returns the list length after the push.
    pub async fn rpush<V: AsRef<str>>(&self, key: &str, values: &[V]) -> Result<i64, CacheError> {
        if values.is_empty() {
            return Err(CacheError::InvalidParameter("rpush needs at least one value".to_string()));
        }
        let cmd = Command::new("RPUSH")
            .arg(key)
            .args_from(values.iter().map(|v| v.as_ref()));
        let value = self
            .write(&cmd)
            .await
            .map_err(|e| CacheError::redis("rpush", key, e))?;
        reply::integer("rpush", value)
    }

    // ========================================================================
    // Sets
    // ========================================================================

    pub async fn sadd<M: AsRef<str>>(&self, key: &str, members: &[M]) -> Result<i64, CacheError> {
        self.set_write("SADD", "sadd", key, members).await
    }

    pub async fn srem<M: AsRef<str>>(&self, key: &str, members: &[M]) -> Result<i64, CacheError> {
        self.set_write("SREM", "srem", key, members).await
    }

    async fn set_write<M: AsRef<str>>(
        &self,
        name: &'static str,
        op: &'static str,
        key: &str,
        members: &[M],
    ) -> Result<i64, CacheError> {
        if members.is_empty() {
            return Err(CacheError::InvalidParameter(format!("{op} needs at least one member")));
        }
        let cmd = Command::new(name)
            .arg(key)
            .args_from(members.iter().map(|m| m.as_ref()));
        let value = self
            .write(&cmd)
            .await
            .map_err(|e| CacheError::redis(op, key, e))?;
        reply::integer(op, value)
    }

    pub async fn smembers(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let value = self
            .read(&Command::new("SMEMBERS").arg(key))
            .await
            .map_err(|e| CacheError::redis("smembers", key, e))?;
        reply::strings("smembers", value)
    }

    pub async fn sismember(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        let value = self
            .read(&Command::new("SISMEMBER").arg(key).arg(member))
            .await
            .map_err(|e| CacheError::redis("sismember", key, e))?;
        reply::boolean("sismember", value)
    }

    /// Up to `count` random members; a negative count allows repeats.
    pub async fn srand_member_n(&self, key: &str, count: i64) -> Result<Vec<String>, CacheError> {
        let value = self
            .read(&Command::new("SRANDMEMBER").arg(key).int_arg(count))
            .await
            .map_err(|e| CacheError::redis("srand_member_n", key, e))?;
        reply::strings("srand_member_n", value)
    }

    // ========================================================================
    // Keys
    // ========================================================================

    /// Returns the number of keys removed.
    pub async fn del_key<K: AsRef<str>>(&self, keys: &[K]) -> Result<i64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        if self.is_cluster && keys.len() > 1 {
            let cmds: Vec<Command> = keys.iter().map(|k| Command::new("DEL").arg(k.as_ref())).collect();
            let values = self
                .write_pipeline(&cmds)
                .await
                .map_err(|e| CacheError::redis("del_key", keys[0].as_ref(), e))?;
            let mut removed = 0;
            for value in values {
                removed += reply::integer("del_key", value)?;
            }
            return Ok(removed);
        }
        let cmd = Command::new("DEL").args_from(keys.iter().map(|k| k.as_ref()));
        let value = self
            .write(&cmd)
            .await
            .map_err(|e| CacheError::redis("del_key", keys[0].as_ref(), e))?;
        reply::integer("del_key", value)
    }

    /// Sets a timeout on `key`; returns false when the key does not exist.
    pub async fn expire_key(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
        let cmd = if has_sub_second(ttl) {
            Command::new("PEXPIRE").arg(key).int_arg(millis(ttl))
        } else {
            Command::new("EXPIRE").arg(key).int_arg(secs(ttl))
        };
        let value = self
            .write(&cmd)
            .await
            .map_err(|e| CacheError::redis("expire_key", key, e))?;
        reply::boolean("expire_key", value)
    }
}

impl fmt::Debug for RedisDbConn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisDbConn")
            .field("primary", &self.primary.addr())
            .field("reads", &self.reads.iter().map(|r| r.addr()).collect::<Vec<_>>())
            .field("name", &self.name)
            .field("is_cluster", &self.is_cluster)
            .finish()
    }
}

/// `SET key value [EX s | PX ms]`
pub(crate) fn set_command(key: &str, value: &str, ttl: Duration) -> Command {
    let cmd = Command::new("SET").arg(key).arg(value);
    if ttl.is_zero() {
        cmd
    } else if has_sub_second(ttl) {
        cmd.arg("PX").int_arg(millis(ttl))
    } else {
        cmd.arg("EX").int_arg(secs(ttl))
    }
}

fn has_sub_second(ttl: Duration) -> bool {
    ttl.subsec_nanos() != 0
}

fn secs(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

/// Milliseconds, rounded up so a tiny positive TTL never becomes zero.
fn millis(ttl: Duration) -> i64 {
    let ms = ttl.as_millis() + u128::from(ttl.subsec_nanos() % 1_000_000 != 0);
    i64::try_from(ms).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::{FixedSelector, MemoryNode, MemoryStore};
    use crate::cache::RoundRobinSelector;

    fn node(addr: &str, store: &MemoryStore) -> Arc<MemoryNode> {
        Arc::new(MemoryNode::with_store(addr, store.clone()))
    }

    #[test]
    fn test_set_command_ttl_forms() {
        let none = set_command("k", "v", Duration::ZERO);
        assert_eq!(none.args().len(), 2);

        let secs = set_command("k", "v", Duration::from_secs(30));
        assert_eq!(secs.args()[2], b"EX".to_vec());
        assert_eq!(secs.args()[3], b"30".to_vec());

        let ms = set_command("k", "v", Duration::from_millis(1500));
        assert_eq!(ms.args()[2], b"PX".to_vec());
        assert_eq!(ms.args()[3], b"1500".to_vec());

        let tiny = set_command("k", "v", Duration::from_micros(10));
        assert_eq!(tiny.args()[3], b"1".to_vec());

        let huge = set_command("k", "v", Duration::from_secs(u64::MAX));
        assert_eq!(huge.args()[2], b"EX".to_vec());
        assert_eq!(huge.args()[3], i64::MAX.to_string().into_bytes());
    }

    #[tokio::test]
    async fn test_failing_replica_falls_back_to_primary() {
        let store = MemoryStore::default();
        let primary = node("primary", &store);
        let replica = Arc::new(MemoryNode::failing("replica"));
        let conn = RedisDbConn::new(primary.clone(), 0).with_reads(vec![replica.clone()]);

        conn.set("s", "v", Duration::ZERO).await.unwrap();
        conn.hset("h", &[FieldValuePair::new("f", "1")]).await.unwrap();
        conn.rpush("l", &["a", "b"]).await.unwrap();
        conn.sadd("set", &["m"]).await.unwrap();

        assert_eq!(conn.get_string("s").await.unwrap(), "v");
        assert_eq!(conn.hget("h", "f").await.unwrap().as_deref(), Some("1"));
        assert_eq!(
            conn.hgets(&[KeyFieldPair::new("h", "f")]).await.unwrap(),
            vec![Some("1".to_string())]
        );
        assert_eq!(conn.get_lrange("l", 0, -1).await.unwrap(), vec!["a", "b"]);
        assert_eq!(conn.smembers("set").await.unwrap(), vec!["m"]);
        assert!(conn.sismember("set", "m").await.unwrap());
        assert_eq!(conn.srand_member_n("set", 1).await.unwrap(), vec!["m"]);
        assert_eq!(
            conn.mget(&["s"]).await.unwrap(),
            vec![Some("v".to_string())]
        );
        assert_eq!(replica.calls(), 8);
    }

    #[tokio::test]
    async fn test_nil_on_replica_retries_primary() {
        let replica_store = MemoryStore::default();
        let primary_store = MemoryStore::default();
        let primary = node("primary", &primary_store);
        let replica = node("replica", &replica_store);
        let conn = RedisDbConn::new(primary.clone(), 0).with_reads(vec![replica.clone()]);

        conn.set("fresh", "written", Duration::ZERO).await.unwrap();
        assert_eq!(conn.get_string("fresh").await.unwrap(), "written");
        assert_eq!(replica.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_is_zero_value() {
        let store = MemoryStore::default();
        let conn = RedisDbConn::new(node("primary", &store), 0);
        assert_eq!(conn.get_string("nope").await.unwrap(), "");
        assert_eq!(conn.hget("nope", "f").await.unwrap(), None);
        assert!(conn.get_lrange("nope", 0, -1).await.unwrap().is_empty());
        assert!(conn.smembers("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cluster_reads_only_primary() {
        let store = MemoryStore::default();
        let primary = node("cluster", &store);
        let replica = node("replica", &store);
        let conn = RedisDbConn::new(primary.clone(), 0)
            .with_reads(vec![replica.clone()])
            .with_cluster(true);

        conn.set("k", "v", Duration::ZERO).await.unwrap();
        conn.hset("h", &[FieldValuePair::new("f", "1")]).await.unwrap();
        conn.rpush("l", &["a", "b"]).await.unwrap();
        conn.sadd("s", &["x"]).await.unwrap();
        let writes = primary.calls();
        assert_eq!(writes, 4);

        for _ in 0..10 {
            assert_eq!(conn.get_string("k").await.unwrap(), "v");
        }
        conn.mget(&["k", "k"]).await.unwrap();
        assert_eq!(conn.hget("h", "f").await.unwrap().as_deref(), Some("1"));
        let hs = conn.hgets(&[KeyFieldPair::new("h", "f")]).await.unwrap();
        assert_eq!(hs, vec![Some("1".to_string())]);
        assert_eq!(conn.get_lrange("l", 0, -1).await.unwrap(), vec!["a", "b"]);
        assert_eq!(conn.smembers("s").await.unwrap(), vec!["x"]);
        assert!(conn.sismember("s", "x").await.unwrap());
        assert_eq!(conn.srand_member_n("s", 1).await.unwrap(), vec!["x"]);

        assert_eq!(replica.calls(), 0);
        assert_eq!(primary.calls(), writes + 17);
    }

    #[tokio::test]
    async fn test_reads_spread_over_replicas() {
        let store = MemoryStore::default();
        let primary = node("primary", &store);
        let r1 = node("r1", &store);
        let r2 = node("r2", &store);
        let conn = RedisDbConn::new(primary.clone(), 0).with_reads(vec![r1.clone(), r2.clone()]);
        assert_eq!(conn.read_count(), 2);

        conn.set("k", "v", Duration::ZERO).await.unwrap();
        for _ in 0..1000 {
            conn.get_string("k").await.unwrap();
        }
        assert!(r1.calls() > 0);
        assert!(r2.calls() > 0);
        assert_eq!(r1.calls() + r2.calls(), 1000);
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_selector_is_pluggable() {
        let store = MemoryStore::default();
        let r0 = node("r0", &store);
        let r1 = node("r1", &store);
        let r2 = node("r2", &store);
        let conn = RedisDbConn::new(node("primary", &store), 0)
            .with_reads(vec![r0.clone(), r1.clone(), r2.clone()])
            .with_selector(Arc::new(FixedSelector(2)));
        conn.set("k", "v", Duration::ZERO).await.unwrap();
        for _ in 0..5 {
            conn.get_string("k").await.unwrap();
        }
        assert_eq!((r0.calls(), r1.calls(), r2.calls()), (0, 0, 5));

        let rr = RedisDbConn::new(node("primary", &store), 0)
            .with_reads(vec![r0.clone(), r1.clone()])
            .with_selector(Arc::new(RoundRobinSelector::default()));
        for _ in 0..4 {
            rr.get_string("k").await.unwrap();
        }
        assert_eq!((r0.calls(), r1.calls()), (2, 2));
    }

    #[tokio::test]
    async fn test_writes_never_touch_replicas() {
        let store = MemoryStore::default();
        let replica = node("replica", &store);
        let conn = RedisDbConn::new(node("primary", &store), 0).with_reads(vec![replica.clone()]);

        conn.set("k", "1", Duration::from_secs(10)).await.unwrap();
        assert_eq!(conn.increment_value("k", 4).await.unwrap(), 5);
        conn.sadd("s", &["a", "b"]).await.unwrap();
        assert_eq!(conn.srem("s", &["a"]).await.unwrap(), 1);
        assert!(conn.expire_key("k", Duration::from_millis(2500)).await.unwrap());
        assert!(!conn.expire_key("missing", Duration::from_secs(1)).await.unwrap());
        assert_eq!(conn.del_key(&["k", "s", "missing"]).await.unwrap(), 2);
        conn.mset(vec![("a".to_string(), "1".to_string())]).await.unwrap();
        assert_eq!(replica.calls(), 0);
    }

    #[tokio::test]
    async fn test_primary_errors_are_wrapped_with_context() {
        let conn = RedisDbConn::new(Arc::new(MemoryNode::failing("primary")), 0);
        let err = conn.get_string("user:1").await.unwrap_err();
        match err {
            CacheError::Redis { op, key, .. } => {
                assert_eq!(op, "get");
                assert_eq!(key, "user:1");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_batches_are_rejected_or_short_circuit() {
        let store = MemoryStore::default();
        let primary = node("primary", &store);
        let conn = RedisDbConn::new(primary.clone(), 0);
        let none: [&str; 0] = [];
        assert!(matches!(conn.rpush("l", &none).await, Err(CacheError::InvalidParameter(_))));
        assert!(matches!(conn.hset("h", &[]).await, Err(CacheError::InvalidParameter(_))));
        assert_eq!(conn.del_key(&none).await.unwrap(), 0);
        assert!(conn.hgets(&[]).await.unwrap().is_empty());
        assert_eq!(primary.calls(), 0);
    }
}
