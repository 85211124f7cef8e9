//! Redis node backends.
//!
//! A node is one addressable Redis endpoint: a standalone server reached
//! through a bb8 pool of multiplexed connections, or a whole cluster reached
//! through the cluster client.

use std::future::Future;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection, RunError};
use futures::future::try_join_all;
use redis::aio::MultiplexedConnection;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::{Client, RedisError, RedisResult, Value};

use crate::cache::Command;
use crate::config::RedisConfig;

/// Transport for commands against one Redis endpoint.
#[async_trait]
pub trait RedisNode: Send + Sync {
    /// Address used in logs.
    fn addr(&self) -> &str;

    async fn query(&self, cmd: &Command) -> RedisResult<Value>;

    /// Runs `cmds` as one batch and returns one reply per command, in order.
    async fn query_pipeline(&self, cmds: &[Command]) -> RedisResult<Vec<Value>>;

    async fn ping(&self) -> RedisResult<()> {
        self.query(&Command::new("PING")).await.map(|_| ())
    }
}

type RedisPool = Pool<Client>;

/// Standalone server behind a bb8 pool.
pub struct PooledNode {
    addr: String,
    pool: RedisPool,
    response_timeout: Duration,
}

impl PooledNode {
    pub async fn connect(url: &str, config: &RedisConfig) -> RedisResult<Self> {
        let client = Client::open(url)?;
        let addr = display_addr(url);

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .min_idle(Some(config.min_idle_connections))
            .connection_timeout(config.pool_timeout())
            .max_lifetime(seconds(config.max_connection_lifetime))
            .idle_timeout(seconds(config.max_idle_connection_lifetime))
            .retry_connection(config.max_retries > 0)
            .build(client)
            .await?;

        let node = Self {
            addr,
            pool,
            response_timeout: config.response_timeout(),
        };
        bounded(config.dial_timeout(), &node.addr, node.ping()).await?;
        Ok(node)
    }

    async fn get_conn(&self) -> RedisResult<PooledConnection<'_, Client>> {
        self.pool.get().await.map_err(|e| match e {
            RunError::User(e) => e,
            RunError::TimedOut => timed_out(&self.addr, "pool checkout"),
        })
    }
}

#[async_trait]
impl RedisNode for PooledNode {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn query(&self, cmd: &Command) -> RedisResult<Value> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let redis_cmd = cmd.to_redis();
        bounded(self.response_timeout, &self.addr, redis_cmd.query_async::<Value>(conn_ref)).await
    }

    async fn query_pipeline(&self, cmds: &[Command]) -> RedisResult<Vec<Value>> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;
        let conn_ref: &mut MultiplexedConnection = &mut conn;
        let mut pipe = redis::pipe();
        for cmd in cmds {
            pipe.add_command(cmd.to_redis());
        }
        bounded(self.response_timeout, &self.addr, pipe.query_async::<Vec<Value>>(conn_ref)).await
    }
}

/// Redis cluster reached through the slot-aware cluster client.
pub struct ClusterNode {
    addr: String,
    conn: ClusterConnection,
}

impl ClusterNode {
    pub async fn connect(urls: &[String], config: &RedisConfig) -> RedisResult<Self> {
        let client = ClusterClient::builder(urls.to_vec())
            .retries(config.max_retries)
            .connection_timeout(config.dial_timeout())
            .response_timeout(config.response_timeout())
            .build()?;
        let addr = urls.iter().map(|u| display_addr(u)).collect::<Vec<_>>().join(",");
        let conn = bounded(config.dial_timeout(), &addr, client.get_async_connection()).await?;

        let node = Self { addr, conn };
        node.ping().await?;
        Ok(node)
    }
}

#[async_trait]
impl RedisNode for ClusterNode {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn query(&self, cmd: &Command) -> RedisResult<Value> {
        let mut conn = self.conn.clone();
        cmd.to_redis().query_async::<Value>(&mut conn).await
    }

    /// Keys of one batch may live in different slots, so commands are sent
    /// individually; the multiplexed connection still pipelines them per node.
    async fn query_pipeline(&self, cmds: &[Command]) -> RedisResult<Vec<Value>> {
        try_join_all(cmds.iter().map(|cmd| self.query(cmd))).await
    }
}

async fn bounded<T, F>(limit: Duration, addr: &str, fut: F) -> RedisResult<T>
where
    F: Future<Output = RedisResult<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| timed_out(addr, "command"))?
}

fn timed_out(addr: &str, what: &str) -> RedisError {
    RedisError::from(io::Error::new(
        io::ErrorKind::TimedOut,
        format!("redis {what} timed out on {addr}"),
    ))
}

/// `host:port` of a node URL, without credentials.
fn display_addr(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| Some(format!("{}:{}", u.host_str()?, u.port().unwrap_or(6379))))
        .unwrap_or_else(|| "redis".to_string())
}

fn seconds(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: RedisResult<()> = bounded(Duration::from_millis(10), "10.0.0.1:6379", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_display_addr_hides_credentials() {
        assert_eq!(display_addr("redis://:secret@10.0.0.5:7001/3"), "10.0.0.5:7001");
        assert_eq!(display_addr("redis://cache.local/"), "cache.local:6379");
    }

    #[tokio::test]
    async fn test_bounded_passes_result() {
        let result = bounded(Duration::from_secs(1), "n", async { Ok::<_, RedisError>(5) }).await;
        assert_eq!(result.unwrap(), 5);
    }
}
