//! Multi-key operations emulated with one pipeline of single-key commands.
//!
//! Every key gets its own `GET`/`SET`, so keys never need to share a cluster
//! slot. Results come back in input order.

use std::time::Duration;

use crate::cache::reply;
use crate::cache::router::{set_command, RedisDbConn};
use crate::cache::{CacheError, Command, MSetArgs};

impl RedisDbConn {
    /// One value per key; missing keys are `None`.
    pub async fn mget<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<Option<String>>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let cmds: Vec<Command> = keys.iter().map(|k| Command::new("GET").arg(k.as_ref())).collect();
        let values = self
            .read_pipeline(&cmds)
            .await
            .map_err(|e| CacheError::redis("mget", keys[0].as_ref(), e))?;
        if values.len() != keys.len() {
            return Err(CacheError::unexpected(
                "mget",
                format!("{} replies for {} keys", values.len(), keys.len()),
            ));
        }
        values
            .into_iter()
            .map(|v| reply::optional_string("mget", v))
            .collect()
    }

    pub async fn mset(&self, args: impl Into<MSetArgs>) -> Result<(), CacheError> {
        self.mset_with_ttl(args, Duration::ZERO).await
    }

    /// Stores every pair with the same `ttl`; zero means no expiry.
    pub async fn mset_with_ttl(&self, args: impl Into<MSetArgs>, ttl: Duration) -> Result<(), CacheError> {
        let pairs = args.into().into_pairs()?;
        let cmds: Vec<Command> = pairs
            .iter()
            .map(|(key, value)| set_command(key, value, ttl))
            .collect();
        let values = self
            .write_pipeline(&cmds)
            .await
            .map_err(|e| CacheError::redis("mset", &pairs[0].0, e))?;
        for value in values {
            reply::ok("mset", value)?;
        }
        Ok(())
    }
}
