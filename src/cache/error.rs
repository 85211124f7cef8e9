//! Cache error types.

use redis::RedisError;
use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis {op} failed for '{key}': {source}")]
    Redis {
        op: &'static str,
        key: String,
        #[source]
        source: RedisError,
    },

    #[error("Unexpected reply to {op}: {detail}")]
    UnexpectedReply { op: &'static str, detail: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tenant {0} has no cache connection")]
    TenantUnavailable(i64),
}

impl CacheError {
    pub(crate) fn redis(op: &'static str, key: impl Into<String>, source: RedisError) -> Self {
        Self::Redis {
            op,
            key: key.into(),
            source,
        }
    }

    pub(crate) fn unexpected(op: &'static str, detail: impl Into<String>) -> Self {
        Self::UnexpectedReply {
            op,
            detail: detail.into(),
        }
    }
}
