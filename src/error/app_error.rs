use diesel_async::pooled_connection::PoolError;
use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::crypto::CipherError;
use crate::logger::LoggerError;
use crate::tenant::{Engine, TenantConfigError, TenantConnection};

/// Application-wide error type.
///
/// Each module keeps its own error enum; this type aggregates them and adds
/// the connection context (engine, tenant) that boot failures need.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration could not be loaded or validated
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logger could not be initialized
    #[error("Logger error: {0}")]
    Logger(#[from] LoggerError),

    /// A tenant's connections blob is malformed or incomplete
    #[error(transparent)]
    TenantConfig(#[from] TenantConfigError),

    /// Credential ticket could not be decrypted
    #[error("Credential decryption failed: {0}")]
    Decryption(#[from] CipherError),

    /// Master connection for an engine failed
    #[error("{engine} master connection failed")]
    MasterConnection {
        engine: Engine,
        #[source]
        source: anyhow::Error,
    },

    /// Tenant connection for an engine failed
    #[error("{engine} connection for tenant {tenant_id} ({code}) failed")]
    TenantConnection {
        engine: Engine,
        tenant_id: i64,
        code: String,
        #[source]
        source: anyhow::Error,
    },

    /// An operation needs a master connection that is not configured
    #[error("{engine} master connection is not configured")]
    MasterUnavailable { engine: Engine },

    /// Database operation error with operation context
    #[error("Database operation failed: {operation}")]
    Database {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Connection pool error
    #[error("Connection pool error")]
    ConnectionPool {
        #[source]
        source: anyhow::Error,
    },

    /// Cache operation error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn master(engine: Engine, source: impl Into<anyhow::Error>) -> Self {
        AppError::MasterConnection {
            engine,
            source: source.into(),
        }
    }

    pub fn tenant(engine: Engine, tenant: &TenantConnection, source: impl Into<anyhow::Error>) -> Self {
        AppError::TenantConnection {
            engine,
            tenant_id: tenant.tenant_id,
            code: tenant.code.clone(),
            source: source.into(),
        }
    }

    pub fn database(operation: impl Into<String>, source: diesel::result::Error) -> Self {
        AppError::Database {
            operation: operation.into(),
            source: anyhow::Error::from(source),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(error: diesel::result::Error) -> Self {
        AppError::database("database operation", error)
    }
}

impl From<PoolError> for AppError {
    fn from(error: PoolError) -> Self {
        AppError::ConnectionPool {
            source: anyhow::Error::from(error),
        }
    }
}

impl From<bb8::RunError<PoolError>> for AppError {
    fn from(error: bb8::RunError<PoolError>) -> Self {
        AppError::ConnectionPool {
            source: anyhow::Error::from(error),
        }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_error_carries_context() {
        let tenant = TenantConnection::new(42, "acme", "{}");
        let err = AppError::tenant(Engine::Redis, &tenant, anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "redis connection for tenant 42 (acme) failed");
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_cipher_error_converts() {
        let err: AppError = CipherError::KeyLength(3).into();
        assert!(matches!(err, AppError::Decryption(_)));
    }

    #[test]
    fn test_master_error_display() {
        let err = AppError::master(Engine::Mongodb, anyhow::anyhow!("timeout"));
        assert_eq!(err.to_string(), "mongodb master connection failed");
    }
}
