//! Async MySQL connection pool.
//!
//! Uses bb8 with diesel_async. Every pool, master or tenant, is sized from the
//! same [`SqlConfig`].

use std::time::Duration;

use diesel::ConnectionResult;
use diesel::connection::InstrumentationEvent;
use diesel_async::pooled_connection::bb8::Pool;
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, ManagerConfig};
use diesel_async::{AsyncConnection, AsyncMysqlConnection};
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::config::SqlConfig;
use crate::error::AppError;

/// Async connection pool type alias.
///
/// bb8::Pool internally uses Arc, so Clone is cheap (just reference count increment).
pub type AsyncDbPool = Pool<AsyncMysqlConnection>;

/// Creates a pool for `database_url` and verifies it by checking out one connection.
///
/// # Errors
///
/// - `AppError::ConnectionPool` - If the pool cannot be built or no connection can be checked out
pub async fn establish_async_connection_pool(
    database_url: &str,
    config: &SqlConfig,
) -> Result<AsyncDbPool, AppError> {
    let manager = if config.debug {
        let mut manager_config = ManagerConfig::default();
        manager_config.custom_setup = Box::new(establish_instrumented);
        AsyncDieselConnectionManager::<AsyncMysqlConnection>::new_with_config(
            database_url,
            manager_config,
        )
    } else {
        AsyncDieselConnectionManager::<AsyncMysqlConnection>::new(database_url)
    };

    let pool = Pool::builder()
        .max_size(config.max_open_connections)
        .min_idle(Some(config.max_idle_connections.min(config.max_open_connections)))
        .max_lifetime(seconds(config.max_connection_lifetime))
        .idle_timeout(seconds(config.max_idle_connection_lifetime))
        .connection_timeout(Duration::from_secs(config.connection_timeout))
        .build(manager)
        .await?;

    {
        let _conn = pool.get().await?;
    }

    Ok(pool)
}

fn establish_instrumented(url: &str) -> BoxFuture<'_, ConnectionResult<AsyncMysqlConnection>> {
    async move {
        let mut conn = AsyncMysqlConnection::establish(url).await?;
        conn.set_instrumentation(log_query);
        Ok(conn)
    }
    .boxed()
}

fn log_query(event: InstrumentationEvent<'_>) {
    match event {
        InstrumentationEvent::StartQuery { query, .. } => {
            tracing::debug!(target: "sql", query = %query, "Executing query");
        }
        InstrumentationEvent::FinishQuery { query, error, .. } => {
            if let Some(error) = error {
                tracing::debug!(target: "sql", query = %query, error = %error, "Query failed");
            }
        }
        _ => {}
    }
}

/// Zero means "no limit".
fn seconds(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seconds_disables_limit() {
        assert_eq!(seconds(0), None);
        assert_eq!(seconds(90), Some(Duration::from_secs(90)));
    }
}
