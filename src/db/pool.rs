//! Async database connection pool implementation.
//!
//! Uses bb8 connection pool manager with diesel_async for PostgreSQL
//! connections. Migrations run through a blocking sync connection since
//! diesel_migrations drives plain diesel.

use std::time::Duration;

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::Pool;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Async connection pool type alias.
///
/// bb8::Pool internally uses Arc, so Clone is cheap (just a reference count
/// increment). Structures holding AsyncDbPool can derive Clone without
/// additional Arc wrapping.
pub type AsyncDbPool = Pool<AsyncPgConnection>;

/// Creates an async database connection pool from configuration.
///
/// # Errors
///
/// Returns `AppError::ConnectionPool` if the pool cannot be built (for
/// example when the database is unreachable at startup).
pub async fn establish_async_connection_pool(config: &DatabaseConfig) -> AppResult<AsyncDbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.url);
    Pool::builder()
        .max_size(config.max_connections)
        .min_idle(Some(config.min_connections))
        .connection_timeout(Duration::from_secs(config.connection_timeout))
        .build(manager)
        .await
        .map_err(|e| AppError::ConnectionPool {
            source: anyhow::Error::from(e),
        })
}

/// Runs all pending embedded migrations against the configured database.
///
/// Uses a dedicated synchronous connection on a blocking thread; the async
/// pool is not involved.
pub async fn run_pending_migrations(config: &DatabaseConfig) -> AppResult<usize> {
    let url = config.url.clone();

    tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&url).map_err(|e| AppError::Database {
            operation: "connect for migrations".to_string(),
            source: anyhow::Error::from(e),
        })?;

        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| AppError::Database {
                operation: "run pending migrations".to_string(),
                source: anyhow::Error::msg(e.to_string()),
            })?;

        Ok(applied.len())
    })
    .await
    .map_err(|e| AppError::Internal {
        source: anyhow::Error::from(e),
    })?
}
