//! Database connection pool module.
//!
//! Provides async PostgreSQL connection pooling using diesel_async with bb8,
//! plus embedded migration support.

mod pool;

pub use pool::{AsyncDbPool, establish_async_connection_pool, run_pending_migrations};
