//! Connection pool helpers

use crate::engine::PoolEngine;
use crate::error::{OrmError, OrmResult};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;

/// Default maximum pool size used by [`create_pool`].
pub const DEFAULT_POOL_SIZE: usize = 16;

/// Create a connection pool from a database URL.
///
/// Uses `NoTls`; suitable for local and test databases.
///
/// ```ignore
/// let engine = pgcompose::PoolEngine::new(pgcompose::create_pool("postgres://localhost/db")?);
/// let users = table.select().execute(&engine).await?;
/// ```
pub fn create_pool(database_url: &str) -> OrmResult<Pool> {
    create_pool_with_config(database_url, DEFAULT_POOL_SIZE)
}

/// Create a connection pool with at most `max_size` connections.
pub fn create_pool_with_config(database_url: &str, max_size: usize) -> OrmResult<Pool> {
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| OrmError::Connection(e.to_string()))?;

    let manager_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };
    let mgr = Manager::from_config(pg_config, NoTls, manager_config);
    Pool::builder(mgr)
        .max_size(max_size)
        .build()
        .map_err(|e| OrmError::Pool(e.to_string()))
}

/// Shorthand for `PoolEngine::new(create_pool(database_url)?)`.
pub fn connect(database_url: &str) -> OrmResult<PoolEngine> {
    create_pool(database_url).map(PoolEngine::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_a_connection_error() {
        let err = create_pool("not a url ::").unwrap_err();
        assert!(matches!(err, OrmError::Connection(_)));
    }

    #[test]
    fn test_pool_size() {
        let pool = create_pool_with_config("postgres://localhost/db", 4).unwrap();
        assert_eq!(pool.status().max_size, 4);
    }
}
