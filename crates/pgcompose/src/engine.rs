//! Engine boundary: where compiled statements meet a database.
//!
//! The rest of the crate never touches a driver directly. It compiles a statement into
//! `(sql, params)` and hands that to an [`Engine`]. Adapters are provided for
//! `tokio_postgres::Client`, for a transaction over it ([`PgTransaction`]) and, with the
//! `pool` feature, for a `deadpool_postgres::Pool` ([`PoolEngine`]).

use crate::config::CompileOptions;
use crate::error::{OrmError, OrmResult};
use crate::fragment::Placeholder;
use crate::value::Value;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// What the engine returns for one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    /// Rows in select-list order, for fetching statements.
    Rows(Vec<Vec<Value>>),
    /// Number of affected rows, for non-fetching statements.
    Affected(u64),
}

impl Execution {
    /// The fetched rows; empty for a non-fetching execution.
    pub fn into_rows(self) -> Vec<Vec<Value>> {
        match self {
            Execution::Rows(rows) => rows,
            Execution::Affected(_) => Vec::new(),
        }
    }

    /// Affected row count (the number of rows for a fetching execution).
    pub fn affected(&self) -> u64 {
        match self {
            Execution::Rows(rows) => rows.len() as u64,
            Execution::Affected(n) => *n,
        }
    }
}

/// Executes compiled SQL.
///
/// Implementors decide the placeholder style through [`Engine::options`]. Errors are
/// returned as produced by the driver; nothing is retried.
pub trait Engine: Send + Sync {
    /// Compile options for statements run on this engine.
    fn options(&self) -> CompileOptions {
        CompileOptions::default()
    }

    /// Execute `sql`. Returns rows when `fetch` is set, the affected row count otherwise.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
        fetch: bool,
    ) -> impl std::future::Future<Output = OrmResult<Execution>> + Send;
}

/// An engine with explicit transaction control.
pub trait Transaction: Engine {
    fn begin(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send;

    fn commit(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send;

    fn rollback(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send;
}

fn param_refs(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

/// Decode driver rows column by column.
pub(crate) fn decode_rows(rows: &[Row]) -> OrmResult<Vec<Vec<Value>>> {
    rows.iter()
        .map(|row| {
            (0..row.len())
                .map(|idx| {
                    row.try_get::<_, Value>(idx).map_err(|e| {
                        OrmError::decode(row.columns()[idx].name(), e.to_string())
                    })
                })
                .collect()
        })
        .collect()
}

fn native_options() -> CompileOptions {
    CompileOptions::default().with_placeholder(Placeholder::Numbered)
}

impl Engine for tokio_postgres::Client {
    fn options(&self) -> CompileOptions {
        native_options()
    }

    async fn execute(&self, sql: &str, params: &[Value], fetch: bool) -> OrmResult<Execution> {
        let refs = param_refs(params);
        if fetch {
            let rows = tokio_postgres::Client::query(self, sql, &refs).await?;
            Ok(Execution::Rows(decode_rows(&rows)?))
        } else {
            let n = tokio_postgres::Client::execute(self, sql, &refs).await?;
            Ok(Execution::Affected(n))
        }
    }
}

impl Engine for tokio_postgres::Transaction<'_> {
    fn options(&self) -> CompileOptions {
        native_options()
    }

    async fn execute(&self, sql: &str, params: &[Value], fetch: bool) -> OrmResult<Execution> {
        let refs = param_refs(params);
        if fetch {
            let rows = tokio_postgres::Transaction::query(self, sql, &refs).await?;
            Ok(Execution::Rows(decode_rows(&rows)?))
        } else {
            let n = tokio_postgres::Transaction::execute(self, sql, &refs).await?;
            Ok(Execution::Affected(n))
        }
    }
}

/// A transaction driven by explicit `BEGIN`/`COMMIT`/`ROLLBACK` on a shared client.
///
/// Unlike `tokio_postgres::Transaction` this does not need `&mut Client` and does not
/// roll back on drop: callers must finish it with [`Transaction::commit`] or
/// [`Transaction::rollback`].
pub struct PgTransaction<'a> {
    client: &'a tokio_postgres::Client,
}

impl<'a> PgTransaction<'a> {
    pub fn new(client: &'a tokio_postgres::Client) -> Self {
        Self { client }
    }
}

impl Engine for PgTransaction<'_> {
    fn options(&self) -> CompileOptions {
        native_options()
    }

    async fn execute(&self, sql: &str, params: &[Value], fetch: bool) -> OrmResult<Execution> {
        Engine::execute(self.client, sql, params, fetch).await
    }
}

impl Transaction for PgTransaction<'_> {
    async fn begin(&self) -> OrmResult<()> {
        self.client.batch_execute("BEGIN").await?;
        Ok(())
    }

    async fn commit(&self) -> OrmResult<()> {
        self.client.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&self) -> OrmResult<()> {
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }
}

/// Engine over a connection pool: each execution checks out one connection.
#[cfg(feature = "pool")]
#[derive(Clone)]
pub struct PoolEngine {
    pool: deadpool_postgres::Pool,
    options: CompileOptions,
}

#[cfg(feature = "pool")]
impl PoolEngine {
    pub fn new(pool: deadpool_postgres::Pool) -> Self {
        Self {
            pool,
            options: native_options(),
        }
    }

    /// Override compile options (log truncation). The placeholder style stays `$n`.
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options.with_placeholder(Placeholder::Numbered);
        self
    }

    pub fn pool(&self) -> &deadpool_postgres::Pool {
        &self.pool
    }
}

#[cfg(feature = "pool")]
impl Engine for PoolEngine {
    fn options(&self) -> CompileOptions {
        self.options
    }

    async fn execute(&self, sql: &str, params: &[Value], fetch: bool) -> OrmResult<Execution> {
        let client = self.pool.get().await?;
        let client: &tokio_postgres::Client = &client;
        Engine::execute(client, sql, params, fetch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_accessors() {
        let rows = Execution::Rows(vec![vec![Value::from(1)], vec![Value::from(2)]]);
        assert_eq!(rows.affected(), 2);
        assert_eq!(rows.into_rows().len(), 2);

        let affected = Execution::Affected(3);
        assert_eq!(affected.affected(), 3);
        assert!(affected.into_rows().is_empty());
    }

    #[test]
    fn test_native_options_use_numbered_placeholders() {
        assert_eq!(native_options().placeholder, Placeholder::Numbered);
    }
}
