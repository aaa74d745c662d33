//! # pgcompose
//!
//! Typed table schemas, composable SQL statements and nested result materialization
//! for PostgreSQL.
//!
//! ## Features
//!
//! - **Typed columns**: comparisons and assignments are checked against the column type
//!   when the statement is composed, not when it runs
//! - **One algebra**: every SQL piece is a [`Fragment`]; parameters stay in placeholder
//!   order under any nesting
//! - **Join-aware**: ON conditions are re-qualified with the join alias, self-joins are
//!   resolved by alias identity
//! - **Nested results**: flat rows come back as one object per row with joined tables
//!   nested under `_{table}`
//! - **Safe defaults**: UPDATE/DELETE without WHERE refuse to build until `force()`
//!
//! ## Example
//!
//! ```ignore
//! use pgcompose::{ColumnDef, Statement, Table};
//!
//! let users = Table::builder("users")
//!     .column(ColumnDef::serial("id").primary_key())
//!     .column(ColumnDef::varchar("name", 50).not_null())
//!     .build()?;
//! let orders = Table::builder("orders")
//!     .column(ColumnDef::serial("id").primary_key())
//!     .column(ColumnDef::integer("user_id").not_null())
//!     .column(ColumnDef::integer("total"))
//!     .build()?;
//!
//! let query = orders
//!     .select()
//!     .select([orders.col("total")])
//!     .join(
//!         pgcompose::JoinKind::Inner,
//!         &users,
//!         orders.col("user_id").eq(users.col("id"))?,
//!         Some("u"),
//!         [users.col("name")],
//!     )?
//!     .and_where(orders.col("total").gt(10)?);
//!
//! let compiled = query.compile()?;
//! // SELECT orders.total, u.name FROM orders INNER JOIN users AS u ON orders.user_id = u.id
//! //   WHERE orders.total > %s
//!
//! let engine = pgcompose::connect(&database_url)?;
//! for row in query.execute(&engine).await?.as_flat_list()? {
//!     // {"total": 12, "_users": {"name": "Alice"}}
//! }
//! ```

pub mod aggregate;
pub mod column;
pub mod config;
pub mod engine;
pub mod error;
pub mod expr;
pub mod fragment;
pub mod join;
pub mod result;
pub mod statement;
pub mod table;
pub mod value;

pub use aggregate::{AggFunc, Aggregate, FuncArg, lit};
pub use column::{
    Assignment, AutoIncrement, Column, ColumnDef, ColumnKind, DefaultValue, RangePolicy,
};
pub use config::CompileOptions;
pub use engine::{Engine, Execution, PgTransaction, Transaction};
pub use error::{OrmError, OrmResult};
pub use expr::{Between, CompareOp, Expr, Filter, FilterTarget, Operand, all, any};
pub use fragment::{Arg, CompiledQuery, Fragment, FragmentKind, Placeholder, Renderable};
pub use join::{Join, JoinKind};
pub use result::{AliasRegistry, Owner, RegistryEntry, SelectResult};
pub use statement::{
    Compound, Delete, Exists, Insert, OrderBy, Select, Selectable, SetOp, Statement, Update,
};
pub use table::{Record, Table, TableBuilder, TableIdent, TableRegistry};
pub use value::{Value, ValueKind};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use engine::PoolEngine;
#[cfg(feature = "pool")]
pub use pool::{connect, create_pool, create_pool_with_config};
