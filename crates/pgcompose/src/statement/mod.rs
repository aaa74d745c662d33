//! Statement builders.
//!
//! Builders follow the usual `mut self -> Self` style. A statement is built once and then
//! compiled or executed; sharing one builder between tasks while it is still being
//! modified is the caller's problem, not something the builders guard against.

mod clause;
mod delete;
mod insert;
mod select;
mod update;

pub use clause::{OrderBy, Selectable};
pub use delete::Delete;
pub use insert::Insert;
pub use select::{Compound, Exists, Select, SetOp};
pub use update::Update;

use crate::config::CompileOptions;
use crate::engine::{Engine, Execution};
use crate::error::OrmResult;
use crate::expr::Expr;
use crate::fragment::{CompiledQuery, Fragment, FragmentKind, Placeholder, Renderable};

/// Common behaviour of every statement: assemble, compile, render and run.
pub trait Statement: Sync {
    /// Assemble the statement into one fragment.
    ///
    /// Fails for statements that must not run as built (e.g. `UPDATE` without `WHERE`).
    fn build(&self) -> OrmResult<Fragment>;

    /// Statement keyword, used in logs.
    fn label(&self) -> &'static str;

    /// Compile with `%s` placeholders.
    fn compile(&self) -> OrmResult<CompiledQuery> {
        self.compile_with(Placeholder::default())
    }

    /// Compile with the given placeholder style.
    fn compile_with(&self, placeholder: Placeholder) -> OrmResult<CompiledQuery> {
        Ok(self.build()?.compile_with(placeholder))
    }

    fn compile_with_options(&self, options: &CompileOptions) -> OrmResult<CompiledQuery> {
        self.compile_with(options.placeholder)
    }

    /// Human-readable SQL with literal values inlined.
    fn render(&self) -> OrmResult<String> {
        Ok(self.build()?.render())
    }

    /// Compile for `engine` and execute it.
    fn run(
        &self,
        engine: &impl Engine,
        fetch: bool,
    ) -> impl std::future::Future<Output = OrmResult<Execution>> + Send {
        async move {
            let options = engine.options();
            let compiled = self.compile_with_options(&options)?;
            log_statement(self.label(), &compiled, &options);
            let execution = engine.execute(&compiled.sql, &compiled.params, fetch).await?;
            log_outcome(self.label(), &execution);
            Ok(execution)
        }
    }
}

#[cfg(feature = "tracing")]
fn log_statement(label: &'static str, compiled: &CompiledQuery, options: &CompileOptions) {
    tracing::debug!(
        target: "pgcompose.sql",
        statement = label,
        param_count = compiled.params.len(),
        sql = %options.truncate_sql(&compiled.sql),
    );
}

#[cfg(not(feature = "tracing"))]
fn log_statement(_label: &'static str, _compiled: &CompiledQuery, _options: &CompileOptions) {}

#[cfg(feature = "tracing")]
fn log_outcome(label: &'static str, execution: &Execution) {
    match execution {
        Execution::Rows(rows) => {
            tracing::debug!(target: "pgcompose.sql", statement = label, rows = rows.len(), "fetched");
        }
        Execution::Affected(n) => {
            tracing::debug!(target: "pgcompose.sql", statement = label, affected = n, "executed");
        }
    }
}

#[cfg(not(feature = "tracing"))]
fn log_outcome(_label: &'static str, _execution: &Execution) {}

/// `WHERE a AND b ...`, or empty.
pub(crate) fn where_clause(keyword: &str, filters: &[Expr]) -> Fragment {
    if filters.is_empty() {
        return Fragment::empty();
    }
    let joined = Fragment::join(filters.iter().map(Renderable::fragment), FragmentKind::Filter);
    Fragment::wrap(&format!("{keyword} {{}}"), [joined])
}

/// `RETURNING a, b`, or empty.
pub(crate) fn returning_clause(columns: &[crate::column::Column]) -> Fragment {
    if columns.is_empty() {
        return Fragment::empty();
    }
    let names = columns
        .iter()
        .map(|c| c.name().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Fragment::raw(format!("RETURNING {names}"))
}
