//! DELETE builder.

use super::{Statement, returning_clause, where_clause};
use crate::column::Column;
use crate::engine::Engine;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::fragment::{Fragment, FragmentKind, Renderable, Sealed};
use crate::result::{AliasRegistry, Owner, SelectResult};
use crate::statement::Selectable;
use crate::table::Table;

/// DELETE statement builder.
///
/// Building a DELETE without any WHERE condition fails with
/// [`OrmError::UnsafeStatement`] unless [`Delete::force`] was called.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    table: Table,
    filters: Vec<Expr>,
    returning: Vec<Column>,
    force: bool,
}

impl Delete {
    pub fn new(table: &Table) -> Self {
        Self {
            table: table.clone(),
            filters: Vec::new(),
            returning: Vec::new(),
            force: false,
        }
    }

    /// Add a WHERE condition; conditions are joined with `AND`.
    pub fn and_where(mut self, expr: Expr) -> Self {
        self.filters.push(expr);
        self
    }

    /// Allow building without WHERE (deletes every row).
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn deforce(mut self) -> Self {
        self.force = false;
        self
    }

    pub fn is_forced(&self) -> bool {
        self.force
    }

    pub fn returning(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.returning.extend(columns);
        self
    }

    /// Execute and return the number of deleted rows.
    pub async fn execute(&self, engine: &impl Engine) -> OrmResult<u64> {
        Ok(self.run(engine, false).await?.affected())
    }

    /// Execute and materialize the `RETURNING` columns of the deleted rows.
    pub async fn fetch_returning(&self, engine: &impl Engine) -> OrmResult<SelectResult> {
        if self.returning.is_empty() {
            return Err(OrmError::validation("DELETE has no RETURNING columns"));
        }
        let rows = self.run(engine, true).await?.into_rows();
        let registry = AliasRegistry::from_projection(
            self.returning
                .iter()
                .map(|c| (Selectable::from(c), Owner::From)),
        );
        Ok(SelectResult::new(self.table.clone(), registry, rows))
    }
}

impl Sealed for Delete {}

impl Renderable for Delete {
    fn fragment(&self) -> Fragment {
        let clauses = [
            Fragment::wrap("DELETE FROM {}", [self.table.from_fragment()]),
            where_clause("WHERE", &self.filters),
            returning_clause(&self.returning),
        ];
        Fragment::join(clauses, FragmentKind::Plain)
    }
}

impl Statement for Delete {
    fn build(&self) -> OrmResult<Fragment> {
        if self.filters.is_empty() && !self.force {
            return Err(OrmError::unsafe_statement(format!(
                "DELETE FROM {} without WHERE; call force() to delete every row",
                self.table.qualified_name()
            )));
        }
        Ok(self.fragment())
    }

    fn label(&self) -> &'static str {
        "DELETE"
    }
}
