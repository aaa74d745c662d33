//! UPDATE builder.

use super::{Statement, returning_clause, where_clause};
use crate::column::{Assignment, Column};
use crate::engine::Engine;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::fragment::{Arg, Fragment, FragmentKind, Renderable, Sealed};
use crate::result::{AliasRegistry, Owner, SelectResult};
use crate::statement::Selectable;
use crate::table::Table;
use crate::value::Value;

/// UPDATE statement builder.
///
/// Building an UPDATE without any WHERE condition fails with
/// [`OrmError::UnsafeStatement`] unless [`Update::force`] was called.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    table: Table,
    sets: Vec<(Column, Assignment)>,
    filters: Vec<Expr>,
    returning: Vec<Column>,
    force: bool,
}

impl Update {
    pub fn new(table: &Table) -> Self {
        Self {
            table: table.clone(),
            sets: Vec::new(),
            filters: Vec::new(),
            returning: Vec::new(),
            force: false,
        }
    }

    fn check_owner(&self, column: &Column) -> OrmResult<()> {
        if column.table().same_table(self.table.ident()) {
            Ok(())
        } else {
            Err(OrmError::validation(format!(
                "column {} does not belong to {}",
                column.qualified_name(),
                self.table.qualified_name()
            )))
        }
    }

    /// `SET column = value`, validated against the column.
    pub fn set(mut self, column: &Column, value: impl Into<Value>) -> OrmResult<Self> {
        self.check_owner(column)?;
        let assignment = column.assign(value)?;
        self.sets.push((column.clone(), assignment));
        Ok(self)
    }

    /// `SET column = DEFAULT`
    pub fn set_default(mut self, column: &Column) -> OrmResult<Self> {
        self.check_owner(column)?;
        self.sets.push((column.clone(), Assignment::Default));
        Ok(self)
    }

    /// Add a WHERE condition; conditions are joined with `AND`.
    pub fn and_where(mut self, expr: Expr) -> Self {
        self.filters.push(expr);
        self
    }

    /// Allow building without WHERE (updates every row).
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

    /// Execute and return the number of updated rows.
    pub async fn execute(&self, engine: &impl Engine) -> OrmResult<u64> {
        Ok(self.run(engine, false).await?.affected())
    }

    /// Execute and materialize the `RETURNING` columns.
    pub async fn fetch_returning(&self, engine: &impl Engine) -> OrmResult<SelectResult> {
        if self.returning.is_empty() {
            return Err(OrmError::validation("UPDATE has no RETURNING columns"));
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

impl Sealed for Update {}

impl Renderable for Update {
    fn fragment(&self) -> Fragment {
        let sets = Fragment::join(
            self.sets.iter().map(|(column, assignment)| match assignment {
                Assignment::Value(v) => Fragment::from_parts(
                    "{} = {?}",
                    vec![Arg::ident(column.name())],
                    vec![v.clone()],
                ),
                Assignment::Default => Fragment::raw(format!("{} = DEFAULT", column.name())),
            }),
            FragmentKind::Comma,
        );
        let clauses = [
            Fragment::wrap("UPDATE {}", [self.table.from_fragment()]),
            Fragment::wrap("SET {}", [sets]),
            where_clause("WHERE", &self.filters),
            returning_clause(&self.returning),
        ];
        Fragment::join(clauses, FragmentKind::Plain)
    }
}

impl Statement for Update {
    fn build(&self) -> OrmResult<Fragment> {
        if self.sets.is_empty() {
            return Err(OrmError::validation(format!(
                "UPDATE {} has no SET values",
                self.table.qualified_name()
            )));
        }
        if self.filters.is_empty() && !self.force {
            return Err(OrmError::unsafe_statement(format!(
                "UPDATE {} without WHERE; call force() to update every row",
                self.table.qualified_name()
            )));
        }
        Ok(self.fragment())
    }

    fn label(&self) -> &'static str {
        "UPDATE"
    }
}
