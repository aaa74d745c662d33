//! SELECT, set operations and EXISTS.

use super::clause::{OrderBy, Selectable};
use super::{Statement, where_clause};
use crate::column::Column;
use crate::engine::Engine;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::fragment::{Fragment, FragmentKind, Renderable, Sealed};
use crate::join::{Join, JoinKind};
use crate::result::{AliasRegistry, Owner, SelectResult};
use crate::table::Table;

/// SELECT statement builder.
///
/// Clauses are emitted in a fixed order regardless of call order:
/// `SELECT .. FROM .. [JOIN ..] [WHERE ..] [GROUP BY ..] [HAVING ..] [ORDER BY ..] [LIMIT n] [OFFSET n]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    from: Table,
    /// `None` projects every column of the FROM table.
    projection: Option<Vec<Selectable>>,
    joins: Vec<Join>,
    filters: Vec<Expr>,
    group_by: Vec<Selectable>,
    having: Vec<Expr>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Select {
    /// `SELECT <all columns> FROM table`.
    pub fn from_table(table: &Table) -> Self {
        Self {
            from: table.clone(),
            projection: None,
            joins: Vec::new(),
            filters: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// The FROM table.
    pub fn table(&self) -> &Table {
        &self.from
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    // ==================== Projection ====================

    /// Replace the projection. An empty list selects the constant `1`.
    pub fn select<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selectable>,
    {
        self.projection = Some(items.into_iter().map(Into::into).collect());
        self
    }

    /// Append one item to an explicit projection.
    pub fn column(mut self, item: impl Into<Selectable>) -> Self {
        self.projection
            .get_or_insert_with(Vec::new)
            .push(item.into());
        self
    }

    // ==================== Joins ====================

    /// Join `table` on `on`. `fields` are projected from the joined table.
    pub fn join(
        mut self,
        kind: JoinKind,
        table: &Table,
        on: Expr,
        alias: Option<&str>,
        fields: impl IntoIterator<Item = Column>,
    ) -> OrmResult<Self> {
        let join = Join::new(kind, &self.from, table, on, alias, fields)?;
        self.joins.push(join);
        Ok(self)
    }

    pub fn inner_join(self, table: &Table, on: Expr) -> OrmResult<Self> {
        self.join(JoinKind::Inner, table, on, None, [])
    }

    pub fn left_join(self, table: &Table, on: Expr) -> OrmResult<Self> {
        self.join(JoinKind::Left, table, on, None, [])
    }

    pub fn right_join(self, table: &Table, on: Expr) -> OrmResult<Self> {
        self.join(JoinKind::Right, table, on, None, [])
    }

    pub fn full_outer_join(self, table: &Table, on: Expr) -> OrmResult<Self> {
        self.join(JoinKind::FullOuter, table, on, None, [])
    }

    /// Append a join resolved elsewhere. It must be resolved against this FROM table.
    pub fn add_join(mut self, join: Join) -> OrmResult<Self> {
        if join.from_table() != self.from.ident() {
            return Err(OrmError::validation(format!(
                "join on {} was resolved against {}, not {}",
                join.join_table().qualified_name(),
                join.from_table().qualified_name(),
                self.from.qualified_name()
            )));
        }
        self.joins.push(join);
        Ok(self)
    }

    // ==================== Filters and grouping ====================

    /// Add a WHERE condition; conditions are joined with `AND`.
    pub fn and_where(mut self, expr: Expr) -> Self {
        self.filters.push(expr);
        self
    }

    pub fn group_by<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Selectable>,
    {
        self.group_by.extend(items.into_iter().map(Into::into));
        self
    }

    /// Add a HAVING condition; conditions are joined with `AND`.
    pub fn having(mut self, expr: Expr) -> Self {
        self.having.push(expr);
        self
    }

    // ==================== Ordering and paging ====================

    pub fn order_by(mut self, item: impl Into<OrderBy>) -> Self {
        self.order_by.push(item.into());
        self
    }

    /// `ORDER BY` from the `(target, ascending, nulls_first)` triple.
    pub fn order_by_column(
        self,
        target: impl Into<Selectable>,
        ascending: Option<bool>,
        nulls_first: Option<bool>,
    ) -> Self {
        self.order_by(OrderBy::from_parts(target, ascending, nulls_first))
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    // ==================== Composition ====================

    /// `self UNION [ALL] other`. A chain passed as `other` is appended flat.
    pub fn union(self, other: impl Into<Compound>, all: bool) -> Compound {
        Compound::new(self).union(other, all)
    }

    pub fn union_all(self, other: impl Into<Compound>) -> Compound {
        self.union(other, true)
    }

    pub fn intersect(self, other: impl Into<Compound>) -> Compound {
        Compound::new(self).intersect(other)
    }

    /// `EXISTS (SELECT 1 FROM ...)`, usable as a condition or run on its own.
    pub fn exists(mut self) -> Exists {
        self.projection = Some(Vec::new());
        for join in &mut self.joins {
            join.clear_fields();
        }
        Exists { select: self }
    }

    // ==================== Resolution ====================

    /// Re-qualify a column that belongs to a joined table with that join's alias.
    fn resolve_column(&self, column: Column) -> Column {
        if column.prefix().is_some() || column.table() == self.from.ident() {
            return column;
        }
        match self.joins.iter().find(|join| join.owns(&column)) {
            Some(join) => column.with_prefix(join.alias()),
            None => column,
        }
    }

    fn resolve_item(&self, item: Selectable) -> Selectable {
        item.map_columns(&|c| self.resolve_column(c))
    }

    fn resolve_expr(&self, expr: &Expr) -> Expr {
        expr.map_columns(&|c: &Column| self.resolve_column(c.clone()))
    }

    /// Join that projects `column`: the one whose alias qualifies it, else the first
    /// join over the column's table.
    fn join_of(&self, column: &Column) -> Option<&Join> {
        match column.prefix() {
            Some(prefix) => self
                .joins
                .iter()
                .find(|join| join.alias() == prefix && join.owns(column)),
            None => self.joins.iter().find(|join| join.owns(column)),
        }
    }

    /// Nesting key for `join`. Joins sharing one table are keyed by their own alias.
    fn nesting_key(&self, join: &Join, column: &Column) -> String {
        let table = join.join_table().ident();
        let shared = self
            .joins
            .iter()
            .filter(|other| other.join_table().ident().same_table(table))
            .count()
            > 1;
        if shared {
            join.alias().to_string()
        } else {
            column.table().reference_name().to_string()
        }
    }

    fn owner_of(&self, item: &Selectable) -> Owner {
        let Selectable::Column(column) = item else {
            return Owner::Computed;
        };
        if column.prefix().is_none() && column.table() == self.from.ident() {
            return Owner::From;
        }
        match self.join_of(column) {
            Some(join) => Owner::Joined {
                table: join.join_table().clone(),
                key: self.nesting_key(join, column),
            },
            None if column.table() == self.from.ident() => Owner::From,
            None => Owner::Computed,
        }
    }

    /// Alias registry for the current projection: explicit items (or every FROM column),
    /// then the projected fields of each join, in join order.
    pub fn registry(&self) -> AliasRegistry {
        let items: Vec<Selectable> = match &self.projection {
            Some(items) => items.clone(),
            None => self.from.columns().into_iter().map(Selectable::from).collect(),
        };
        let items = items
            .into_iter()
            .map(|item| self.resolve_item(item))
            .chain(
                self.joins
                    .iter()
                    .flat_map(|join| join.fields().iter().cloned().map(Selectable::from)),
            )
            .map(|item| {
                let owner = self.owner_of(&item);
                (item, owner)
            });
        AliasRegistry::from_projection(items)
    }

    fn list(&self, items: &[Selectable]) -> Fragment {
        Fragment::join(
            items
                .iter()
                .map(|item| self.resolve_item(item.clone()).fragment()),
            FragmentKind::Comma,
        )
    }

    // ==================== Execution ====================

    /// Run and keep the alias registry for materialization.
    pub async fn execute(&self, engine: &impl Engine) -> OrmResult<SelectResult> {
        let rows = self.run(engine, true).await?.into_rows();
        Ok(SelectResult::new(self.from.clone(), self.registry(), rows))
    }
}

impl Sealed for Select {}

impl Renderable for Select {
    fn fragment(&self) -> Fragment {
        let filters: Vec<Expr> = self.filters.iter().map(|e| self.resolve_expr(e)).collect();
        let having: Vec<Expr> = self.having.iter().map(|e| self.resolve_expr(e)).collect();

        let group_by = if self.group_by.is_empty() {
            Fragment::empty()
        } else {
            Fragment::wrap("GROUP BY {}", [self.list(&self.group_by)])
        };
        let order_by = if self.order_by.is_empty() {
            Fragment::empty()
        } else {
            let items = self.order_by.iter().map(|item| {
                item.clone()
                    .map_target(|target| self.resolve_item(target))
                    .fragment()
            });
            Fragment::wrap(
                "ORDER BY {}",
                [Fragment::join(items, FragmentKind::Comma)],
            )
        };

        let clauses = [
            Fragment::wrap("SELECT {}", [self.registry().projection()]),
            Fragment::wrap("FROM {}", [self.from.from_fragment()]),
            Fragment::join(self.joins.iter().map(Renderable::fragment), FragmentKind::Plain),
            where_clause("WHERE", &filters),
            group_by,
            where_clause("HAVING", &having),
            order_by,
            self.limit
                .map_or_else(Fragment::empty, |n| Fragment::raw(format!("LIMIT {n}"))),
            self.offset
                .map_or_else(Fragment::empty, |n| Fragment::raw(format!("OFFSET {n}"))),
        ];
        Fragment::join(clauses, FragmentKind::Plain)
    }
}

impl Statement for Select {
    fn build(&self) -> OrmResult<Fragment> {
        Ok(self.fragment())
    }

    fn label(&self) -> &'static str {
        "SELECT"
    }
}

/// Set operator in a [`Compound`] chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    UnionAll,
    Intersect,
}

impl SetOp {
    pub fn keyword(self) -> &'static str {
        match self {
            SetOp::Union => "UNION",
            SetOp::UnionAll => "UNION ALL",
            SetOp::Intersect => "INTERSECT",
        }
    }
}

/// A left-associative chain of set operations: `a UNION b UNION ALL c ...`.
///
/// Rendered flat, without parentheses. Results are materialized with the leftmost
/// statement's alias registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    first: Box<Select>,
    rest: Vec<(SetOp, Select)>,
}

impl Compound {
    pub fn new(first: Select) -> Self {
        Self {
            first: Box::new(first),
            rest: Vec::new(),
        }
    }

    /// Append `other` after `op`. The chain in `other` keeps its own operators.
    fn push(mut self, op: SetOp, other: Compound) -> Self {
        self.rest.push((op, *other.first));
        self.rest.extend(other.rest);
        self
    }

    pub fn union(self, other: impl Into<Compound>, all: bool) -> Self {
        let op = if all { SetOp::UnionAll } else { SetOp::Union };
        self.push(op, other.into())
    }

    pub fn union_all(self, other: impl Into<Compound>) -> Self {
        self.union(other, true)
    }

    pub fn intersect(self, other: impl Into<Compound>) -> Self {
        self.push(SetOp::Intersect, other.into())
    }

    pub fn first(&self) -> &Select {
        &self.first
    }

    pub fn operators(&self) -> impl Iterator<Item = SetOp> + '_ {
        self.rest.iter().map(|(op, _)| *op)
    }

    pub async fn execute(&self, engine: &impl Engine) -> OrmResult<SelectResult> {
        let rows = self.run(engine, true).await?.into_rows();
        Ok(SelectResult::new(
            self.first.table().clone(),
            self.first.registry(),
            rows,
        ))
    }
}

impl From<Select> for Compound {
    fn from(select: Select) -> Self {
        Compound::new(select)
    }
}

impl Sealed for Compound {}

impl Renderable for Compound {
    fn fragment(&self) -> Fragment {
        self.rest
            .iter()
            .fold(self.first.fragment(), |acc, (op, select)| {
                acc.concat_with(Fragment::raw(op.keyword()), " ")
                    .concat_with(select.fragment(), " ")
            })
    }
}

impl Statement for Compound {
    fn build(&self) -> OrmResult<Fragment> {
        Ok(self.fragment())
    }

    fn label(&self) -> &'static str {
        "SELECT"
    }
}

/// `EXISTS` over a SELECT.
///
/// As a condition it renders `EXISTS (...)` via [`Exists::to_expr`]; as a statement it
/// renders `SELECT EXISTS (...)` and executes to a boolean.
#[derive(Debug, Clone, PartialEq)]
pub struct Exists {
    select: Select,
}

impl Exists {
    pub fn select(&self) -> &Select {
        &self.select
    }

    /// Use as a condition inside another statement's WHERE.
    pub fn to_expr(self) -> Expr {
        Expr::Exists(Box::new(self.select))
    }

    pub async fn execute(&self, engine: &impl Engine) -> OrmResult<bool> {
        let rows = self.run(engine, true).await?.into_rows();
        match rows.first().and_then(|row| row.first()) {
            Some(value) => value.as_bool().ok_or_else(|| {
                OrmError::result_lookup(format!("EXISTS returned a non-boolean value: {value:?}"))
            }),
            None => Err(OrmError::result_lookup("EXISTS returned no rows")),
        }
    }
}

impl Sealed for Exists {}

impl Renderable for Exists {
    fn fragment(&self) -> Fragment {
        Fragment::wrap("SELECT EXISTS ({})", [self.select.fragment()])
    }
}

impl Statement for Exists {
    fn build(&self) -> OrmResult<Fragment> {
        Ok(self.fragment())
    }

    fn label(&self) -> &'static str {
        "SELECT"
    }
}
