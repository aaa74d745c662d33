//! JOIN resolution: ON-expression validation and alias rewriting.

use crate::column::Column;
use crate::error::{OrmError, OrmResult};
use crate::expr::{Expr, FilterTarget, Operand};
use crate::fragment::{Arg, Fragment, Renderable, Sealed};
use crate::table::{Table, TableIdent};
use std::sync::Arc;

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Join,
    Inner,
    Left,
    Right,
    FullOuter,
}

impl JoinKind {
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Join => "JOIN",
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::FullOuter => "FULL OUTER JOIN",
        }
    }
}

/// A resolved join: its ON expression already carries the join alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    kind: JoinKind,
    from_table: Arc<TableIdent>,
    join_table: Table,
    alias: String,
    on: Expr,
    fields: Vec<Column>,
}

impl Join {
    /// Resolve a join of `join_table` onto `from_table`.
    ///
    /// `alias` defaults to the join table's own alias, then its name. Only the operands
    /// owned by `join_table` are re-qualified with the alias.
    pub fn new(
        kind: JoinKind,
        from_table: &Table,
        join_table: &Table,
        on: Expr,
        alias: Option<&str>,
        fields: impl IntoIterator<Item = Column>,
    ) -> OrmResult<Self> {
        let alias = alias
            .or(join_table.alias())
            .unwrap_or(join_table.name())
            .to_string();
        let resolver = Resolver {
            from: from_table.ident(),
            join: join_table.ident(),
        };

        resolver.validate(&on)?;
        let on = on.map_columns(&|column: &Column| {
            if resolver.owns(column) {
                column.with_prefix(alias.as_str())
            } else {
                column.clone()
            }
        });

        let fields = fields
            .into_iter()
            .map(|column| {
                if resolver.owns(&column) {
                    Ok(column.with_prefix(alias.as_str()))
                } else {
                    Err(OrmError::validation(format!(
                        "joined field {} does not belong to {}",
                        column.qualified_name(),
                        join_table.qualified_name()
                    )))
                }
            })
            .collect::<OrmResult<Vec<_>>>()?;

        Ok(Self {
            kind,
            from_table: Arc::clone(from_table.ident_arc()),
            join_table: join_table.clone(),
            alias,
            on,
            fields,
        })
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn join_table(&self) -> &Table {
        &self.join_table
    }

    pub fn from_table(&self) -> &TableIdent {
        &self.from_table
    }

    /// ON expression after alias rewriting.
    pub fn on(&self) -> &Expr {
        &self.on
    }

    /// Projected join columns, prefixed with the alias.
    pub fn fields(&self) -> &[Column] {
        &self.fields
    }

    /// Whether `column` refers to this join's table.
    pub fn owns(&self, column: &Column) -> bool {
        Resolver {
            from: &self.from_table,
            join: self.join_table.ident(),
        }
        .owns(column)
    }

    pub(crate) fn clear_fields(&mut self) {
        self.fields.clear();
    }
}

impl Sealed for Join {}

impl Renderable for Join {
    fn fragment(&self) -> Fragment {
        Fragment::from_parts(
            "{} {} AS {} ON {}",
            vec![
                Arg::ident(self.kind.keyword()),
                Arg::ident(self.join_table.qualified_name()),
                Arg::ident(self.alias.as_str()),
                Arg::Fragment(self.on.fragment()),
            ],
            Vec::new(),
        )
    }
}

struct Resolver<'a> {
    from: &'a TableIdent,
    join: &'a TableIdent,
}

impl Resolver<'_> {
    /// Identity match, or the canonical form of the join table when this is not a self-join.
    fn owns(&self, column: &Column) -> bool {
        let table = column.table();
        if table == self.join {
            return true;
        }
        table.alias().is_none() && table.same_table(self.join) && !self.from.same_table(self.join)
    }

    fn validate(&self, expr: &Expr) -> OrmResult<()> {
        match expr {
            Expr::Filter(filter) => {
                let FilterTarget::Column(left) = &filter.left else {
                    return Err(OrmError::on_join(
                        "join condition must compare columns, not computed expressions",
                    ));
                };
                match &filter.right {
                    Operand::Column(right) => {
                        if self.owns(left) || self.owns(right) {
                            Ok(())
                        } else {
                            Err(OrmError::on_join(format!(
                                "{} {} {} references neither side of the join on {}",
                                left.qualified_name(),
                                filter.op.keyword(),
                                right.qualified_name(),
                                self.join.qualified_name()
                            )))
                        }
                    }
                    _ if self.owns(left) => Ok(()),
                    _ => Err(OrmError::on_join(format!(
                        "{} is compared with a literal but does not belong to {}",
                        left.qualified_name(),
                        self.join.qualified_name()
                    ))),
                }
            }
            Expr::Between(b) => {
                let bound_owned = [&b.low, &b.high]
                    .into_iter()
                    .filter_map(Operand::as_column)
                    .any(|c| self.owns(c));
                if self.owns(&b.column) || bound_owned {
                    Ok(())
                } else {
                    Err(OrmError::on_join(format!(
                        "BETWEEN on {} does not reference {}",
                        b.column.qualified_name(),
                        self.join.qualified_name()
                    )))
                }
            }
            Expr::Group(inner) | Expr::Not(inner) => self.validate(inner),
            Expr::And(l, r) | Expr::Or(l, r) => {
                self.validate(l)?;
                self.validate(r)
            }
            Expr::Exists(_) | Expr::Raw(_) => Err(OrmError::on_join(
                "join condition must be built from column comparisons",
            )),
        }
    }
}
