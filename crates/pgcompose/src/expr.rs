//! Boolean and comparison expressions.
//!
//! `AND`/`OR` never add parentheses: `a.or(b).and(c)` renders `a OR b AND c` and SQL's own
//! precedence applies. Use [`Expr::group`] for explicit grouping.

use crate::aggregate::Aggregate;
use crate::column::Column;
use crate::fragment::{Fragment, Renderable, Sealed};
use crate::statement::Select;
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    NotLike,
    NotILike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl CompareOp {
    pub fn keyword(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Like => "LIKE",
            CompareOp::ILike => "ILIKE",
            CompareOp::NotLike => "NOT LIKE",
            CompareOp::NotILike => "NOT ILIKE",
            CompareOp::In => "IN",
            CompareOp::NotIn => "NOT IN",
            CompareOp::IsNull => "IS NULL",
            CompareOp::IsNotNull => "IS NOT NULL",
        }
    }

    fn template(self) -> &'static str {
        match self {
            CompareOp::Eq => "{} = {}",
            CompareOp::Ne => "{} != {}",
            CompareOp::Gt => "{} > {}",
            CompareOp::Gte => "{} >= {}",
            CompareOp::Lt => "{} < {}",
            CompareOp::Lte => "{} <= {}",
            CompareOp::Like => "{} LIKE {}",
            CompareOp::ILike => "{} ILIKE {}",
            CompareOp::NotLike => "{} NOT LIKE {}",
            CompareOp::NotILike => "{} NOT ILIKE {}",
            CompareOp::In => "{} IN ({})",
            CompareOp::NotIn => "{} NOT IN ({})",
            CompareOp::IsNull => "{} IS NULL",
            CompareOp::IsNotNull => "{} IS NOT NULL",
        }
    }

    pub fn is_unary(self) -> bool {
        matches!(self, CompareOp::IsNull | CompareOp::IsNotNull)
    }

    pub fn is_like(self) -> bool {
        matches!(
            self,
            CompareOp::Like | CompareOp::ILike | CompareOp::NotLike | CompareOp::NotILike
        )
    }

    pub fn is_membership(self) -> bool {
        matches!(self, CompareOp::In | CompareOp::NotIn)
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand (unary operators such as `IS NULL`).
    Empty,
    Value(Value),
    Column(Column),
    Subquery(Box<Select>),
    /// `ANY (...)` over a subquery or an array value.
    Any(Box<Operand>),
    /// `ALL (...)` over a subquery or an array value.
    All(Box<Operand>),
    Aggregate(Box<Aggregate>),
    Fragment(Fragment),
}

impl Operand {
    pub fn fragment(&self) -> Fragment {
        match self {
            Operand::Empty => Fragment::empty(),
            Operand::Value(v) => Fragment::param(v.clone()),
            Operand::Column(c) => c.fragment(),
            Operand::Subquery(s) => s.fragment(),
            Operand::Any(inner) => Fragment::wrap("ANY ({})", [inner.fragment()]),
            Operand::All(inner) => Fragment::wrap("ALL ({})", [inner.fragment()]),
            Operand::Aggregate(a) => a.fragment(),
            Operand::Fragment(f) => f.clone(),
        }
    }

    pub fn as_column(&self) -> Option<&Column> {
        match self {
            Operand::Column(c) => Some(c),
            _ => None,
        }
    }

    fn map_columns(&self, f: &impl Fn(&Column) -> Column) -> Operand {
        match self {
            Operand::Column(c) => Operand::Column(f(c)),
            Operand::Any(inner) => Operand::Any(Box::new(inner.map_columns(f))),
            Operand::All(inner) => Operand::All(Box::new(inner.map_columns(f))),
            Operand::Aggregate(a) => {
                Operand::Aggregate(Box::new(a.as_ref().clone().map_columns(&|c: Column| f(&c))))
            }
            other => other.clone(),
        }
    }
}

/// `ANY (subquery)` or `ANY (array)`.
pub fn any(source: impl Into<Operand>) -> Operand {
    Operand::Any(Box::new(source.into()))
}

/// `ALL (subquery)` or `ALL (array)`.
pub fn all(source: impl Into<Operand>) -> Operand {
    Operand::All(Box::new(source.into()))
}

macro_rules! operand_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::Value(Value::from(v))
                }
            }
        )*
    };
}

operand_from_value!(
    bool,
    i16,
    i32,
    i64,
    f32,
    f64,
    Decimal,
    &str,
    String,
    &String,
    Uuid,
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
    DateTime<Utc>,
    serde_json::Value,
);

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Operand {
    fn from(v: Option<T>) -> Self {
        Operand::Value(Value::from(v))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Operand {
    fn from(v: Vec<T>) -> Self {
        Operand::Value(Value::from(v))
    }
}

impl From<Column> for Operand {
    fn from(c: Column) -> Self {
        Operand::Column(c)
    }
}

impl From<&Column> for Operand {
    fn from(c: &Column) -> Self {
        Operand::Column(c.clone())
    }
}

impl From<Select> for Operand {
    fn from(s: Select) -> Self {
        Operand::Subquery(Box::new(s))
    }
}

impl From<Fragment> for Operand {
    fn from(f: Fragment) -> Self {
        Operand::Fragment(f)
    }
}

/// Left-hand side of a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterTarget {
    Column(Column),
    /// An aggregate or scalar function, as compared in HAVING.
    Aggregate(Box<Aggregate>),
}

impl FilterTarget {
    fn fragment(&self) -> Fragment {
        match self {
            FilterTarget::Column(c) => c.fragment(),
            FilterTarget::Aggregate(a) => a.fragment(),
        }
    }
}

/// `left <op> right`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub(crate) left: FilterTarget,
    pub(crate) op: CompareOp,
    pub(crate) right: Operand,
}

impl Filter {
    pub(crate) fn new(left: FilterTarget, op: CompareOp, right: Operand) -> Self {
        Self { left, op, right }
    }

    pub fn left(&self) -> &FilterTarget {
        &self.left
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn right(&self) -> &Operand {
        &self.right
    }
}

impl Sealed for Filter {}

impl Renderable for Filter {
    fn fragment(&self) -> Fragment {
        if self.op.is_unary() {
            Fragment::wrap(self.op.template(), [self.left.fragment()])
        } else {
            let right = match &self.right {
                Operand::Subquery(select) if !self.op.is_membership() => {
                    Fragment::wrap("({})", [select.fragment()])
                }
                other => other.fragment(),
            };
            // A bound list travels as one array parameter, which only `ANY` accepts.
            let template = match (self.op, &self.right) {
                (CompareOp::In, Operand::Value(_)) => "{} = ANY ({})",
                (CompareOp::NotIn, Operand::Value(_)) => "NOT ({} = ANY ({}))",
                (op, _) => op.template(),
            };
            Fragment::wrap(template, [self.left.fragment(), right])
        }
    }
}

/// `column BETWEEN low AND high`.
#[derive(Debug, Clone, PartialEq)]
pub struct Between {
    pub(crate) column: Column,
    pub(crate) low: Operand,
    pub(crate) high: Operand,
}

impl Between {
    pub(crate) fn new(column: Column, low: Operand, high: Operand) -> Self {
        Self { column, low, high }
    }
}

impl Sealed for Between {}

impl Renderable for Between {
    fn fragment(&self) -> Fragment {
        Fragment::wrap(
            "{} BETWEEN {} AND {}",
            [
                self.column.fragment(),
                self.low.fragment(),
                self.high.fragment(),
            ],
        )
    }
}

/// A boolean expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Filter(Filter),
    Between(Between),
    /// Parenthesized sub-expression.
    Group(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Exists(Box<Select>),
    Raw(Fragment),
}

impl Expr {
    /// `self AND other`, without parentheses.
    pub fn and(self, other: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(other))
    }

    /// `self OR other`, without parentheses.
    pub fn or(self, other: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(other))
    }

    /// `NOT expr`
    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Expr {
        Expr::Not(Box::new(expr))
    }

    /// `(expr)`
    pub fn group(expr: Expr) -> Expr {
        Expr::Group(Box::new(expr))
    }

    /// Shorthand for `Expr::group(self)`.
    pub fn grouped(self) -> Expr {
        Expr::group(self)
    }

    /// `EXISTS (subquery)`
    pub fn exists(select: Select) -> Expr {
        select.exists().to_expr()
    }

    /// Pass-through SQL condition.
    pub fn raw(sql: impl Into<String>) -> Expr {
        Expr::Raw(Fragment::raw(sql))
    }

    /// Fold expressions with `AND`; `None` when empty.
    pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        exprs.into_iter().reduce(Expr::and)
    }

    /// Fold expressions with `OR`; `None` when empty.
    pub fn or_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        exprs.into_iter().reduce(Expr::or)
    }

    /// Rebuild the tree with every column operand passed through `f`.
    pub(crate) fn map_columns(&self, f: &impl Fn(&Column) -> Column) -> Expr {
        match self {
            Expr::Filter(filter) => Expr::Filter(Filter {
                left: match &filter.left {
                    FilterTarget::Column(c) => FilterTarget::Column(f(c)),
                    FilterTarget::Aggregate(a) => FilterTarget::Aggregate(Box::new(
                        a.as_ref().clone().map_columns(&|c: Column| f(&c)),
                    )),
                },
                op: filter.op,
                right: filter.right.map_columns(f),
            }),
            Expr::Between(b) => Expr::Between(Between {
                column: f(&b.column),
                low: b.low.map_columns(f),
                high: b.high.map_columns(f),
            }),
            Expr::Group(inner) => Expr::Group(Box::new(inner.map_columns(f))),
            Expr::And(l, r) => Expr::And(Box::new(l.map_columns(f)), Box::new(r.map_columns(f))),
            Expr::Or(l, r) => Expr::Or(Box::new(l.map_columns(f)), Box::new(r.map_columns(f))),
            Expr::Not(inner) => Expr::Not(Box::new(inner.map_columns(f))),
            other => other.clone(),
        }
    }
}

impl Sealed for Expr {}

impl Renderable for Expr {
    fn fragment(&self) -> Fragment {
        match self {
            Expr::Filter(f) => f.fragment(),
            Expr::Between(b) => b.fragment(),
            Expr::Group(inner) => Fragment::wrap("({})", [inner.fragment()]),
            Expr::And(l, r) => Fragment::wrap("{} AND {}", [l.fragment(), r.fragment()]),
            Expr::Or(l, r) => Fragment::wrap("{} OR {}", [l.fragment(), r.fragment()]),
            Expr::Not(inner) => Fragment::wrap("NOT {}", [inner.fragment()]),
            Expr::Exists(select) => Fragment::wrap("EXISTS ({})", [select.fragment()]),
            Expr::Raw(f) => f.clone(),
        }
    }
}
