//! Aggregate and general-purpose SQL functions usable in projections, GROUP BY,
//! HAVING and ORDER BY.

use crate::column::Column;
use crate::expr::{CompareOp, Expr, Filter, FilterTarget, Operand};
use crate::fragment::{Arg, Fragment, FragmentKind, Renderable, Sealed};
use crate::statement::{OrderBy, Selectable};
use crate::value::{Value, ValueKind, scalar_to_sql};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Function name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    Coalesce,
    Avg,
    ArrayAgg,
    Sum,
    StringAgg,
    Max,
    Min,
    Greatest,
    Least,
}

impl AggFunc {
    pub fn name(self) -> &'static str {
        match self {
            AggFunc::Count => "COUNT",
            AggFunc::Coalesce => "COALESCE",
            AggFunc::Avg => "AVG",
            AggFunc::ArrayAgg => "ARRAY_AGG",
            AggFunc::Sum => "SUM",
            AggFunc::StringAgg => "STRING_AGG",
            AggFunc::Max => "MAX",
            AggFunc::Min => "MIN",
            AggFunc::Greatest => "GREATEST",
            AggFunc::Least => "LEAST",
        }
    }

    fn casts_params(self) -> bool {
        matches!(self, AggFunc::ArrayAgg | AggFunc::StringAgg)
    }
}

/// Function argument: a selectable expression or a literal bound as a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum FuncArg {
    Item(Selectable),
    Value(Value),
}

macro_rules! func_arg_from_item {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FuncArg {
                fn from(item: $ty) -> Self {
                    FuncArg::Item(Selectable::from(item))
                }
            }
        )*
    };
}

func_arg_from_item!(Column, &Column, Aggregate, Fragment);

impl From<Selectable> for FuncArg {
    fn from(item: Selectable) -> Self {
        FuncArg::Item(item)
    }
}

/// Wrap a literal as a function argument.
pub fn lit(value: impl Into<Value>) -> FuncArg {
    FuncArg::Value(value.into())
}

/// SQL type used to cast literal parameters inside `ARRAY_AGG`/`STRING_AGG`.
fn cast_type(kind: ValueKind) -> Option<&'static str> {
    match kind {
        ValueKind::Bool => Some("BOOLEAN"),
        ValueKind::SmallInt => Some("SMALLINT"),
        ValueKind::Int => Some("INTEGER"),
        ValueKind::BigInt => Some("BIGINT"),
        ValueKind::Real => Some("REAL"),
        ValueKind::Double => Some("DOUBLE PRECISION"),
        ValueKind::Numeric => Some("NUMERIC"),
        ValueKind::Text => Some("TEXT"),
        ValueKind::Bytes => Some("BYTEA"),
        ValueKind::Uuid => Some("UUID"),
        ValueKind::Date => Some("DATE"),
        ValueKind::Time => Some("TIME"),
        ValueKind::Timestamp => Some("TIMESTAMP"),
        ValueKind::TimestampTz => Some("TIMESTAMPTZ"),
        ValueKind::Json => Some("JSONB"),
        ValueKind::Null | ValueKind::Array => None,
    }
}

/// A function call such as `COUNT(users.id) AS total`.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    func: AggFunc,
    args: Vec<FuncArg>,
    alias: Option<String>,
    separator: Option<String>,
    order_by: Vec<OrderBy>,
}

impl Aggregate {
    pub fn new(func: AggFunc, args: impl IntoIterator<Item = FuncArg>) -> Self {
        Self {
            func,
            args: args.into_iter().collect(),
            alias: None,
            separator: None,
            order_by: Vec::new(),
        }
    }

    pub fn count(arg: impl Into<FuncArg>) -> Self {
        Self::new(AggFunc::Count, [arg.into()])
    }

    /// `COUNT(*)`
    pub fn count_all() -> Self {
        Self::new(AggFunc::Count, [FuncArg::Item(Fragment::raw("*").into())])
    }

    pub fn coalesce(args: impl IntoIterator<Item = FuncArg>) -> Self {
        Self::new(AggFunc::Coalesce, args)
    }

    pub fn avg(arg: impl Into<FuncArg>) -> Self {
        Self::new(AggFunc::Avg, [arg.into()])
    }

    pub fn array_agg(arg: impl Into<FuncArg>) -> Self {
        Self::new(AggFunc::ArrayAgg, [arg.into()])
    }

    pub fn sum(arg: impl Into<FuncArg>) -> Self {
        Self::new(AggFunc::Sum, [arg.into()])
    }

    pub fn string_agg(arg: impl Into<FuncArg>, separator: impl Into<String>) -> Self {
        let mut agg = Self::new(AggFunc::StringAgg, [arg.into()]);
        agg.separator = Some(separator.into());
        agg
    }

    pub fn max(arg: impl Into<FuncArg>) -> Self {
        Self::new(AggFunc::Max, [arg.into()])
    }

    pub fn min(arg: impl Into<FuncArg>) -> Self {
        Self::new(AggFunc::Min, [arg.into()])
    }

    pub fn greatest(args: impl IntoIterator<Item = FuncArg>) -> Self {
        Self::new(AggFunc::Greatest, args)
    }

    pub fn least(args: impl IntoIterator<Item = FuncArg>) -> Self {
        Self::new(AggFunc::Least, args)
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// ORDER BY inside `ARRAY_AGG`/`STRING_AGG`. Ignored by other functions.
    pub fn order_by(mut self, item: impl Into<OrderBy>) -> Self {
        self.order_by.push(item.into());
        self
    }

    pub fn func(&self) -> AggFunc {
        self.func
    }

    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Key used for this function in materialized results.
    pub fn result_key(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| self.func.name().to_lowercase())
    }

    /// Columns referenced by the arguments.
    pub fn columns(&self) -> Vec<&Column> {
        self.args
            .iter()
            .filter_map(|arg| match arg {
                FuncArg::Item(item) => item.as_column(),
                FuncArg::Value(_) => None,
            })
            .collect()
    }

    pub(crate) fn map_columns(self, f: &impl Fn(Column) -> Column) -> Self {
        Self {
            args: self
                .args
                .into_iter()
                .map(|arg| match arg {
                    FuncArg::Item(item) => FuncArg::Item(item.map_columns(f)),
                    value => value,
                })
                .collect(),
            order_by: self
                .order_by
                .into_iter()
                .map(|item| item.map_target(|target| target.map_columns(f)))
                .collect(),
            ..self
        }
    }

    fn arg_fragment(&self, arg: &FuncArg) -> Fragment {
        match arg {
            FuncArg::Item(item) => item.fragment(),
            FuncArg::Value(value) => match cast_type(value.kind()) {
                Some(ty) if self.func.casts_params() => Fragment::from_parts(
                    format!("{{?}}::{ty}"),
                    Vec::new(),
                    vec![value.clone()],
                ),
                _ => Fragment::param(value.clone()),
            },
        }
    }

    /// Projection form with `AS alias`.
    pub fn projection_fragment(&self) -> Fragment {
        match &self.alias {
            Some(alias) => Fragment::from_parts(
                "{} AS {}",
                vec![Arg::Fragment(self.fragment()), Arg::ident(alias.as_str())],
                Vec::new(),
            ),
            None => self.fragment(),
        }
    }

    fn compare(&self, op: CompareOp, operand: impl Into<Operand>) -> Expr {
        let operand = operand.into();
        let op = match (&operand, op) {
            (Operand::Value(Value::Null), CompareOp::Eq) => CompareOp::IsNull,
            (Operand::Value(Value::Null), CompareOp::Ne) => CompareOp::IsNotNull,
            (_, op) => op,
        };
        let operand = if op.is_unary() { Operand::Empty } else { operand };
        Expr::Filter(Filter::new(
            FilterTarget::Aggregate(Box::new(self.clone())),
            op,
            operand,
        ))
    }

    pub fn eq(&self, operand: impl Into<Operand>) -> Expr {
        self.compare(CompareOp::Eq, operand)
    }

    pub fn ne(&self, operand: impl Into<Operand>) -> Expr {
        self.compare(CompareOp::Ne, operand)
    }

    pub fn gt(&self, operand: impl Into<Operand>) -> Expr {
        self.compare(CompareOp::Gt, operand)
    }

    pub fn gte(&self, operand: impl Into<Operand>) -> Expr {
        self.compare(CompareOp::Gte, operand)
    }

    pub fn lt(&self, operand: impl Into<Operand>) -> Expr {
        self.compare(CompareOp::Lt, operand)
    }

    pub fn lte(&self, operand: impl Into<Operand>) -> Expr {
        self.compare(CompareOp::Lte, operand)
    }
}

impl Sealed for Aggregate {}

impl Renderable for Aggregate {
    /// `FUNC(args[, separator][ ORDER BY ...])` without the alias.
    fn fragment(&self) -> Fragment {
        let mut inner = Fragment::join(
            self.args.iter().map(|arg| self.arg_fragment(arg)),
            FragmentKind::Comma,
        );
        if let Some(separator) = &self.separator {
            inner = inner.concat_with(
                Fragment::raw(scalar_to_sql(&Value::from(separator.as_str()))),
                ", ",
            );
        }
        if self.func.casts_params() && !self.order_by.is_empty() {
            let order = Fragment::join(
                self.order_by.iter().map(Renderable::fragment),
                FragmentKind::Comma,
            );
            inner = inner.concat_with(Fragment::wrap("ORDER BY {}", [order]), " ");
        }
        Fragment::from_parts(
            "{}({})",
            vec![Arg::ident(self.func.name()), Arg::Fragment(inner)],
            Vec::new(),
        )
    }
}

impl From<Aggregate> for Operand {
    fn from(a: Aggregate) -> Self {
        Operand::Aggregate(Box::new(a))
    }
}

macro_rules! func_arg_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FuncArg {
                fn from(v: $ty) -> Self {
                    FuncArg::Value(Value::from(v))
                }
            }
        )*
    };
}

func_arg_from_value!(
    Value,
    bool,
    i16,
    i32,
    i64,
    f32,
    f64,
    Decimal,
    &str,
    String,
    Uuid,
    NaiveDate,
    NaiveTime,
    NaiveDateTime,
    DateTime<Utc>,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnDef;
    use crate::table::Table;

    fn orders() -> Table {
        Table::builder("orders")
            .column(ColumnDef::serial("id").primary_key())
            .column(ColumnDef::text("status"))
            .column(ColumnDef::integer("total"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_simple_aggregates() {
        let orders = orders();
        assert_eq!(
            Aggregate::count(orders.col("id")).fragment().render(),
            "COUNT(orders.id)"
        );
        assert_eq!(Aggregate::count_all().fragment().render(), "COUNT(*)");
        assert_eq!(
            Aggregate::sum(orders.col("total"))
                .alias("revenue")
                .projection_fragment()
                .render(),
            "SUM(orders.total) AS revenue"
        );
        assert_eq!(
            Aggregate::max(orders.col("total")).result_key(),
            "max"
        );
    }

    #[test]
    fn test_coalesce_binds_literals() {
        let orders = orders();
        let coalesce = Aggregate::coalesce([orders.col("status").into(), lit("unknown")]);
        let compiled = coalesce.fragment().compile();
        assert_eq!(compiled.sql, "COALESCE(orders.status, %s)");
        assert_eq!(compiled.params, vec![Value::from("unknown")]);
    }

    #[test]
    fn test_string_agg_with_order() {
        let orders = orders();
        let agg = Aggregate::string_agg(orders.col("status"), ",")
            .order_by(OrderBy::new(orders.col("id")).desc());
        assert_eq!(
            agg.fragment().render(),
            "STRING_AGG(orders.status, ',' ORDER BY orders.id DESC)"
        );
    }

    #[test]
    fn test_array_agg_casts_literal_params() {
        let agg = Aggregate::array_agg(lit("x"));
        assert_eq!(agg.fragment().compile().sql, "ARRAY_AGG(%s::TEXT)");
    }

    #[test]
    fn test_nested_functions() {
        let orders = orders();
        let agg = Aggregate::greatest([Aggregate::max(orders.col("total")).into(), lit(0)]);
        let compiled = agg.fragment().compile();
        assert_eq!(compiled.sql, "GREATEST(MAX(orders.total), %s)");
        assert_eq!(compiled.params, vec![Value::Int(0)]);
    }

    #[test]
    fn test_having_comparisons() {
        let orders = orders();
        let expr = Aggregate::count(orders.col("id")).gt(5);
        let compiled = expr.fragment().compile();
        assert_eq!(compiled.sql, "COUNT(orders.id) > %s");
        assert_eq!(
            Aggregate::max(orders.col("total"))
                .eq(None::<i32>)
                .fragment()
                .render(),
            "MAX(orders.total) IS NULL"
        );
    }
}
