//! Typed column declarations and the column handles used in statements.
//!
//! A [`ColumnDef`] is the immutable schema declaration. A [`Column`] is a cheap handle
//! pairing a declaration with its owning table plus the per-statement `prefix`/`alias`
//! overrides; overriding always returns a copy.

use crate::error::{OrmError, OrmResult};
use crate::expr::{Between, CompareOp, Expr, Filter, FilterTarget, Operand};
use crate::fragment::{Fragment, Renderable, Sealed};
use crate::statement::Select;
use crate::table::TableIdent;
use crate::value::{Value, ValueKind, scalar_to_sql};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;

/// Storage type of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    SmallInt,
    Integer,
    BigInt,
    Numeric {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    Decimal {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    Real,
    DoublePrecision,
    Boolean,
    VarChar {
        max_length: u32,
    },
    Char,
    Text,
    Date,
    Time,
    Timestamp {
        tz: bool,
    },
    Json,
    Jsonb,
    Uuid,
    Bytea,
    Array {
        element: Box<ColumnKind>,
        dimension: Option<u32>,
    },
}

const NUMBER_KINDS: &[ValueKind] = &[
    ValueKind::SmallInt,
    ValueKind::Int,
    ValueKind::BigInt,
    ValueKind::Real,
    ValueKind::Double,
    ValueKind::Numeric,
];

impl ColumnKind {
    /// Array of `element`.
    pub fn array_of(element: ColumnKind) -> Self {
        ColumnKind::Array {
            element: Box::new(element),
            dimension: None,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnKind::SmallInt | ColumnKind::Integer | ColumnKind::BigInt
        )
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            ColumnKind::VarChar { .. } | ColumnKind::Char | ColumnKind::Text
        )
    }

    pub fn is_json(&self) -> bool {
        matches!(self, ColumnKind::Json | ColumnKind::Jsonb)
    }

    /// Storage bounds of integer kinds.
    pub fn integer_bounds(&self) -> Option<(i64, i64)> {
        match self {
            ColumnKind::SmallInt => Some((i64::from(i16::MIN), i64::from(i16::MAX))),
            ColumnKind::Integer => Some((i64::from(i32::MIN), i64::from(i32::MAX))),
            ColumnKind::BigInt => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Value kinds accepted on the right-hand side of comparisons.
    pub fn comparison_types(&self) -> &'static [ValueKind] {
        match self {
            ColumnKind::SmallInt | ColumnKind::Integer | ColumnKind::BigInt => ValueKind::INTEGERS,
            ColumnKind::Numeric { .. }
            | ColumnKind::Decimal { .. }
            | ColumnKind::Real
            | ColumnKind::DoublePrecision => NUMBER_KINDS,
            ColumnKind::Boolean => &[ValueKind::Bool],
            ColumnKind::VarChar { .. } | ColumnKind::Char | ColumnKind::Text => &[ValueKind::Text],
            ColumnKind::Date => &[ValueKind::Date],
            ColumnKind::Time => &[ValueKind::Time],
            ColumnKind::Timestamp { .. } => &[ValueKind::Timestamp, ValueKind::TimestampTz],
            ColumnKind::Json | ColumnKind::Jsonb => &[ValueKind::Json, ValueKind::Text],
            ColumnKind::Uuid => &[ValueKind::Uuid],
            ColumnKind::Bytea => &[ValueKind::Bytes],
            ColumnKind::Array { .. } => &[ValueKind::Array],
        }
    }

    /// Value kinds accepted when assigning.
    pub fn assignable_types(&self) -> &'static [ValueKind] {
        match self {
            ColumnKind::Real | ColumnKind::DoublePrecision => {
                &[ValueKind::SmallInt, ValueKind::Int, ValueKind::Real, ValueKind::Double]
            }
            other => other.comparison_types(),
        }
    }

    /// SQL type name, e.g. `VARCHAR(255)` or `INTEGER[]`.
    pub fn sql_type(&self) -> String {
        fn with_precision(base: &str, precision: Option<u32>, scale: Option<u32>) -> String {
            match (precision, scale) {
                (Some(p), Some(s)) => format!("{base}({p}, {s})"),
                (Some(p), None) => format!("{base}({p})"),
                _ => base.to_string(),
            }
        }

        match self {
            ColumnKind::SmallInt => "SMALLINT".to_string(),
            ColumnKind::Integer => "INTEGER".to_string(),
            ColumnKind::BigInt => "BIGINT".to_string(),
            ColumnKind::Numeric { precision, scale } => with_precision("NUMERIC", *precision, *scale),
            ColumnKind::Decimal { precision, scale } => with_precision("DECIMAL", *precision, *scale),
            ColumnKind::Real => "REAL".to_string(),
            ColumnKind::DoublePrecision => "DOUBLE PRECISION".to_string(),
            ColumnKind::Boolean => "BOOLEAN".to_string(),
            ColumnKind::VarChar { max_length } => format!("VARCHAR({max_length})"),
            ColumnKind::Char => "CHAR(1)".to_string(),
            ColumnKind::Text => "TEXT".to_string(),
            ColumnKind::Date => "DATE".to_string(),
            ColumnKind::Time => "TIME".to_string(),
            ColumnKind::Timestamp { tz: false } => "TIMESTAMP".to_string(),
            ColumnKind::Timestamp { tz: true } => "TIMESTAMPTZ".to_string(),
            ColumnKind::Json => "JSON".to_string(),
            ColumnKind::Jsonb => "JSONB".to_string(),
            ColumnKind::Uuid => "UUID".to_string(),
            ColumnKind::Bytea => "BYTEA".to_string(),
            ColumnKind::Array { element, dimension } => match dimension {
                Some(n) => format!("{}[{n}]", element.sql_type()),
                None => format!("{}[]", element.sql_type()),
            },
        }
    }

    fn check_declaration(&self, column: &str) -> OrmResult<()> {
        match self {
            ColumnKind::Numeric { precision, scale } | ColumnKind::Decimal { precision, scale } => {
                match (precision, scale) {
                    (None, Some(_)) => Err(OrmError::declaration(format!(
                        "column {column}: scale requires precision"
                    ))),
                    (Some(0), _) => Err(OrmError::declaration(format!(
                        "column {column}: precision must be positive"
                    ))),
                    (Some(p), Some(s)) if s > p => Err(OrmError::declaration(format!(
                        "column {column}: scale {s} exceeds precision {p}"
                    ))),
                    _ => Ok(()),
                }
            }
            ColumnKind::VarChar { max_length: 0 } => Err(OrmError::declaration(format!(
                "column {column}: VARCHAR length must be positive"
            ))),
            ColumnKind::Array { element, .. } => {
                if matches!(**element, ColumnKind::Array { .. }) {
                    return Err(OrmError::NestedArray(format!(
                        "column {column}: array elements cannot be arrays"
                    )));
                }
                element.check_declaration(column)
            }
            _ => Ok(()),
        }
    }

    /// Check a non-null value's constraints (length, precision, JSON shape, elements).
    fn check_value(&self, column: &str, value: &Value) -> OrmResult<()> {
        match (self, value) {
            (ColumnKind::VarChar { max_length }, Value::Text(s)) => {
                let len = s.chars().count();
                if len > *max_length as usize {
                    return Err(OrmError::value_validation(format!(
                        "column {column}: length {len} exceeds VARCHAR({max_length})"
                    )));
                }
                Ok(())
            }
            (ColumnKind::Char, Value::Text(s)) if s.chars().count() > 1 => Err(
                OrmError::value_validation(format!("column {column}: CHAR holds a single character")),
            ),
            (
                ColumnKind::Numeric { precision: Some(p), scale } | ColumnKind::Decimal { precision: Some(p), scale },
                Value::Numeric(d),
            ) => check_precision(column, d, *p, scale.unwrap_or(0)),
            (ColumnKind::Json | ColumnKind::Jsonb, Value::Text(s)) => {
                serde_json::from_str::<serde_json::Value>(s)
                    .map(|_| ())
                    .map_err(|e| OrmError::value_validation(format!("column {column}: invalid JSON: {e}")))
            }
            (ColumnKind::Array { element, .. }, Value::Array(items)) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    if !element.assignable_types().contains(&item.kind()) {
                        return Err(OrmError::assignment_type(format!(
                            "column {column}: array element of type {} is not {}",
                            item.kind(),
                            element.sql_type()
                        )));
                    }
                    element.check_value(column, item)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn check_precision(column: &str, d: &Decimal, precision: u32, scale: u32) -> OrmResult<()> {
    if d.scale() > scale {
        return Err(OrmError::value_validation(format!(
            "column {column}: {d} has more than {scale} fractional digit(s)"
        )));
    }
    let integral = d.abs().trunc().to_string();
    let int_digits = if integral == "0" { 0 } else { integral.len() as u32 };
    if int_digits > precision - scale {
        return Err(OrmError::value_validation(format!(
            "column {column}: {d} does not fit NUMERIC({precision}, {scale})"
        )));
    }
    Ok(())
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_type())
    }
}

/// Inclusive numeric bounds enforced on assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePolicy {
    pub min: i64,
    pub max: i64,
}

impl RangePolicy {
    pub fn check(&self, column: &str, value: i64) -> OrmResult<()> {
        if value < self.min || value > self.max {
            return Err(OrmError::value_validation(format!(
                "column {column}: {value} is outside [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Marks a column as filled by a database sequence (`SERIAL` family).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AutoIncrement {
    /// Explicit sequence name; `None` means the implicit `<table>_<column>_seq`.
    pub sequence: Option<String>,
}

/// Client-side default applied when a column is not supplied.
#[derive(Clone)]
pub enum DefaultValue {
    Static(Value),
    Generated(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn resolve(&self) -> Value {
        match self {
            DefaultValue::Static(v) => v.clone(),
            DefaultValue::Generated(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Static(v) => f.debug_tuple("Static").field(v).finish(),
            DefaultValue::Generated(_) => f.write_str("Generated(..)"),
        }
    }
}

/// What an INSERT/UPDATE should write for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Value(Value),
    /// Emit the SQL `DEFAULT` keyword.
    Default,
}

/// Immutable column declaration.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    name: String,
    kind: ColumnKind,
    nullable: bool,
    primary_key: bool,
    unique: bool,
    default: Option<DefaultValue>,
    database_default: Option<String>,
    range: Option<RangePolicy>,
    auto_increment: Option<AutoIncrement>,
    explicit_bounds: bool,
}

macro_rules! kind_constructors {
    ($($fn_name:ident => $kind:expr),* $(,)?) => {
        $(
            pub fn $fn_name(name: impl Into<String>) -> Self {
                Self::new(name, $kind)
            }
        )*
    };
}

impl ColumnDef {
    /// Declare a nullable column of `kind`.
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        let range = kind
            .integer_bounds()
            .map(|(min, max)| RangePolicy { min, max });
        Self {
            name: name.into(),
            kind,
            nullable: true,
            primary_key: false,
            unique: false,
            default: None,
            database_default: None,
            range,
            auto_increment: None,
            explicit_bounds: false,
        }
    }

    kind_constructors! {
        smallint => ColumnKind::SmallInt,
        integer => ColumnKind::Integer,
        bigint => ColumnKind::BigInt,
        real => ColumnKind::Real,
        double => ColumnKind::DoublePrecision,
        boolean => ColumnKind::Boolean,
        char => ColumnKind::Char,
        text => ColumnKind::Text,
        date => ColumnKind::Date,
        time => ColumnKind::Time,
        timestamp => ColumnKind::Timestamp { tz: false },
        timestamptz => ColumnKind::Timestamp { tz: true },
        json => ColumnKind::Json,
        jsonb => ColumnKind::Jsonb,
        uuid => ColumnKind::Uuid,
        bytea => ColumnKind::Bytea,
    }

    pub fn small_serial(name: impl Into<String>) -> Self {
        Self::smallint(name).auto_increment(AutoIncrement::default())
    }

    pub fn serial(name: impl Into<String>) -> Self {
        Self::integer(name).auto_increment(AutoIncrement::default())
    }

    pub fn big_serial(name: impl Into<String>) -> Self {
        Self::bigint(name).auto_increment(AutoIncrement::default())
    }

    pub fn numeric(name: impl Into<String>, precision: Option<u32>, scale: Option<u32>) -> Self {
        Self::new(name, ColumnKind::Numeric { precision, scale })
    }

    pub fn decimal(name: impl Into<String>, precision: Option<u32>, scale: Option<u32>) -> Self {
        Self::new(name, ColumnKind::Decimal { precision, scale })
    }

    pub fn varchar(name: impl Into<String>, max_length: u32) -> Self {
        Self::new(name, ColumnKind::VarChar { max_length })
    }

    pub fn array(name: impl Into<String>, element: ColumnKind) -> Self {
        Self::new(name, ColumnKind::array_of(element))
    }

    /// Mark the column `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Mark as primary key (implies `NOT NULL`).
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Static client-side default.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Static(value.into()));
        self
    }

    /// Default computed each time a row is built (e.g. `Uuid::new_v4`).
    pub fn generated_default(mut self, f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(DefaultValue::Generated(Arc::new(f)));
        self
    }

    /// Raw SQL default evaluated by the database (`now()`, `gen_random_uuid()`, ...).
    pub fn database_default(mut self, sql: impl Into<String>) -> Self {
        self.database_default = Some(sql.into());
        self
    }

    /// Lower bound for integer columns.
    pub fn min(mut self, min: i64) -> Self {
        if let Some(range) = self.range.as_mut() {
            range.min = min;
        } else {
            self.range = Some(RangePolicy { min, max: i64::MAX });
        }
        self.explicit_bounds = true;
        self
    }

    /// Upper bound for integer columns.
    pub fn max(mut self, max: i64) -> Self {
        if let Some(range) = self.range.as_mut() {
            range.max = max;
        } else {
            self.range = Some(RangePolicy { min: i64::MIN, max });
        }
        self.explicit_bounds = true;
        self
    }

    pub fn auto_increment(mut self, policy: AutoIncrement) -> Self {
        self.auto_increment = Some(policy);
        self.nullable = false;
        self
    }

    /// Fixed dimension for array columns.
    pub fn dimension(mut self, n: u32) -> Self {
        if let ColumnKind::Array { dimension, .. } = &mut self.kind {
            *dimension = Some(n);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn database_default_sql(&self) -> Option<&str> {
        self.database_default.as_deref()
    }

    pub fn range(&self) -> Option<&RangePolicy> {
        self.range.as_ref()
    }

    pub fn auto_increment_policy(&self) -> Option<&AutoIncrement> {
        self.auto_increment.as_ref()
    }

    /// Whether the database fills this column when it is omitted.
    pub fn has_database_default(&self) -> bool {
        self.database_default.is_some() || self.auto_increment.is_some()
    }

    pub fn sql_type(&self) -> String {
        match (&self.auto_increment, &self.kind) {
            (Some(_), ColumnKind::SmallInt) => "SMALLSERIAL".to_string(),
            (Some(_), ColumnKind::Integer) => "SERIAL".to_string(),
            (Some(_), ColumnKind::BigInt) => "BIGSERIAL".to_string(),
            (_, kind) => kind.sql_type(),
        }
    }

    /// SQL text of the default: a formatted literal or the database expression.
    pub fn default_sql(&self) -> Option<String> {
        if let Some(sql) = &self.database_default {
            return Some(sql.clone());
        }
        match &self.default {
            Some(DefaultValue::Static(v)) => Some(scalar_to_sql(v)),
            _ => None,
        }
    }

    /// Column definition as it would appear in `CREATE TABLE`.
    pub fn definition(&self) -> String {
        let mut out = format!("{} {}", self.name, self.sql_type());
        if self.primary_key {
            out.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            out.push_str(" NOT NULL");
        }
        if self.unique {
            out.push_str(" UNIQUE");
        }
        if let Some(default) = self.default_sql() {
            out.push_str(" DEFAULT ");
            out.push_str(&default);
        }
        out
    }

    /// Validate the declaration and normalize the default. Called by the table builder.
    pub(crate) fn prepare(mut self) -> OrmResult<Self> {
        let name = self.name.clone();
        self.kind.check_declaration(&name)?;

        if self.default.is_some() && self.database_default.is_some() {
            return Err(OrmError::declaration(format!(
                "column {name}: default and database_default are mutually exclusive"
            )));
        }
        if self.auto_increment.is_some() && (self.default.is_some() || self.database_default.is_some()) {
            return Err(OrmError::declaration(format!(
                "column {name}: auto-increment columns cannot declare a default"
            )));
        }
        if self.explicit_bounds {
            let Some((lo, hi)) = self.kind.integer_bounds() else {
                return Err(OrmError::declaration(format!(
                    "column {name}: min/max apply to integer columns only"
                )));
            };
            if let Some(range) = &self.range {
                if range.min < lo || range.max > hi {
                    return Err(OrmError::declaration(format!(
                        "column {name}: bounds [{}, {}] exceed {} range [{lo}, {hi}]",
                        range.min,
                        range.max,
                        self.kind.sql_type()
                    )));
                }
                if range.min > range.max {
                    return Err(OrmError::declaration(format!(
                        "column {name}: min {} is greater than max {}",
                        range.min, range.max
                    )));
                }
            }
        }

        self.default = match self.default.take() {
            Some(DefaultValue::Static(value)) if value.is_null() => {
                if !self.nullable {
                    return Err(OrmError::declaration(format!(
                        "column {name}: NULL default on a NOT NULL column"
                    )));
                }
                Some(DefaultValue::Static(value))
            }
            Some(DefaultValue::Static(value)) => {
                let prepared = self.check_value(value).map_err(|e| {
                    OrmError::declaration(format!("column {name}: invalid default: {e}"))
                })?;
                Some(DefaultValue::Static(prepared))
            }
            other => other,
        };
        Ok(self)
    }

    /// Type-check and validate a non-null value, returning its normalized form.
    fn check_value(&self, value: Value) -> OrmResult<Value> {
        if !self.kind.assignable_types().contains(&value.kind()) {
            return Err(OrmError::assignment_type(format!(
                "column {} ({}) cannot be assigned a value of type {}",
                self.name,
                self.kind.sql_type(),
                value.kind()
            )));
        }
        if let (Some(range), Some(n)) = (&self.range, value.as_i64()) {
            range.check(&self.name, n)?;
        }
        self.kind.check_value(&self.name, &value)?;
        match (&self.kind, value) {
            (kind, Value::Text(s)) if kind.is_json() => serde_json::from_str(&s)
                .map(Value::Json)
                .map_err(|e| OrmError::value_validation(format!("column {}: invalid JSON: {e}", self.name))),
            (_, value) => Ok(value),
        }
    }

    /// Validate an explicitly supplied value.
    pub fn assign(&self, value: impl Into<Value>) -> OrmResult<Assignment> {
        let value = value.into();
        if value.is_null() {
            if !self.nullable {
                return Err(OrmError::value_validation(format!(
                    "column {} is NOT NULL",
                    self.name
                )));
            }
            return Ok(Assignment::Value(Value::Null));
        }
        self.check_value(value).map(Assignment::Value)
    }

    /// Resolve the value for a column that was not supplied.
    pub fn assign_default(&self) -> OrmResult<Assignment> {
        if let Some(default) = &self.default {
            return match default {
                DefaultValue::Static(v) => Ok(Assignment::Value(v.clone())),
                DefaultValue::Generated(_) => self.assign(default.resolve()),
            };
        }
        if self.has_database_default() {
            return Ok(Assignment::Default);
        }
        if self.nullable {
            return Ok(Assignment::Value(Value::Null));
        }
        Err(OrmError::value_validation(format!(
            "column {} is NOT NULL and has no default",
            self.name
        )))
    }
}

/// A column bound to a (possibly aliased) table, as used inside statements.
#[derive(Debug, Clone)]
pub struct Column {
    def: Arc<ColumnDef>,
    table: Arc<TableIdent>,
    prefix: Option<String>,
    alias: Option<String>,
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.def.name == other.def.name && self.table == other.table
    }
}

impl Eq for Column {}

impl Column {
    pub(crate) fn new(def: Arc<ColumnDef>, table: Arc<TableIdent>) -> Self {
        Self {
            def,
            table,
            prefix: None,
            alias: None,
        }
    }

    /// Original (declared) column name.
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn def(&self) -> &ColumnDef {
        &self.def
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.def.kind
    }

    pub fn table(&self) -> &TableIdent {
        &self.table
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Copy with a result-column alias.
    pub fn with_alias(&self, alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..self.clone()
        }
    }

    /// Copy qualified by `prefix` instead of the table name.
    pub fn with_prefix(&self, prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..self.clone()
        }
    }

    /// `prefix`, else the table alias, else the table name.
    pub fn qualifier(&self) -> &str {
        self.prefix
            .as_deref()
            .or(self.table.alias())
            .unwrap_or(self.table.name())
    }

    /// `qualifier.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.qualifier(), self.def.name)
    }

    /// `qualifier.name[ AS alias]`, as used in projections.
    pub fn render_qualified_name(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {alias}", self.qualified_name()),
            None => self.qualified_name(),
        }
    }

    /// Projection fragment, including the `AS alias` suffix.
    pub fn projection_fragment(&self) -> Fragment {
        Fragment::raw(self.render_qualified_name())
    }

    pub fn assign(&self, value: impl Into<Value>) -> OrmResult<Assignment> {
        self.def.assign(value)
    }

    pub fn assign_default(&self) -> OrmResult<Assignment> {
        self.def.assign_default()
    }

    fn check_operand(&self, op: CompareOp, operand: &Operand) -> OrmResult<()> {
        let accepted = self.def.kind.comparison_types();
        let check = |v: &Value| -> OrmResult<()> {
            if accepted.contains(&v.kind()) {
                Ok(())
            } else {
                Err(OrmError::comparison_type(format!(
                    "column {} ({}) cannot be compared with a value of type {} using {}",
                    self.qualified_name(),
                    self.def.kind.sql_type(),
                    v.kind(),
                    op.keyword()
                )))
            }
        };

        match operand {
            Operand::Value(Value::Array(items)) if op.is_membership() => {
                items.iter().filter(|v| !v.is_null()).try_for_each(check)
            }
            Operand::Value(_) | Operand::Empty if op.is_membership() => {
                Err(OrmError::FilterComparison(format!(
                    "{} on {} needs a list of values or a subquery",
                    op.keyword(),
                    self.qualified_name()
                )))
            }
            Operand::Value(v) => check(v),
            Operand::Any(inner) | Operand::All(inner) => match inner.as_ref() {
                Operand::Value(Value::Array(items)) => {
                    items.iter().filter(|v| !v.is_null()).try_for_each(check)
                }
                _ => Ok(()),
            },
            Operand::Empty if !op.is_unary() => Err(OrmError::FilterComparison(format!(
                "{} on {} needs a right-hand operand",
                op.keyword(),
                self.qualified_name()
            ))),
            _ => Ok(()),
        }
    }

    /// Build a comparison. Comparing with NULL through `Eq`/`Ne` yields `IS [NOT] NULL`.
    pub fn compare(&self, op: CompareOp, operand: impl Into<Operand>) -> OrmResult<Expr> {
        let operand = operand.into();
        if let Operand::Value(Value::Null) = operand {
            return match op {
                CompareOp::Eq | CompareOp::IsNull => Ok(self.is_null()),
                CompareOp::Ne | CompareOp::IsNotNull => Ok(self.is_not_null()),
                other => Err(OrmError::comparison_type(format!(
                    "{} cannot be compared with NULL using {}",
                    self.qualified_name(),
                    other.keyword()
                ))),
            };
        }
        if op.is_like() && !self.def.kind.is_string() {
            return Err(OrmError::comparison_type(format!(
                "{} is only supported on string columns, {} is {}",
                op.keyword(),
                self.qualified_name(),
                self.def.kind.sql_type()
            )));
        }
        if op.is_unary() {
            return Ok(Expr::Filter(Filter::new(
                FilterTarget::Column(self.clone()),
                op,
                Operand::Empty,
            )));
        }
        self.check_operand(op, &operand)?;
        Ok(Expr::Filter(Filter::new(
            FilterTarget::Column(self.clone()),
            op,
            operand,
        )))
    }

    pub fn eq(&self, operand: impl Into<Operand>) -> OrmResult<Expr> {
        self.compare(CompareOp::Eq, operand)
    }

    pub fn ne(&self, operand: impl Into<Operand>) -> OrmResult<Expr> {
        self.compare(CompareOp::Ne, operand)
    }

    pub fn gt(&self, operand: impl Into<Operand>) -> OrmResult<Expr> {
        self.compare(CompareOp::Gt, operand)
    }

    pub fn gte(&self, operand: impl Into<Operand>) -> OrmResult<Expr> {
        self.compare(CompareOp::Gte, operand)
    }

    pub fn lt(&self, operand: impl Into<Operand>) -> OrmResult<Expr> {
        self.compare(CompareOp::Lt, operand)
    }

    pub fn lte(&self, operand: impl Into<Operand>) -> OrmResult<Expr> {
        self.compare(CompareOp::Lte, operand)
    }

    pub fn like(&self, pattern: impl Into<Operand>) -> OrmResult<Expr> {
        self.compare(CompareOp::Like, pattern)
    }

    pub fn ilike(&self, pattern: impl Into<Operand>) -> OrmResult<Expr> {
        self.compare(CompareOp::ILike, pattern)
    }

    pub fn not_like(&self, pattern: impl Into<Operand>) -> OrmResult<Expr> {
        self.compare(CompareOp::NotLike, pattern)
    }

    pub fn not_ilike(&self, pattern: impl Into<Operand>) -> OrmResult<Expr> {
        self.compare(CompareOp::NotILike, pattern)
    }

    /// Membership in a list of values, bound as a single array parameter.
    ///
    /// Renders `column = ANY (array)`; use [`Column::in_subquery`] for `IN (SELECT ...)`.
    pub fn in_<I, V>(&self, values: I) -> OrmResult<Expr>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.compare(CompareOp::In, Operand::Value(Value::Array(items)))
    }

    /// Renders `NOT (column = ANY (array))`.
    pub fn not_in<I, V>(&self, values: I) -> OrmResult<Expr>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let items: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.compare(CompareOp::NotIn, Operand::Value(Value::Array(items)))
    }

    pub fn in_subquery(&self, subquery: Select) -> OrmResult<Expr> {
        self.compare(CompareOp::In, Operand::Subquery(Box::new(subquery)))
    }

    pub fn not_in_subquery(&self, subquery: Select) -> OrmResult<Expr> {
        self.compare(CompareOp::NotIn, Operand::Subquery(Box::new(subquery)))
    }

    /// `BETWEEN low AND high`; each bound may be a value or a column.
    pub fn between(&self, low: impl Into<Operand>, high: impl Into<Operand>) -> OrmResult<Expr> {
        let low = low.into();
        let high = high.into();
        for bound in [&low, &high] {
            match bound {
                Operand::Value(Value::Null) | Operand::Empty => {
                    return Err(OrmError::comparison_type(format!(
                        "BETWEEN bounds of {} must not be NULL",
                        self.qualified_name()
                    )));
                }
                other => self.check_operand(CompareOp::Gte, other)?,
            }
        }
        Ok(Expr::Between(Between::new(self.clone(), low, high)))
    }

    pub fn is_null(&self) -> Expr {
        Expr::Filter(Filter::new(
            FilterTarget::Column(self.clone()),
            CompareOp::IsNull,
            Operand::Empty,
        ))
    }

    pub fn is_not_null(&self) -> Expr {
        Expr::Filter(Filter::new(
            FilterTarget::Column(self.clone()),
            CompareOp::IsNotNull,
            Operand::Empty,
        ))
    }
}

impl Sealed for Column {}

impl Renderable for Column {
    /// Qualified name without the `AS alias` suffix, for use inside expressions.
    fn fragment(&self) -> Fragment {
        Fragment::raw(self.qualified_name())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_qualified_name())
    }
}

#[cfg(test)]
mod tests;
