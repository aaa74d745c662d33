//! Runtime scalar values bound into statements and read back from rows.
//!
//! [`Value`] is what flows through the whole crate: column defaults, filter operands,
//! bound parameters and decoded result cells. It implements tokio-postgres's `ToSql` and
//! `FromSql`, so the engine layer never has to look at driver types beyond this module.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type, to_sql_checked};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

/// A dynamically typed SQL scalar (or array of scalars).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Numeric(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
    Array(Vec<Value>),
}

/// Runtime type tag of a [`Value`], used for comparison and assignment checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    SmallInt,
    Int,
    BigInt,
    Real,
    Double,
    Numeric,
    Text,
    Bytes,
    Uuid,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Json,
    Array,
}

impl ValueKind {
    /// All integer kinds.
    pub const INTEGERS: &'static [ValueKind] =
        &[ValueKind::SmallInt, ValueKind::Int, ValueKind::BigInt];

    /// Whether this kind is one of the integer kinds.
    pub fn is_integer(self) -> bool {
        Self::INTEGERS.contains(&self)
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::SmallInt => "i16",
            ValueKind::Int => "i32",
            ValueKind::BigInt => "i64",
            ValueKind::Real => "f32",
            ValueKind::Double => "f64",
            ValueKind::Numeric => "decimal",
            ValueKind::Text => "text",
            ValueKind::Bytes => "bytes",
            ValueKind::Uuid => "uuid",
            ValueKind::Date => "date",
            ValueKind::Time => "time",
            ValueKind::Timestamp => "timestamp",
            ValueKind::TimestampTz => "timestamptz",
            ValueKind::Json => "json",
            ValueKind::Array => "array",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Runtime type tag.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::SmallInt(_) => ValueKind::SmallInt,
            Value::Int(_) => ValueKind::Int,
            Value::BigInt(_) => ValueKind::BigInt,
            Value::Real(_) => ValueKind::Real,
            Value::Double(_) => ValueKind::Double,
            Value::Numeric(_) => ValueKind::Numeric,
            Value::Text(_) => ValueKind::Text,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Uuid(_) => ValueKind::Uuid,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::Timestamp(_) => ValueKind::Timestamp,
            Value::TimestampTz(_) => ValueKind::TimestampTz,
            Value::Json(_) => ValueKind::Json,
            Value::Array(_) => ValueKind::Array,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer payload widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Any numeric payload as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::Numeric(v) => v.to_f64(),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert into a JSON value for dictionary-style result output.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::Null => J::Null,
            Value::Bool(v) => J::Bool(*v),
            Value::SmallInt(v) => J::from(*v),
            Value::Int(v) => J::from(*v),
            Value::BigInt(v) => J::from(*v),
            Value::Real(v) => J::from(f64::from(*v)),
            Value::Double(v) => J::from(*v),
            Value::Numeric(v) => v.to_f64().map(J::from).unwrap_or(J::Null),
            Value::Text(v) => J::String(v.clone()),
            Value::Bytes(v) => J::from(v.clone()),
            Value::Uuid(v) => J::String(v.to_string()),
            Value::Date(v) => serde_json::to_value(v).unwrap_or(J::Null),
            Value::Time(v) => serde_json::to_value(v).unwrap_or(J::Null),
            Value::Timestamp(v) => serde_json::to_value(v).unwrap_or(J::Null),
            Value::TimestampTz(v) => serde_json::to_value(v).unwrap_or(J::Null),
            Value::Json(v) => v.clone(),
            Value::Array(items) => J::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Format a value as an SQL literal.
///
/// Only used for human-readable rendering and default-value preparation; compiled
/// statements always bind values as parameters instead.
pub fn scalar_to_sql(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::SmallInt(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::BigInt(v) => v.to_string(),
        Value::Real(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Numeric(v) => v.to_string(),
        Value::Text(v) => quote(v),
        Value::Bytes(v) => {
            let hex: String = v.iter().map(|b| format!("{b:02x}")).collect();
            format!("'\\x{hex}'")
        }
        Value::Uuid(v) => quote(&v.to_string()),
        Value::Date(v) => quote(&v.to_string()),
        Value::Time(v) => quote(&v.to_string()),
        Value::Timestamp(v) => quote(&v.to_string()),
        Value::TimestampTz(v) => quote(&v.to_rfc3339()),
        Value::Json(v) => quote(&v.to_string()),
        Value::Array(items) => quote(&array_literal(items)),
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Postgres array literal body, e.g. `{1,2,NULL}` or `{"a","b"}`.
pub(crate) fn array_literal(items: &[Value]) -> String {
    let body: Vec<String> = items
        .iter()
        .map(|item| match item {
            Value::Null => "NULL".to_string(),
            Value::Bool(v) => v.to_string(),
            Value::SmallInt(_)
            | Value::Int(_)
            | Value::BigInt(_)
            | Value::Real(_)
            | Value::Double(_)
            | Value::Numeric(_) => scalar_to_sql(item),
            Value::Array(inner) => array_literal(inner),
            Value::Text(v) => array_quote(v),
            Value::Json(v) => array_quote(&v.to_string()),
            other => array_quote(scalar_to_sql(other).trim_matches('\'')),
        })
        .collect();
    format!("{{{}}}", body.join(","))
}

fn array_quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    f32 => Real,
    f64 => Double,
    Decimal => Numeric,
    String => Text,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

fn int_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        Type::INT8 => v.to_sql(ty, out),
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::FLOAT8 => (v as f64).to_sql(ty, out),
        Type::NUMERIC => Decimal::from(v).to_sql(ty, out),
        _ => v.to_sql_checked(ty, out),
    }
}

fn float_to_sql(v: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (v as f32).to_sql(ty, out),
        Type::NUMERIC => Decimal::try_from(v)?.to_sql(ty, out),
        _ => v.to_sql_checked(ty, out),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql_checked(ty, out),
            Value::SmallInt(v) => int_to_sql(i64::from(*v), ty, out),
            Value::Int(v) => int_to_sql(i64::from(*v), ty, out),
            Value::BigInt(v) => int_to_sql(*v, ty, out),
            Value::Real(v) => float_to_sql(f64::from(*v), ty, out),
            Value::Double(v) => float_to_sql(*v, ty, out),
            Value::Numeric(v) => v.to_sql_checked(ty, out),
            Value::Text(v) => match *ty {
                Type::JSON | Type::JSONB => {
                    serde_json::from_str::<serde_json::Value>(v)?.to_sql(ty, out)
                }
                _ => v.to_sql_checked(ty, out),
            },
            Value::Bytes(v) => v.to_sql_checked(ty, out),
            Value::Uuid(v) => v.to_sql_checked(ty, out),
            Value::Date(v) => v.to_sql_checked(ty, out),
            Value::Time(v) => v.to_sql_checked(ty, out),
            Value::Timestamp(v) => v.to_sql_checked(ty, out),
            Value::TimestampTz(v) => v.to_sql_checked(ty, out),
            Value::Json(v) => v.to_sql_checked(ty, out),
            Value::Array(items) => items.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::SmallInt(i16::from_sql(ty, raw)?),
            Type::INT4 => Value::Int(i32::from_sql(ty, raw)?),
            Type::INT8 => Value::BigInt(i64::from_sql(ty, raw)?),
            Type::FLOAT4 => Value::Real(f32::from_sql(ty, raw)?),
            Type::FLOAT8 => Value::Double(f64::from_sql(ty, raw)?),
            Type::NUMERIC => Value::Numeric(Decimal::from_sql(ty, raw)?),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                Value::Text(String::from_sql(ty, raw)?)
            }
            Type::BYTEA => Value::Bytes(Vec::<u8>::from_sql(ty, raw)?),
            Type::UUID => Value::Uuid(Uuid::from_sql(ty, raw)?),
            Type::DATE => Value::Date(NaiveDate::from_sql(ty, raw)?),
            Type::TIME => Value::Time(NaiveTime::from_sql(ty, raw)?),
            Type::TIMESTAMP => Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?),
            Type::TIMESTAMPTZ => Value::TimestampTz(DateTime::<Utc>::from_sql(ty, raw)?),
            Type::JSON | Type::JSONB => Value::Json(serde_json::Value::from_sql(ty, raw)?),
            _ => match ty.kind() {
                Kind::Array(_) => Value::Array(Vec::<Value>::from_sql(ty, raw)?),
                _ => return Err(format!("unsupported column type {ty}").into()),
            },
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Value::Null)
    }

    fn accepts(ty: &Type) -> bool {
        match *ty {
            Type::BOOL
            | Type::INT2
            | Type::INT4
            | Type::INT8
            | Type::FLOAT4
            | Type::FLOAT8
            | Type::NUMERIC
            | Type::TEXT
            | Type::VARCHAR
            | Type::BPCHAR
            | Type::NAME
            | Type::UNKNOWN
            | Type::BYTEA
            | Type::UUID
            | Type::DATE
            | Type::TIME
            | Type::TIMESTAMP
            | Type::TIMESTAMPTZ
            | Type::JSON
            | Type::JSONB => true,
            _ => match ty.kind() {
                Kind::Array(member) => <Value as FromSql>::accepts(member),
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_to_sql() {
        assert_eq!(scalar_to_sql(&Value::Null), "NULL");
        assert_eq!(scalar_to_sql(&Value::from(42)), "42");
        assert_eq!(scalar_to_sql(&Value::from(true)), "TRUE");
        assert_eq!(scalar_to_sql(&Value::from("it's")), "'it''s'");
        assert_eq!(
            scalar_to_sql(&Value::from(serde_json::json!({"a": 1}))),
            "'{\"a\":1}'"
        );
    }

    #[test]
    fn test_array_literal() {
        assert_eq!(scalar_to_sql(&Value::from(vec![1, 2, 3])), "'{1,2,3}'");
        assert_eq!(
            scalar_to_sql(&Value::from(vec!["a", "b\"c"])),
            "'{\"a\",\"b\\\"c\"}'"
        );
        let nested = Value::Array(vec![Value::from(vec![1]), Value::Null]);
        assert_eq!(scalar_to_sql(&nested), "'{{1},NULL}'");
    }

    #[test]
    fn test_from_option_and_kind() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(5i64)).kind(), ValueKind::BigInt);
        assert!(ValueKind::Int.is_integer());
        assert!(!ValueKind::Double.is_integer());
        assert_eq!(Value::from(7i16).as_i64(), Some(7));
    }

    #[test]
    fn test_to_json() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(Value::from(date).to_json(), serde_json::json!("2024-05-01"));
        assert_eq!(
            Value::from(vec![1, 2]).to_json(),
            serde_json::json!([1, 2])
        );
        assert_eq!(Value::Null.to_json(), serde_json::Value::Null);
    }
}
