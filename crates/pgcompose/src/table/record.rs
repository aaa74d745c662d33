use super::Table;
use crate::column::Assignment;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use serde::{Serialize, Serializer};
use serde_json::Map;

/// Values of one row of a table.
///
/// Values passed to [`Record::set`] are validated against the column declaration.
/// Columns never set fall back to their default when the record is inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    table: Table,
    values: Vec<Option<Value>>,
    joined: Vec<(String, Record)>,
    extras: Map<String, serde_json::Value>,
}

impl Record {
    pub fn new(table: &Table) -> Self {
        Self {
            table: table.clone(),
            values: vec![None; table.column_defs().len()],
            joined: Vec::new(),
            extras: Map::new(),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    fn index(&self, column: &str) -> Option<usize> {
        self.table
            .column_defs()
            .iter()
            .position(|def| def.name() == column)
    }

    fn require_index(&self, column: &str) -> OrmResult<usize> {
        self.index(column).ok_or_else(|| {
            OrmError::validation(format!(
                "table {} has no column {column}",
                self.table.name()
            ))
        })
    }

    /// Validate and store a value.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> OrmResult<()> {
        let idx = self.require_index(column)?;
        let value = match self.table.column_defs()[idx].assign(value)? {
            Assignment::Value(v) => v,
            Assignment::Default => Value::Null,
        };
        self.values[idx] = Some(value);
        Ok(())
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> OrmResult<Self> {
        self.set(column, value)?;
        Ok(self)
    }

    /// Value of `column`, if it was set or loaded.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.index(column)
            .and_then(|idx| self.values[idx].as_ref())
    }

    pub fn is_set(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Record of a joined table, by alias or table name.
    pub fn joined(&self, name: &str) -> Option<&Record> {
        self.joined
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, record)| record)
    }

    /// Computed value (aggregate or raw projection) loaded with this record.
    pub fn extra(&self, key: &str) -> Option<&serde_json::Value> {
        self.extras.get(key)
    }

    /// Store a value read from the database, without validation.
    pub(crate) fn put(&mut self, column: &str, value: Value) -> OrmResult<()> {
        let idx = self.index(column).ok_or_else(|| {
            OrmError::result_lookup(format!(
                "result column {column} does not belong to {}",
                self.table.name()
            ))
        })?;
        self.values[idx] = Some(value);
        Ok(())
    }

    pub(crate) fn put_extra(&mut self, key: String, value: serde_json::Value) {
        self.extras.insert(key, value);
    }

    pub(crate) fn joined_mut(&mut self, key: &str, table: &Table) -> &mut Record {
        let pos = match self.joined.iter().position(|(k, _)| k == key) {
            Some(pos) => pos,
            None => {
                self.joined.push((key.to_string(), Record::new(table)));
                self.joined.len() - 1
            }
        };
        &mut self.joined[pos].1
    }

    /// Per-column assignments in declaration order, resolving defaults for unset columns.
    pub(crate) fn assignments(&self) -> OrmResult<Vec<Assignment>> {
        self.table
            .column_defs()
            .iter()
            .zip(&self.values)
            .map(|(def, value)| match value {
                Some(v) => Ok(Assignment::Value(v.clone())),
                None => def.assign_default(),
            })
            .collect()
    }

    /// Set columns, computed values and joined records (under `_{name}`) as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = Map::new();
        for (def, value) in self.table.column_defs().iter().zip(&self.values) {
            if let Some(value) = value {
                map.insert(def.name().to_string(), value.to_json());
            }
        }
        for (key, value) in &self.extras {
            map.insert(key.clone(), value.clone());
        }
        for (key, record) in &self.joined {
            map.insert(format!("_{key}"), record.to_json());
        }
        serde_json::Value::Object(map)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
