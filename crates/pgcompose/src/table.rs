//! Table metadata.
//!
//! Tables are immutable prototypes: [`Table::aliased`] returns a new value sharing the
//! column declarations, so the canonical table is never touched by statements that use
//! it in an aliased or self-join position.

mod record;
mod registry;

pub use record::Record;
pub use registry::TableRegistry;

use crate::column::{Column, ColumnDef};
use crate::error::{OrmError, OrmResult};
use crate::fragment::Fragment;
use crate::statement::{Delete, Insert, Select, Update};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Identity of a table as used by columns: `(schema, name, alias)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdent {
    schema: Option<String>,
    name: String,
    alias: Option<String>,
}

impl TableIdent {
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// `schema.name`, or just `name` without a schema.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Whether both idents refer to the same underlying table, ignoring aliases.
    pub fn same_table(&self, other: &TableIdent) -> bool {
        self.schema == other.schema && self.name == other.name
    }

    /// Name used in SQL to reference this table: the alias, else the table name.
    pub fn reference_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A declared table.
#[derive(Debug, Clone)]
pub struct Table {
    ident: Arc<TableIdent>,
    columns: Arc<Vec<Arc<ColumnDef>>>,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.ident == other.ident
    }
}

impl Eq for Table {}

impl Table {
    /// Start declaring a table.
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
        }
    }

    pub fn ident(&self) -> &TableIdent {
        &self.ident
    }

    pub(crate) fn ident_arc(&self) -> &Arc<TableIdent> {
        &self.ident
    }

    pub fn name(&self) -> &str {
        &self.ident.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.ident.schema.as_deref()
    }

    pub fn alias(&self) -> Option<&str> {
        self.ident.alias.as_deref()
    }

    pub fn qualified_name(&self) -> String {
        self.ident.qualified_name()
    }

    /// A copy of this table under `alias`. Columns taken from it are qualified by the alias.
    pub fn aliased(&self, alias: impl Into<String>) -> Table {
        Table {
            ident: Arc::new(TableIdent {
                alias: Some(alias.into()),
                ..(*self.ident).clone()
            }),
            columns: Arc::clone(&self.columns),
        }
    }

    /// The unaliased table.
    pub fn canonical(&self) -> Table {
        if self.ident.alias.is_none() {
            return self.clone();
        }
        Table {
            ident: Arc::new(TableIdent {
                alias: None,
                ..(*self.ident).clone()
            }),
            columns: Arc::clone(&self.columns),
        }
    }

    pub fn column(&self, name: &str) -> Option<Column> {
        self.columns
            .iter()
            .find(|def| def.name() == name)
            .map(|def| Column::new(Arc::clone(def), Arc::clone(&self.ident)))
    }

    /// Like [`Table::column`], for names known at declaration time.
    ///
    /// # Panics
    ///
    /// Panics if the table has no column called `name`.
    pub fn col(&self, name: &str) -> Column {
        match self.column(name) {
            Some(column) => column,
            None => panic!("table {} has no column {name}", self.name()),
        }
    }

    /// All columns in declaration order.
    pub fn columns(&self) -> Vec<Column> {
        self.columns
            .iter()
            .map(|def| Column::new(Arc::clone(def), Arc::clone(&self.ident)))
            .collect()
    }

    pub fn column_defs(&self) -> &[Arc<ColumnDef>] {
        &self.columns
    }

    pub fn primary_key(&self) -> Option<Column> {
        self.columns()
            .into_iter()
            .find(|c| c.def().is_primary_key())
    }

    /// `FROM`/`JOIN` target: `schema.name[ AS alias]`.
    pub fn from_fragment(&self) -> Fragment {
        match &self.ident.alias {
            Some(alias) => Fragment::raw(format!("{} AS {alias}", self.qualified_name())),
            None => Fragment::raw(self.qualified_name()),
        }
    }

    /// `SELECT` every column of this table.
    pub fn select(&self) -> Select {
        Select::from_table(self)
    }

    pub fn insert(&self) -> Insert {
        Insert::new(self)
    }

    pub fn update(&self) -> Update {
        Update::new(self)
    }

    pub fn delete(&self) -> Delete {
        Delete::new(self)
    }

    /// An empty row of this table.
    pub fn record(&self) -> Record {
        Record::new(self)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.from_fragment().render())
    }
}

/// Builder returned by [`Table::builder`].
#[derive(Debug)]
pub struct TableBuilder {
    name: String,
    schema: Option<String>,
    columns: Vec<ColumnDef>,
}

impl TableBuilder {
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = ColumnDef>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Validate every column declaration and freeze the table.
    pub fn build(self) -> OrmResult<Table> {
        if self.name.trim().is_empty() {
            return Err(OrmError::validation("table name must not be empty"));
        }
        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(self.columns.len());
        for def in self.columns {
            if !seen.insert(def.name().to_string()) {
                return Err(OrmError::declaration(format!(
                    "table {}: duplicate column {}",
                    self.name,
                    def.name()
                )));
            }
            columns.push(Arc::new(def.prepare()?));
        }
        Ok(Table {
            ident: Arc::new(TableIdent {
                schema: self.schema,
                name: self.name,
                alias: None,
            }),
            columns: Arc::new(columns),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnDef;

    fn users() -> Table {
        Table::builder("users")
            .column(ColumnDef::serial("id").primary_key())
            .column(ColumnDef::varchar("name", 50).not_null())
            .build()
            .unwrap()
    }

    #[test]
    fn test_aliasing_is_copy_on_write() {
        let users = users();
        let u = users.aliased("u");

        assert_eq!(users.alias(), None);
        assert_eq!(u.alias(), Some("u"));
        assert_ne!(users, u);
        assert_eq!(u.canonical(), users);

        assert_eq!(users.col("id").qualified_name(), "users.id");
        assert_eq!(u.col("id").qualified_name(), "u.id");
        assert_ne!(users.col("id"), u.col("id"));
    }

    #[test]
    fn test_from_fragment() {
        let users = users();
        assert_eq!(users.from_fragment().render(), "users");
        assert_eq!(users.aliased("u").from_fragment().render(), "users AS u");

        let scoped = Table::builder("orders")
            .schema("shop")
            .column(ColumnDef::integer("id"))
            .build()
            .unwrap();
        assert_eq!(scoped.from_fragment().render(), "shop.orders");
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let err = Table::builder("t")
            .column(ColumnDef::integer("id"))
            .column(ColumnDef::text("id"))
            .build()
            .unwrap_err();
        assert!(err.is_declaration());
    }

    #[test]
    fn test_primary_key_and_lookup() {
        let users = users();
        assert_eq!(users.primary_key().map(|c| c.name().to_string()), Some("id".into()));
        assert!(users.column("missing").is_none());
        assert_eq!(users.columns().len(), 2);
    }

    #[test]
    #[should_panic(expected = "table users has no column missing")]
    fn test_col_panics_on_unknown_name() {
        users().col("missing");
    }
}
