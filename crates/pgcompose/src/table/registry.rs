use super::Table;
use crate::error::{OrmError, OrmResult};
use std::collections::HashMap;

/// Explicit collection of declared tables, looked up by `(schema, name)`.
///
/// Tables are kept in registration order. Register canonical (unaliased) tables only;
/// aliases are a per-statement concern.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: Vec<Table>,
    index: HashMap<(Option<String>, String), usize>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. A second table with the same schema and name is rejected.
    pub fn register(&mut self, table: Table) -> OrmResult<()> {
        let table = table.canonical();
        let key = (table.schema().map(str::to_string), table.name().to_string());
        if self.index.contains_key(&key) {
            return Err(OrmError::validation(format!(
                "table {} is already registered",
                table.qualified_name()
            )));
        }
        self.index.insert(key, self.tables.len());
        self.tables.push(table);
        Ok(())
    }

    /// Get a table by schema and name.
    pub fn get(&self, schema: Option<&str>, name: &str) -> Option<&Table> {
        self.index
            .get(&(schema.map(str::to_string), name.to_string()))
            .map(|&idx| &self.tables[idx])
    }

    /// Find a table by name in any schema, preferring one without a schema.
    pub fn find(&self, name: &str) -> Option<&Table> {
        self.get(None, name)
            .or_else(|| self.tables.iter().find(|t| t.name() == name))
    }

    pub fn contains(&self, schema: Option<&str>, name: &str) -> bool {
        self.get(schema, name).is_some()
    }

    /// All tables in registration order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnDef;

    fn table(schema: Option<&str>, name: &str) -> Table {
        let mut builder = Table::builder(name).column(ColumnDef::serial("id"));
        if let Some(schema) = schema {
            builder = builder.schema(schema);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = TableRegistry::new();
        registry.register(table(None, "users")).unwrap();
        registry.register(table(Some("shop"), "orders")).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(None, "users"));
        assert!(registry.contains(Some("shop"), "orders"));
        assert!(!registry.contains(None, "orders"));
        assert_eq!(registry.find("orders").map(|t| t.qualified_name()), Some("shop.orders".into()));

        let names: Vec<_> = registry.tables().map(|t| t.name().to_string()).collect();
        assert_eq!(names, ["users", "orders"]);
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let mut registry = TableRegistry::new();
        registry.register(table(None, "users")).unwrap();
        let err = registry.register(table(None, "users").aliased("u")).unwrap_err();
        assert!(matches!(err, OrmError::Validation(_)));

        // Same name in another schema is a different table.
        registry.register(table(Some("audit"), "users")).unwrap();
        assert_eq!(registry.len(), 2);
    }
}
