//! INSERT builder.

use super::Statement;
use crate::column::{Assignment, Column};
use crate::engine::Engine;
use crate::error::{OrmError, OrmResult};
use crate::fragment::{Arg, Fragment, FragmentKind, PARAM_SLOT, Renderable, Sealed};
use crate::table::{Record, Table};
use crate::value::Value;

/// INSERT statement builder.
///
/// Every value is validated against its column when it is added, so a built INSERT
/// only carries assignable values or `DEFAULT`.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    table: Table,
    columns: Vec<Column>,
    rows: Vec<Vec<Assignment>>,
    returning: Option<Column>,
}

impl Insert {
    /// INSERT into every column of `table`, in declaration order.
    pub fn new(table: &Table) -> Self {
        Self {
            table: table.clone(),
            columns: table.columns(),
            rows: Vec::new(),
            returning: None,
        }
    }

    /// Restrict the column list. Must be called before adding rows.
    pub fn columns(mut self, columns: impl IntoIterator<Item = Column>) -> OrmResult<Self> {
        if !self.rows.is_empty() {
            return Err(OrmError::validation(
                "INSERT columns must be chosen before rows are added",
            ));
        }
        let columns: Vec<Column> = columns.into_iter().collect();
        if let Some(foreign) = columns.iter().find(|c| !c.table().same_table(self.table.ident())) {
            return Err(OrmError::validation(format!(
                "column {} does not belong to {}",
                foreign.qualified_name(),
                self.table.qualified_name()
            )));
        }
        self.columns = columns;
        Ok(self)
    }

    /// Add a row of values, one per column.
    ///
    /// `NULL` for a column that declares a default writes the default instead.
    pub fn values<I, V>(mut self, row: I) -> OrmResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = row.into_iter().map(Into::into).collect();
        if values.len() != self.columns.len() {
            return Err(OrmError::validation(format!(
                "INSERT into {} expects {} value(s) per row, got {}",
                self.table.qualified_name(),
                self.columns.len(),
                values.len()
            )));
        }
        let row = self
            .columns
            .iter()
            .zip(values)
            .map(|(column, value)| {
                let def = column.def();
                if value.is_null() && (def.default_value().is_some() || def.has_database_default()) {
                    column.assign_default()
                } else {
                    column.assign(value)
                }
            })
            .collect::<OrmResult<Vec<_>>>()?;
        self.rows.push(row);
        Ok(self)
    }

    /// Add rows from records. Unset columns take their default.
    ///
    /// Resets the column list to every column of the table, which fails when rows were
    /// already added for a narrower column list.
    pub fn records(mut self, records: impl IntoIterator<Item = Record>) -> OrmResult<Self> {
        let all = self.table.columns();
        let narrowed = self.columns.iter().map(Column::name).ne(all.iter().map(Column::name));
        if !self.rows.is_empty() && narrowed {
            let used: Vec<&str> = self.columns.iter().map(Column::name).collect();
            return Err(OrmError::validation(format!(
                "records insert every column of {}, but earlier rows use ({})",
                self.table.qualified_name(),
                used.join(", ")
            )));
        }
        self.columns = all;
        for record in records {
            if !record.table().ident().same_table(self.table.ident()) {
                return Err(OrmError::validation(format!(
                    "record of {} cannot be inserted into {}",
                    record.table().qualified_name(),
                    self.table.qualified_name()
                )));
            }
            self.rows.push(record.assignments()?);
        }
        Ok(self)
    }

    /// `RETURNING column`
    pub fn returning(mut self, column: Column) -> Self {
        self.returning = Some(column);
        self
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row_fragment(row: &[Assignment]) -> Fragment {
        let mut template = String::from("(");
        let mut params = Vec::new();
        for (i, assignment) in row.iter().enumerate() {
            if i > 0 {
                template.push_str(", ");
            }
            match assignment {
                Assignment::Value(v) => {
                    template.push_str(PARAM_SLOT);
                    params.push(v.clone());
                }
                Assignment::Default => template.push_str("DEFAULT"),
            }
        }
        template.push(')');
        Fragment::from_parts(template, Vec::new(), params)
    }

    /// Execute. Returns the `RETURNING` value of each inserted row, or nothing.
    pub async fn execute(&self, engine: &impl Engine) -> OrmResult<Vec<Value>> {
        let fetch = self.returning.is_some();
        let rows = self.run(engine, fetch).await?.into_rows();
        Ok(rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }
}

impl Sealed for Insert {}

impl Renderable for Insert {
    /// Renders even without rows; [`Statement::build`] rejects that case.
    fn fragment(&self) -> Fragment {
        let names = self
            .columns
            .iter()
            .map(|c| c.name().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let rows = Fragment::join(
            self.rows.iter().map(|row| Self::row_fragment(row)),
            FragmentKind::Comma,
        );
        let insert = Fragment::from_parts(
            "INSERT INTO {} ({}) VALUES {}",
            vec![
                Arg::ident(self.table.qualified_name()),
                Arg::ident(names),
                Arg::Fragment(rows),
            ],
            Vec::new(),
        );
        match &self.returning {
            Some(column) => {
                insert.concat_with(Fragment::raw(format!("RETURNING {}", column.name())), " ")
            }
            None => insert,
        }
    }
}

impl Statement for Insert {
    fn build(&self) -> OrmResult<Fragment> {
        if self.rows.is_empty() {
            return Err(OrmError::validation(format!(
                "INSERT into {} has no rows",
                self.table.qualified_name()
            )));
        }
        Ok(self.fragment())
    }

    fn label(&self) -> &'static str {
        "INSERT"
    }
}
