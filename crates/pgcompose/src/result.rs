//! Alias registry and result materialization.
//!
//! A SELECT registers every projected item, in projection order, together with the table
//! that owns it. Rows coming back from the engine line up with that order, which is what
//! lets a flat tuple be split back into the primary table's fields and one nested map
//! per joined table.
//!
//! Nested maps are keyed `_{table}` where `table` is the owning table's alias, or its
//! name when unaliased. Items that belong to no table (aggregates, raw fragments) land
//! at the top level under their alias, or their lower-cased function name / SQL text.

use crate::error::{OrmError, OrmResult};
use crate::fragment::{Arg, Fragment, FragmentKind, Renderable};
use crate::statement::Selectable;
use crate::table::{Record, Table};
use crate::value::Value;
use serde::de::DeserializeOwned;
use serde_json::Map;
use std::collections::HashSet;

/// Table a projected item belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum Owner {
    /// The statement's FROM table.
    From,
    /// A joined table; `key` is the reference name used for nesting.
    Joined { table: Table, key: String },
    /// Not a table column.
    Computed,
}

/// One registered projection item.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    token: String,
    item: Selectable,
    owner: Owner,
    synthetic: bool,
}

impl RegistryEntry {
    /// Alias token: the explicit alias, else a synthetic `A{n}`.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn item(&self) -> &Selectable {
        &self.item
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Whether the token was generated rather than supplied.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Field name used in materialized results.
    pub fn key(&self) -> String {
        match &self.item {
            Selectable::Column(c) => c.alias().unwrap_or(c.name()).to_string(),
            Selectable::Aggregate(a) => a.result_key(),
            Selectable::Fragment(f) => f.render(),
        }
    }

    fn explicit_alias(item: &Selectable) -> Option<&str> {
        match item {
            Selectable::Column(c) => c.alias(),
            Selectable::Aggregate(a) => a.alias_name(),
            Selectable::Fragment(_) => None,
        }
    }
}

/// Ordered record of a statement's projection.
///
/// Tokens are stable: building the registry twice from the same projection yields the
/// same tokens in the same order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AliasRegistry {
    entries: Vec<RegistryEntry>,
    disambiguate: bool,
}

impl AliasRegistry {
    /// Register `items` in order.
    ///
    /// Synthetic tokens are emitted into SQL (`AS A{n}`) only when two items would
    /// otherwise produce the same output column name.
    pub fn from_projection(items: impl IntoIterator<Item = (Selectable, Owner)>) -> Self {
        let mut entries = Vec::new();
        let mut next = 0;
        for (item, owner) in items {
            let (token, synthetic) = match RegistryEntry::explicit_alias(&item) {
                Some(alias) => (alias.to_string(), false),
                None => {
                    next += 1;
                    (format!("A{next}"), true)
                }
            };
            entries.push(RegistryEntry {
                token,
                item,
                owner,
                synthetic,
            });
        }

        let mut seen = HashSet::new();
        let disambiguate = !entries.iter().all(|e| seen.insert(e.key()));
        Self {
            entries,
            disambiguate,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn get(&self, token: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.token == token)
    }

    /// Whether synthetic tokens are written into the projection.
    pub fn disambiguates(&self) -> bool {
        self.disambiguate
    }

    /// The select list. An empty registry projects the constant `1`.
    pub fn projection(&self) -> Fragment {
        if self.entries.is_empty() {
            return Fragment::raw("1");
        }
        Fragment::join(
            self.entries.iter().map(|entry| {
                if entry.synthetic && self.disambiguate {
                    Fragment::from_parts(
                        "{} AS {}",
                        vec![Arg::Fragment(entry.item.fragment()), Arg::ident(entry.token.as_str())],
                        Vec::new(),
                    )
                } else {
                    entry.item.projection_fragment()
                }
            }),
            FragmentKind::Comma,
        )
    }

    fn check_row(&self, row: &[Value]) -> OrmResult<()> {
        if row.len() == self.entries.len() {
            Ok(())
        } else {
            Err(OrmError::result_lookup(format!(
                "row has {} column(s) but the statement projects {}",
                row.len(),
                self.entries.len()
            )))
        }
    }
}

/// Rows returned by a SELECT, with what is needed to materialize them.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectResult {
    from: Table,
    registry: AliasRegistry,
    rows: Vec<Vec<Value>>,
}

impl SelectResult {
    pub fn new(from: Table, registry: AliasRegistry, rows: Vec<Vec<Value>>) -> Self {
        Self {
            from,
            registry,
            rows,
        }
    }

    /// Rows exactly as the engine returned them.
    pub fn raw(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn into_raw(self) -> Vec<Vec<Value>> {
        self.rows
    }

    pub fn registry(&self) -> &AliasRegistry {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One JSON object per row, joined tables nested under `_{table}`.
    pub fn as_flat_list(&self) -> OrmResult<Vec<Map<String, serde_json::Value>>> {
        self.rows
            .iter()
            .map(|row| {
                self.registry.check_row(row)?;
                let mut top = Map::new();
                for (entry, value) in self.registry.iter().zip(row) {
                    match &entry.owner {
                        Owner::From | Owner::Computed => {
                            top.insert(entry.key(), value.to_json());
                        }
                        Owner::Joined { key, .. } => {
                            let nested = top
                                .entry(format!("_{key}"))
                                .or_insert_with(|| serde_json::Value::Object(Map::new()));
                            if let serde_json::Value::Object(map) = nested {
                                map.insert(entry.key(), value.to_json());
                            }
                        }
                    }
                }
                Ok(top)
            })
            .collect()
    }

    /// One [`Record`] of the FROM table per row, with a joined record per joined table.
    pub fn as_objects(&self) -> OrmResult<Vec<Record>> {
        self.rows
            .iter()
            .map(|row| {
                self.registry.check_row(row)?;
                let mut record = Record::new(&self.from);
                for (entry, value) in self.registry.iter().zip(row) {
                    match (&entry.owner, &entry.item) {
                        (Owner::From, Selectable::Column(c)) => {
                            record.put(c.name(), value.clone())?;
                        }
                        (Owner::Joined { table, key }, Selectable::Column(c)) => {
                            record.joined_mut(key, table).put(c.name(), value.clone())?;
                        }
                        _ => record.put_extra(entry.key(), value.to_json()),
                    }
                }
                Ok(record)
            })
            .collect()
    }

    /// Deserialize each flat row into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> OrmResult<Vec<T>> {
        self.as_flat_list()?
            .into_iter()
            .map(|map| {
                serde_json::from_value(serde_json::Value::Object(map)).map_err(|e| {
                    OrmError::decode(std::any::type_name::<T>(), e.to_string())
                })
            })
            .collect()
    }
}
