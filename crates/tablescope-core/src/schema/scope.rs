//! Query-specific naming scope: only the databases and tables a query references

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::analyzer::LoadedTableSet;
use crate::error::MetadataError;
use crate::schema::{TableDef, TableKind, TableName};

/// Tables of one database visible to a query
#[derive(Debug, Clone)]
pub struct DatabaseScope {
    name: String,
    tables: IndexMap<String, Arc<TableDef>>,
}

impl DatabaseScope {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self, name: &str) -> Option<&Arc<TableDef>> {
        self.tables.get(&name.to_lowercase())
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &Arc<TableDef>)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Read-only database -> table view handed to validation.
///
/// Only [`ScopeBuilder::finish`] produces one; there are no mutators.
#[derive(Debug, Clone, Default)]
pub struct SchemaScope {
    databases: IndexMap<String, DatabaseScope>,
}

impl SchemaScope {
    /// Build the scope for `references` out of what the bulk load returned.
    ///
    /// References missing from `loaded` are skipped; they were recorded as
    /// not found by the loader. The first table whose kind is not in
    /// `supported` aborts the build.
    pub fn build(
        loaded: &LoadedTableSet,
        references: &IndexSet<TableName>,
        supported: &[TableKind],
    ) -> Result<SchemaScope, MetadataError> {
        let mut builder = ScopeBuilder::new(supported);
        for name in references {
            let Some(table) = loaded.get(name) else {
                continue;
            };
            builder.add_table(name, Arc::clone(table))?;
        }
        Ok(builder.finish())
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseScope> {
        self.databases.get(&name.to_lowercase())
    }

    pub fn databases(&self) -> impl Iterator<Item = &DatabaseScope> {
        self.databases.values()
    }

    /// Look up a table by database and table name (case-insensitive)
    pub fn table(&self, db: &str, table: &str) -> Option<&Arc<TableDef>> {
        self.database(db).and_then(|d| d.table(table))
    }

    /// Resolve a one- or two-part table path, one-part paths against `current_db`
    pub fn lookup(&self, path: &[&str], current_db: &str) -> Option<&Arc<TableDef>> {
        match path {
            [table] => self.table(current_db, table),
            [db, table] => self.table(db, table),
            _ => None,
        }
    }

    /// All tables in scope, qualified
    pub fn table_names(&self) -> Vec<TableName> {
        self.databases
            .values()
            .flat_map(|db| db.tables.keys().map(move |t| TableName::new(&db.name, t)))
            .collect()
    }

    /// Number of tables in scope
    pub fn len(&self) -> usize {
        self.databases.values().map(DatabaseScope::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }
}

/// Accumulates tables per database, then freezes into a [`SchemaScope`]
pub struct ScopeBuilder<'a> {
    supported: &'a [TableKind],
    databases: IndexMap<String, IndexMap<String, Arc<TableDef>>>,
}

impl<'a> ScopeBuilder<'a> {
    pub fn new(supported: &'a [TableKind]) -> Self {
        Self {
            supported,
            databases: IndexMap::new(),
        }
    }

    /// Add a referenced table. Tables of the same database merge into one entry.
    pub fn add_table(
        &mut self,
        name: &TableName,
        table: Arc<TableDef>,
    ) -> Result<(), MetadataError> {
        if !self.supported.contains(&table.kind) {
            return Err(MetadataError::UnsupportedTableKind {
                table: table.full_name(),
                kind: table.kind,
                supported: supported_list(self.supported),
            });
        }
        self.databases
            .entry(name.db().to_string())
            .or_default()
            .insert(name.table().to_string(), table);
        Ok(())
    }

    pub fn finish(self) -> SchemaScope {
        let databases = self
            .databases
            .into_iter()
            .map(|(name, tables)| {
                let scope = DatabaseScope {
                    name: name.clone(),
                    tables,
                };
                (name, scope)
            })
            .collect();
        SchemaScope { databases }
    }
}

fn supported_list(kinds: &[TableKind]) -> String {
    if kinds.is_empty() {
        return "no".to_string();
    }
    kinds
        .iter()
        .map(TableKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
