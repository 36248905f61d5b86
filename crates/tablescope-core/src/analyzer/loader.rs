//! Bulk loading of table metadata for one query

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::error::MetadataError;
use crate::schema::{MetadataCatalog, TableDef, TableName};

/// Tables fetched for one query compilation, plus the ones the catalog did not have
#[derive(Debug, Clone, Default)]
pub struct LoadedTableSet {
    tables: IndexMap<TableName, Arc<TableDef>>,
    not_found: Vec<TableName>,
}

impl LoadedTableSet {
    pub fn get(&self, name: &TableName) -> Option<&Arc<TableDef>> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &TableName) -> bool {
        self.tables.contains_key(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<TableDef>> {
        self.tables.values()
    }

    /// Requested names the catalog returned nothing for, in request order
    pub fn not_found(&self) -> &[TableName] {
        &self.not_found
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Whether any loaded table has a column named by the last segment of `column`
    pub fn any_table_has_column(&self, column: &str) -> bool {
        let column = column.rsplit('.').next().unwrap_or(column);
        self.tables.values().any(|table| table.column_exists(column))
    }

    /// Comma-joined full names of every loaded table
    pub fn loaded_names(&self) -> String {
        self.tables
            .values()
            .map(|table| table.full_name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Fetches all tables of a query from the catalog in a single call
pub struct CatalogBulkLoader<'a> {
    catalog: &'a dyn MetadataCatalog,
}

impl<'a> CatalogBulkLoader<'a> {
    pub fn new(catalog: &'a dyn MetadataCatalog) -> Self {
        Self { catalog }
    }

    /// Load every name in `names`.
    ///
    /// Missing tables end up in [`LoadedTableSet::not_found`]; only a failed
    /// catalog call is an error, and it is not retried.
    pub fn load(&self, names: &IndexSet<TableName>) -> Result<LoadedTableSet, MetadataError> {
        if names.is_empty() {
            return Ok(LoadedTableSet::default());
        }

        debug!(count = names.len(), "loading table metadata");
        let mut fetched = self.catalog.load_tables(names)?;

        let mut tables = IndexMap::with_capacity(fetched.len());
        let mut not_found = Vec::new();
        for name in names {
            match fetched.swap_remove(name) {
                Some(table) => {
                    tables.insert(name.clone(), table);
                }
                None => not_found.push(name.clone()),
            }
        }
        if !not_found.is_empty() {
            debug!(missing = not_found.len(), "tables not found in catalog");
        }

        Ok(LoadedTableSet { tables, not_found })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use crate::schema::{ColumnDef, Database, InMemoryCatalog, TableKind};
    use crate::types::SqlType;

    struct BrokenCatalog;

    impl MetadataCatalog for BrokenCatalog {
        fn load_tables(
            &self,
            _names: &IndexSet<TableName>,
        ) -> Result<IndexMap<TableName, Arc<TableDef>>, CatalogError> {
            Err(CatalogError::Unavailable("connection refused".to_string()))
        }

        fn database(&self, _name: &str) -> Option<&Database> {
            None
        }
    }

    fn catalog() -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_table(
            TableDef::new(TableName::new("db", "people"), TableKind::Hdfs)
                .with_column(ColumnDef::new("name", SqlType::String))
                .with_column(ColumnDef::new(
                    "phones",
                    SqlType::Array(Box::new(SqlType::String)),
                )),
        );
        catalog.add_table(TableDef::new(TableName::new("db", "empty"), TableKind::Hdfs));
        catalog
    }

    #[test]
    fn test_one_call_for_all_tables() {
        let catalog = catalog();
        let names: IndexSet<TableName> = [
            TableName::new("db", "people"),
            TableName::new("db", "ghost"),
            TableName::new("db", "empty"),
        ]
        .into_iter()
        .collect();

        let loaded = CatalogBulkLoader::new(&catalog).load(&names).unwrap();

        assert_eq!(catalog.load_calls(), 1);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.not_found(), &[TableName::new("db", "ghost")]);
        assert_eq!(loaded.loaded_names(), "db.people, db.empty");
    }

    #[test]
    fn test_empty_request_skips_catalog() {
        let catalog = catalog();
        let loaded = CatalogBulkLoader::new(&catalog)
            .load(&IndexSet::new())
            .unwrap();
        assert!(loaded.is_empty());
        assert_eq!(catalog.load_calls(), 0);
    }

    #[test]
    fn test_catalog_failure_propagates() {
        let names: IndexSet<TableName> = [TableName::new("db", "people")].into_iter().collect();
        let err = CatalogBulkLoader::new(&BrokenCatalog).load(&names).unwrap_err();
        assert!(matches!(err, MetadataError::CatalogUnavailable(_)));
    }

    #[test]
    fn test_any_table_has_column_uses_last_segment() {
        let catalog = catalog();
        let names: IndexSet<TableName> = [TableName::new("db", "people")].into_iter().collect();
        let loaded = CatalogBulkLoader::new(&catalog).load(&names).unwrap();

        assert!(loaded.any_table_has_column("PHONES"));
        assert!(loaded.any_table_has_column("x.phones"));
        assert!(!loaded.any_table_has_column("email"));
    }
}
