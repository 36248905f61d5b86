//! Catalog model - databases, tables and columns as served by the metadata service

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::types::SqlType;

/// Fully qualified table name, normalized to lower case.
///
/// Two names that differ only in case are the same table, so the fields are
/// only reachable through the normalizing constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName {
    db: String,
    table: String,
}

impl TableName {
    pub fn new(db: impl AsRef<str>, table: impl AsRef<str>) -> Self {
        Self {
            db: db.as_ref().to_lowercase(),
            table: table.as_ref().to_lowercase(),
        }
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db, self.table)
    }
}

/// Storage kind of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Hdfs,
    Kudu,
    Hbase,
    Iceberg,
    View,
    DataSource,
    System,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Hdfs => "hdfs",
            TableKind::Kudu => "kudu",
            TableKind::Hbase => "hbase",
            TableKind::Iceberg => "iceberg",
            TableKind::View => "view",
            TableKind::DataSource => "data_source",
            TableKind::System => "system",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hdfs" => Ok(TableKind::Hdfs),
            "kudu" => Ok(TableKind::Kudu),
            "hbase" => Ok(TableKind::Hbase),
            "iceberg" => Ok(TableKind::Iceberg),
            "view" => Ok(TableKind::View),
            "data_source" | "datasource" => Ok(TableKind::DataSource),
            "system" => Ok(TableKind::System),
            _ => Err(format!(
                "Unknown table kind: '{}'. Expected one of: \
                 hdfs, kudu, hbase, iceberg, view, data_source, system.",
                s
            )),
        }
    }
}

/// Table metadata handle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    pub name: TableName,
    pub kind: TableKind,
    pub columns: IndexMap<String, ColumnDef>,
}

impl TableDef {
    pub fn new(name: TableName, kind: TableKind) -> Self {
        Self {
            name,
            kind,
            columns: IndexMap::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDef) -> Self {
        self.add_column(column);
        self
    }

    pub fn add_column(&mut self, column: ColumnDef) {
        self.columns.insert(column.name.clone(), column);
    }

    /// Get a column by name
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        // Case-insensitive lookup
        self.columns
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Check if a column exists
    pub fn column_exists(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// Get all column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(|s| s.as_str()).collect()
    }

    /// Fully qualified display name (`db.table`)
    pub fn full_name(&self) -> String {
        self.name.to_string()
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: SqlType,
    pub nullable: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: SqlType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A database (namespace of tables)
#[derive(Debug, Clone, Default)]
pub struct Database {
    pub name: String,
    pub tables: IndexMap<String, Arc<TableDef>>,
}

impl Database {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().to_lowercase(),
            tables: IndexMap::new(),
        }
    }

    /// Look up a table by name (case-insensitive)
    pub fn table(&self, name: &str) -> Option<&Arc<TableDef>> {
        self.tables.get(&name.to_lowercase())
    }
}

/// Source of table metadata.
///
/// Implementations may be remote and are shared between concurrent query
/// compilations, hence `Send + Sync`. Caching and retries are the
/// implementation's business.
pub trait MetadataCatalog: Send + Sync {
    /// Fetch every requested table in one call. Tables that do not exist are
    /// absent from the returned map; only a failure of the call itself is an
    /// error.
    fn load_tables(
        &self,
        names: &IndexSet<TableName>,
    ) -> Result<IndexMap<TableName, Arc<TableDef>>, CatalogError>;

    /// Look up a database by name
    fn database(&self, name: &str) -> Option<&Database>;
}

/// Catalog held entirely in process memory
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    databases: IndexMap<String, Database>,
    load_calls: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a database
    pub fn get_or_create_database(&mut self, name: &str) -> &mut Database {
        self.databases
            .entry(name.to_lowercase())
            .or_insert_with(|| Database::new(name))
    }

    /// Add a table, creating its database on first use
    pub fn add_table(&mut self, table: TableDef) {
        let db = self.get_or_create_database(table.name.db());
        db.tables
            .insert(table.name.table().to_string(), Arc::new(table));
    }

    pub fn databases(&self) -> impl Iterator<Item = &Database> {
        self.databases.values()
    }

    /// Look up a table by name
    pub fn get_table(&self, name: &TableName) -> Option<&Arc<TableDef>> {
        self.databases
            .get(name.db())
            .and_then(|db| db.table(name.table()))
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &TableName) -> bool {
        self.get_table(name).is_some()
    }

    /// Number of `load_tables` calls served so far
    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::Relaxed)
    }
}

impl MetadataCatalog for InMemoryCatalog {
    fn load_tables(
        &self,
        names: &IndexSet<TableName>,
    ) -> Result<IndexMap<TableName, Arc<TableDef>>, CatalogError> {
        self.load_calls.fetch_add(1, Ordering::Relaxed);
        Ok(names
            .iter()
            .filter_map(|name| {
                self.database(name.db())
                    .and_then(|db| db.table(name.table()))
                    .map(|table| (name.clone(), Arc::clone(table)))
            })
            .collect())
    }

    fn database(&self, name: &str) -> Option<&Database> {
        self.databases.get(&name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> TableDef {
        TableDef::new(TableName::new("Sales", "Orders"), TableKind::Hdfs)
            .with_column(ColumnDef::new("id", SqlType::BigInt).not_null())
            .with_column(ColumnDef::new("Total", SqlType::Double))
    }

    #[test]
    fn test_table_name_normalizes_case() {
        let a = TableName::new("Db", "Tbl");
        let b = TableName::new("DB", "TBL");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "db.tbl");
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        let table = orders();
        assert!(table.column_exists("total"));
        assert!(table.column_exists("ID"));
        assert!(!table.column_exists("missing"));
        assert_eq!(table.full_name(), "sales.orders");
    }

    #[test]
    fn test_table_kind_from_str() {
        assert_eq!("KUDU".parse::<TableKind>().unwrap(), TableKind::Kudu);
        assert!("parquet".parse::<TableKind>().is_err());
    }

    #[test]
    fn test_load_tables_skips_missing() {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_table(orders());

        let names: IndexSet<TableName> = [
            TableName::new("sales", "orders"),
            TableName::new("sales", "ghost"),
            TableName::new("nowhere", "orders"),
        ]
        .into_iter()
        .collect();
        let loaded = catalog.load_tables(&names).unwrap();

        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key(&TableName::new("sales", "orders")));
        assert_eq!(catalog.load_calls(), 1);
        assert!(catalog.database("SALES").is_some());
    }
}
