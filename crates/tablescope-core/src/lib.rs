//! tablescope-core: table metadata resolution for SQL queries
//!
//! Collects the tables a query reads from, loads them from a metadata
//! catalog in one call, and builds the per-query schema scope that later
//! analysis runs against.

pub mod analyzer;
pub mod dialect;
pub mod error;
pub mod schema;
pub mod tree;
pub mod types;

pub use analyzer::{Analyzer, MetadataHandler, QueryContext};
pub use dialect::SqlDialect;
pub use error::{CatalogError, Diagnostic, DiagnosticKind, MetadataError, Severity, Span};
pub use schema::{
    CatalogBuilder, ColumnDef, InMemoryCatalog, MetadataCatalog, SchemaScope, TableDef, TableKind,
    TableName,
};
pub use types::SqlType;
