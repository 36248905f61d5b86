//! Catalog model, catalog definitions and per-query scopes

mod builder;
mod catalog;
mod scope;

pub use builder::{CatalogBuilder, DEFAULT_DATABASE};
pub use catalog::{
    ColumnDef, Database, InMemoryCatalog, MetadataCatalog, TableDef, TableKind, TableName,
};
pub use scope::{DatabaseScope, SchemaScope, ScopeBuilder};
