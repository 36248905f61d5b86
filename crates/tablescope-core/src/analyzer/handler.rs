//! Metadata handler - loads the tables of one query and builds its scope

use indexmap::IndexSet;
use tracing::debug;

use super::complex::ComplexReferenceClassifier;
use super::loader::{CatalogBulkLoader, LoadedTableSet};
use super::resolver::{NameResolver, TableReferences};
use crate::error::MetadataError;
use crate::schema::{MetadataCatalog, SchemaScope, TableKind, TableName, DEFAULT_DATABASE};
use crate::tree::{QueryNode, RawNameToken};

/// Per-compilation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    current_database: String,
    supported_kinds: Vec<TableKind>,
}

impl QueryContext {
    pub fn new(current_database: impl AsRef<str>) -> Self {
        Self {
            current_database: current_database.as_ref().to_lowercase(),
            ..Self::default()
        }
    }

    pub fn with_supported_kinds(mut self, kinds: Vec<TableKind>) -> Self {
        self.supported_kinds = kinds;
        self
    }

    /// Database that one-part table names resolve against, lower-cased
    pub fn current_database(&self) -> &str {
        &self.current_database
    }

    /// Storage kinds the planner accepts
    pub fn supported_kinds(&self) -> &[TableKind] {
        &self.supported_kinds
    }
}

impl Default for QueryContext {
    fn default() -> Self {
        Self {
            current_database: DEFAULT_DATABASE.to_string(),
            supported_kinds: vec![TableKind::Hdfs],
        }
    }
}

/// Result of loading metadata for one query.
///
/// Built once by [`MetadataHandler::new`]; the scope and table cache are
/// never modified afterwards.
#[derive(Debug)]
pub struct MetadataHandler {
    references: TableReferences,
    table_cache: LoadedTableSet,
    scope: SchemaScope,
    deferred: Vec<RawNameToken>,
}

impl MetadataHandler {
    /// Resolve, load, build the scope, then classify what did not resolve.
    pub fn new(
        root: &QueryNode,
        catalog: &dyn MetadataCatalog,
        ctx: &QueryContext,
    ) -> Result<Self, MetadataError> {
        let references = NameResolver::new(ctx.current_database()).resolve(root);

        let table_cache = CatalogBulkLoader::new(catalog).load(references.names())?;

        // Needs loaded tables: the scope exposes their columns for validation
        let scope = SchemaScope::build(&table_cache, references.names(), ctx.supported_kinds())?;

        let unresolved: Vec<RawNameToken> = references
            .malformed()
            .iter()
            .cloned()
            .chain(table_cache.not_found().iter().map(|name| {
                RawNameToken::new(name.to_string()).with_span(references.span_of(name))
            }))
            .collect();
        let deferred = ComplexReferenceClassifier::new(catalog, ctx.current_database())
            .check(&unresolved, &table_cache)?;

        let handler = Self {
            references,
            table_cache,
            scope,
            deferred,
        };
        handler.log_debug();
        Ok(handler)
    }

    /// Scope restricted to the tables this query references
    pub fn scope(&self) -> &SchemaScope {
        &self.scope
    }

    /// Tables loaded for this query
    pub fn table_cache(&self) -> &LoadedTableSet {
        &self.table_cache
    }

    /// Every well-formed table name the query references
    pub fn table_names(&self) -> &IndexSet<TableName> {
        self.references.names()
    }

    pub fn references(&self) -> &TableReferences {
        &self.references
    }

    /// Names that resolved to nothing and were not complex columns.
    /// Validation reports these as missing tables.
    pub fn deferred(&self) -> &[RawNameToken] {
        &self.deferred
    }

    pub fn log_debug(&self) {
        debug!("Loaded tables: {}", self.table_cache.loaded_names());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, InMemoryCatalog, TableDef};
    use crate::types::SqlType;

    fn catalog() -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_table(
            TableDef::new(TableName::new("default", "t"), TableKind::Hdfs)
                .with_column(ColumnDef::new("id", SqlType::Int)),
        );
        catalog.add_table(
            TableDef::new(TableName::new("default", "k"), TableKind::Kudu)
                .with_column(ColumnDef::new("id", SqlType::Int)),
        );
        catalog
    }

    #[test]
    fn test_context_defaults() {
        let ctx = QueryContext::default();
        assert_eq!(ctx.current_database(), "default");
        assert_eq!(ctx.supported_kinds(), &[TableKind::Hdfs]);
        assert_eq!(QueryContext::new("Sales").current_database(), "sales");
    }

    #[test]
    fn test_pipeline_defers_missing_tables() {
        let catalog = catalog();
        let tree = QueryNode::select(
            Some(QueryNode::join(QueryNode::ident("t"), QueryNode::ident("missing"))),
            vec![],
        );
        let handler = MetadataHandler::new(&tree, &catalog, &QueryContext::default()).unwrap();

        assert_eq!(handler.scope().len(), 1);
        assert_eq!(handler.table_cache().len(), 1);
        assert_eq!(handler.table_names().len(), 2);
        assert_eq!(handler.deferred().len(), 1);
        assert_eq!(handler.deferred()[0].text(), "default.missing");
    }

    #[test]
    fn test_supported_kinds_are_configurable() {
        let catalog = catalog();
        let tree = QueryNode::select(Some(QueryNode::ident("k")), vec![]);

        let err = MetadataHandler::new(&tree, &catalog, &QueryContext::default()).unwrap_err();
        assert!(matches!(err, MetadataError::UnsupportedTableKind { .. }));

        let ctx =
            QueryContext::default().with_supported_kinds(vec![TableKind::Hdfs, TableKind::Kudu]);
        let handler = MetadataHandler::new(&tree, &catalog, &ctx).unwrap();
        assert!(handler.scope().table("default", "k").is_some());
    }
}
