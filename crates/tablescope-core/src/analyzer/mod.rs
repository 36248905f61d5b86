//! SQL analyzer module
//!
//! Drives metadata loading for each statement of a SQL text: table names are
//! collected from the query tree, loaded from the catalog in one call, and
//! turned into the scope later analysis runs against.

mod complex;
mod handler;
mod loader;
mod resolver;

use sqlparser::ast::Statement;
use sqlparser::parser::Parser;

use crate::dialect::SqlDialect;
use crate::error::{Diagnostic, DiagnosticKind, Span};
use crate::schema::MetadataCatalog;
use crate::tree::{cte_names, lower_statement, RawNameToken};

pub use complex::{ComplexReferenceClassifier, Verdict};
pub use handler::{MetadataHandler, QueryContext};
pub use loader::{CatalogBulkLoader, LoadedTableSet};
pub use resolver::{NameResolver, TableReferences};

/// SQL Analyzer - loads table metadata for queries against a catalog
pub struct Analyzer<'a> {
    catalog: &'a dyn MetadataCatalog,
    dialect: SqlDialect,
    context: QueryContext,
}

impl<'a> Analyzer<'a> {
    pub fn new(catalog: &'a dyn MetadataCatalog) -> Self {
        Self {
            catalog,
            dialect: SqlDialect::default(),
            context: QueryContext::default(),
        }
    }

    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_context(mut self, context: QueryContext) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    /// Build a metadata handler for every statement.
    ///
    /// Fails with the diagnostics of every statement that could not be
    /// handled; names left unresolved are not errors at this stage.
    pub fn compile(&self, sql: &str) -> Result<Vec<MetadataHandler>, Vec<Diagnostic>> {
        let statements = self.parse(sql)?;

        let mut handlers = Vec::with_capacity(statements.len());
        let mut diagnostics = Vec::new();
        for stmt in &statements {
            match self.handle(stmt) {
                Ok(handler) => handlers.push(handler),
                Err(diag) => diagnostics.push(diag),
            }
        }

        if diagnostics.is_empty() {
            Ok(handlers)
        } else {
            Err(diagnostics)
        }
    }

    /// Analyze a SQL text and return diagnostics
    pub fn analyze(&self, sql: &str) -> Vec<Diagnostic> {
        let statements = match self.parse(sql) {
            Ok(stmts) => stmts,
            Err(diagnostics) => return diagnostics,
        };

        let mut diagnostics = Vec::new();
        for stmt in &statements {
            match self.handle(stmt) {
                Ok(handler) => {
                    let ctes = cte_names(stmt);
                    diagnostics.extend(
                        handler
                            .deferred()
                            .iter()
                            .filter(|token| !self.is_cte_reference(token, &ctes))
                            .map(|token| self.not_found(token)),
                    );
                }
                Err(diag) => diagnostics.push(diag),
            }
        }
        diagnostics
    }

    fn parse(&self, sql: &str) -> Result<Vec<Statement>, Vec<Diagnostic>> {
        let dialect = self.dialect.parser_dialect();
        Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| {
            vec![
                Diagnostic::error(DiagnosticKind::ParseError, format!("Parse error: {}", e))
                    .with_span(Span::new(0, sql.len().min(50))),
            ]
        })
    }

    fn handle(&self, stmt: &Statement) -> Result<MetadataHandler, Diagnostic> {
        let tree = lower_statement(stmt);
        MetadataHandler::new(&tree, self.catalog, &self.context).map_err(|e| Diagnostic::from(&e))
    }

    /// WITH-clause names land in the current database and never load
    fn is_cte_reference(
        &self,
        token: &RawNameToken,
        ctes: &std::collections::HashSet<String>,
    ) -> bool {
        match token.parts().as_slice() {
            [db, table] => *db == self.context.current_database() && ctes.contains(*table),
            _ => false,
        }
    }

    fn not_found(&self, token: &RawNameToken) -> Diagnostic {
        let missing_db = match token.parts().as_slice() {
            [db, _] if self.catalog.database(db).is_none() => Some(db.to_string()),
            _ => None,
        };

        let diag = match missing_db {
            Some(db) => Diagnostic::error(
                DiagnosticKind::TableNotFound,
                format!("Table '{}' not found: database '{}' does not exist", token, db),
            ),
            None => Diagnostic::error(
                DiagnosticKind::TableNotFound,
                format!("Table '{}' not found", token),
            ),
        };
        diag.with_optional_span(token.span())
    }
}
