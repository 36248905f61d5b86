//! Error and diagnostic types

use miette::SourceSpan;
use serde::{Deserialize, Serialize};

use crate::schema::TableKind;

/// Source location span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset from start of source (optional, for miette compatibility)
    pub offset: usize,
    /// Length in bytes
    pub length: usize,
    /// Line number (1-indexed, 0 when unknown)
    pub line: usize,
    /// Column number (1-indexed, 0 when unknown)
    pub column: usize,
}

impl Span {
    pub fn new(offset: usize, length: usize) -> Self {
        Self {
            offset,
            length,
            line: 0,
            column: 0,
        }
    }

    /// Create a span with line and column information
    pub fn with_location(line: usize, column: usize, length: usize) -> Self {
        Self {
            offset: 0,
            length,
            line,
            column,
        }
    }

    /// Create a span covering sqlparser's start..end locations
    pub fn from_sqlparser(span: &sqlparser::tokenizer::Span) -> Self {
        let start = span.start;
        let end = span.end;
        let length = if end.line == start.line && end.column > start.column {
            end.column as usize - start.column as usize
        } else {
            1
        };
        Self::with_location(start.line as usize, start.column as usize, length)
    }

    /// Whether this span carries a line/column location
    pub fn has_location(&self) -> bool {
        self.line > 0
    }

    /// Smallest span covering both `self` and `other` (same line only)
    pub fn union(&self, other: &Span) -> Span {
        if self.line != other.line || !self.has_location() {
            return *self;
        }
        let start = self.column.min(other.column);
        let end = (self.column + self.length).max(other.column + other.length);
        Span::with_location(self.line, start, end - start)
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new(span.offset.into(), span.length)
    }
}

/// Failure reported by a catalog backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum CatalogError {
    #[error("catalog service unavailable: {0}")]
    #[diagnostic(code(tablescope::catalog::unavailable))]
    Unavailable(String),

    #[error("permission denied loading {table}")]
    #[diagnostic(code(tablescope::catalog::permission_denied))]
    PermissionDenied { table: String },

    #[error("internal catalog error: {0}")]
    #[diagnostic(code(tablescope::catalog::internal))]
    Internal(String),
}

/// Fatal error raised while loading metadata for one query compilation.
///
/// A missing table or database is deliberately not represented here: such
/// names are left out of the scope and reported by the caller once the
/// pipeline has finished.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum MetadataError {
    #[error("Failed to load table metadata: {0}")]
    #[diagnostic(
        code(tablescope::catalog_unavailable),
        help("The catalog could not be reached; retry the query once it is available")
    )]
    CatalogUnavailable(#[from] CatalogError),

    #[error("Table {table} has unsupported type {kind}. Only {supported} tables are supported.")]
    #[diagnostic(code(tablescope::unsupported_table_kind))]
    UnsupportedTableKind {
        table: String,
        kind: TableKind,
        supported: String,
    },

    #[error("Complex column {name} not supported.")]
    #[diagnostic(
        code(tablescope::unsupported_complex_reference),
        help("Nested fields of STRUCT, ARRAY and MAP columns cannot be used in FROM")
    )]
    UnsupportedComplexReference { name: String, span: Option<Span> },
}

impl MetadataError {
    /// Diagnostic kind this error is reported as
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            MetadataError::CatalogUnavailable(_) => DiagnosticKind::CatalogUnavailable,
            MetadataError::UnsupportedTableKind { .. } => DiagnosticKind::UnsupportedTableKind,
            MetadataError::UnsupportedComplexReference { .. } => {
                DiagnosticKind::UnsupportedComplexReference
            }
        }
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Diagnostic message produced while checking a query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            span: None,
            help: None,
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            message: message.into(),
            span: None,
            help: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach a span if one is known
    pub fn with_optional_span(mut self, span: Option<Span>) -> Self {
        if span.is_some() {
            self.span = span;
        }
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Get the error code string (e.g., "E0001")
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl From<&MetadataError> for Diagnostic {
    fn from(err: &MetadataError) -> Self {
        let diag = Diagnostic::error(err.kind(), err.to_string());
        match err {
            MetadataError::CatalogUnavailable(_) => {
                diag.with_help(
                    "The catalog could not be reached; retry the query once it is available",
                )
            }
            MetadataError::UnsupportedTableKind { supported, .. } => {
                diag.with_help(format!("Only tables of kind {} can be planned", supported))
            }
            MetadataError::UnsupportedComplexReference { span, .. } => diag
                .with_optional_span(*span)
                .with_help("Nested fields of STRUCT, ARRAY and MAP columns cannot be used in FROM"),
        }
    }
}

/// Types of diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// E0001: Table or database not found
    TableNotFound,
    /// E0002: Table storage kind not supported
    UnsupportedTableKind,
    /// E0003: Nested column path used as a table
    UnsupportedComplexReference,
    /// E0004: Catalog could not serve the request
    CatalogUnavailable,
    /// E0005: Catalog definition could not be loaded
    InvalidCatalogDefinition,
    /// Parse error
    ParseError,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::TableNotFound => "E0001",
            DiagnosticKind::UnsupportedTableKind => "E0002",
            DiagnosticKind::UnsupportedComplexReference => "E0003",
            DiagnosticKind::CatalogUnavailable => "E0004",
            DiagnosticKind::InvalidCatalogDefinition => "E0005",
            DiagnosticKind::ParseError => "E1000",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticKind::TableNotFound => "table-not-found",
            DiagnosticKind::UnsupportedTableKind => "unsupported-table-kind",
            DiagnosticKind::UnsupportedComplexReference => "unsupported-complex-reference",
            DiagnosticKind::CatalogUnavailable => "catalog-unavailable",
            DiagnosticKind::InvalidCatalogDefinition => "invalid-catalog-definition",
            DiagnosticKind::ParseError => "parse-error",
        }
    }
}
