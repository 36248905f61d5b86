//! Catalog builder - fills an in-memory catalog from DDL or TOML definitions

use serde::Deserialize;
use sqlparser::ast::{ColumnOption, ObjectName, Statement};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::error::{Diagnostic, DiagnosticKind, Severity, Span};
use crate::schema::{ColumnDef, InMemoryCatalog, TableDef, TableKind, TableName};
use crate::types::SqlType;

/// Default database for unqualified DDL names
pub const DEFAULT_DATABASE: &str = "default";

/// Builder for constructing a catalog from definitions
pub struct CatalogBuilder {
    catalog: InMemoryCatalog,
    default_database: String,
    diagnostics: Vec<Diagnostic>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::with_default_database(DEFAULT_DATABASE)
    }

    /// Create a builder placing unqualified tables in `db`
    pub fn with_default_database(db: &str) -> Self {
        Self {
            catalog: InMemoryCatalog::new(),
            default_database: db.to_lowercase(),
            diagnostics: Vec::new(),
        }
    }

    /// Parse `CREATE DATABASE` / `CREATE TABLE` / `CREATE VIEW` statements.
    ///
    /// Tables created through DDL are `hdfs` tables; views get kind `view`.
    pub fn parse_ddl(&mut self, sql: &str) -> Result<(), Vec<Diagnostic>> {
        let dialect = GenericDialect {};

        // Try parsing the entire SQL first (fast path)
        match Parser::parse_sql(&dialect, sql) {
            Ok(statements) => {
                for stmt in statements {
                    self.process_statement(&stmt);
                }
            }
            Err(_) => self.parse_statements_individually(sql),
        }

        self.take_errors()
    }

    /// Parse a TOML catalog definition
    pub fn parse_toml(&mut self, content: &str) -> Result<(), Vec<Diagnostic>> {
        let file: CatalogFile = match toml::from_str(content) {
            Ok(file) => file,
            Err(e) => {
                self.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::InvalidCatalogDefinition,
                        format!("Invalid catalog definition: {}", e.message()),
                    )
                    .with_help("Expected [[databases]] entries with [[databases.tables]]"),
                );
                return self.take_errors();
            }
        };

        for db in file.databases {
            self.catalog.get_or_create_database(&db.name);
            for entry in db.tables {
                let mut table = TableDef::new(TableName::new(&db.name, &entry.name), entry.kind);
                for column in entry.columns {
                    match SqlType::parse(&column.data_type) {
                        Ok(data_type) => {
                            let mut col = ColumnDef::new(&column.name, data_type);
                            col.nullable = column.nullable;
                            table.add_column(col);
                        }
                        Err(e) => self.diagnostics.push(Diagnostic::error(
                            DiagnosticKind::InvalidCatalogDefinition,
                            format!(
                                "Column '{}' of table '{}' has invalid type '{}': {}",
                                column.name, table.name, column.data_type, e
                            ),
                        )),
                    }
                }
                self.catalog.add_table(table);
            }
        }

        self.take_errors()
    }

    /// Drain the warnings collected so far, e.g. after each parsed file
    pub fn take_warnings(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Finish building, returning the catalog and any non-fatal diagnostics
    pub fn build(self) -> (InMemoryCatalog, Vec<Diagnostic>) {
        (self.catalog, self.diagnostics)
    }

    fn take_errors(&mut self) -> Result<(), Vec<Diagnostic>> {
        if self.diagnostics.iter().any(|d| d.severity == Severity::Error) {
            Err(std::mem::take(&mut self.diagnostics))
        } else {
            Ok(())
        }
    }

    /// Parse SQL statements one at a time. Statements that fail to parse
    /// are skipped with a warning.
    fn parse_statements_individually(&mut self, sql: &str) {
        let dialect = GenericDialect {};

        for (offset, raw_stmt) in split_sql_statements(sql) {
            let trimmed = raw_stmt.trim();
            if trimmed.is_empty() {
                continue;
            }

            match Parser::parse_sql(&dialect, trimmed) {
                Ok(stmts) => {
                    for stmt in stmts {
                        self.process_statement(&stmt);
                    }
                }
                Err(e) => {
                    let start = offset + (raw_stmt.len() - raw_stmt.trim_start().len());
                    self.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticKind::InvalidCatalogDefinition,
                            format!("Skipped statement that could not be parsed: {}", e),
                        )
                        .with_span(Span::new(start, trimmed.len())),
                    );
                }
            }
        }
    }

    fn process_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::CreateDatabase { db_name, .. } => {
                let name = db_name
                    .0
                    .last()
                    .map(|i| i.value.clone())
                    .unwrap_or_default();
                self.catalog.get_or_create_database(&name);
            }
            Statement::CreateTable(create) => self.process_create_table(create),
            Statement::CreateView { name, columns, .. } => {
                let mut view = TableDef::new(self.table_name(name), TableKind::View);
                for column in columns {
                    let data_type = column
                        .data_type
                        .as_ref()
                        .map(SqlType::from_ast)
                        .unwrap_or(SqlType::Unknown);
                    view.add_column(ColumnDef::new(&column.name.value, data_type));
                }
                self.catalog.add_table(view);
            }
            _ => {}
        }
    }

    fn process_create_table(&mut self, create: &sqlparser::ast::CreateTable) {
        let mut table = TableDef::new(self.table_name(&create.name), TableKind::Hdfs);

        for column in &create.columns {
            let mut col_def =
                ColumnDef::new(&column.name.value, SqlType::from_ast(&column.data_type));
            for option in &column.options {
                match option.option {
                    ColumnOption::NotNull => col_def.nullable = false,
                    ColumnOption::Null => col_def.nullable = true,
                    _ => {}
                }
            }
            table.add_column(col_def);
        }

        self.catalog.add_table(table);
    }

    fn table_name(&self, name: &ObjectName) -> TableName {
        match name.0.as_slice() {
            [table] => TableName::new(&self.default_database, &table.value),
            [.., db, table] => TableName::new(&db.value, &table.value),
            [] => TableName::new(&self.default_database, name.to_string()),
        }
    }
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    databases: Vec<DatabaseEntry>,
}

#[derive(Debug, Deserialize)]
struct DatabaseEntry {
    name: String,
    #[serde(default)]
    tables: Vec<TableEntry>,
}

#[derive(Debug, Deserialize)]
struct TableEntry {
    name: String,
    #[serde(default = "default_kind")]
    kind: TableKind,
    #[serde(default)]
    columns: Vec<ColumnEntry>,
}

#[derive(Debug, Deserialize)]
struct ColumnEntry {
    name: String,
    #[serde(rename = "type")]
    data_type: String,
    #[serde(default = "default_nullable")]
    nullable: bool,
}

fn default_kind() -> TableKind {
    TableKind::Hdfs
}

fn default_nullable() -> bool {
    true
}

/// Split SQL text on `;`, ignoring semicolons inside quotes and comments.
/// Each piece comes with its byte offset in `sql`.
fn split_sql_statements(sql: &str) -> Vec<(usize, &str)> {
    let mut statements = Vec::new();
    let mut start = 0;
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < len {
                    if bytes[i] == quote {
                        i += 1;
                        if i < len && bytes[i] == quote {
                            i += 1; // doubled quote
                        } else {
                            break;
                        }
                    } else {
                        i += 1;
                    }
                }
            }
            b'-' if i + 1 < len && bytes[i + 1] == b'-' => {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < len {
                    if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            b';' => {
                let stmt = &sql[start..i];
                if !stmt.trim().is_empty() {
                    statements.push((start, stmt));
                }
                start = i + 1;
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    let last = &sql[start..];
    if !last.trim().is_empty() {
        statements.push((start, last));
    }

    statements
}
