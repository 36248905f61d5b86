//! tablescope CLI - resolve SQL table references against a metadata catalog

mod args;
mod config;
mod output;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tablescope_core::analyzer::NameResolver;
use tablescope_core::schema::{CatalogBuilder, InMemoryCatalog};
use tablescope_core::tree::lower_statement;
use tablescope_core::{Analyzer, Severity, SqlDialect};
use tracing_subscriber::EnvFilter;

use crate::args::{Args, Command, OutputFormat};
use crate::config::{CheckOverrides, Config};
use crate::output::OutputFormatter;

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();

    match run(args) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let quiet = args.quiet;
    match args.command {
        Command::Check {
            files,
            catalog,
            database,
            dialect,
            supported_kinds,
            format,
            config: config_path,
            disable,
        } => {
            let config = if let Some(path) = config_path {
                Config::from_file(&path)?
            } else {
                Config::find_and_load()?.unwrap_or_default()
            };

            // CLI takes precedence
            let config = config.merge_with_args(&CheckOverrides {
                catalog: &catalog,
                files: &files,
                database: database.as_deref(),
                dialect: dialect.as_deref(),
                supported_kinds: &supported_kinds,
                format,
                disable: &disable,
            });

            let dialect = config.dialect()?;
            let context = config.query_context()?;
            let output_format = config.output_format();

            let catalog_files = expand_patterns(&config.catalog)?;
            if catalog_files.is_empty() {
                miette::bail!(
                    "No catalog files specified. Use --catalog or configure in tablescope.toml"
                );
            }

            let Some((catalog, catalog_warnings)) = load_catalog(
                &catalog_files,
                context.current_database(),
                output_format,
                quiet,
            )?
            else {
                return Ok(true);
            };

            let query_files = expand_patterns(&config.files)?;
            if query_files.is_empty() {
                miette::bail!(
                    "No query files specified. Use positional arguments or configure in tablescope.toml"
                );
            }

            let analyzer = Analyzer::new(&catalog)
                .with_dialect(dialect)
                .with_context(context);
            let disabled_rules: HashSet<String> = config.disable.iter().cloned().collect();

            let mut total_errors = 0;
            let mut total_warnings = catalog_warnings;
            for query_file in &query_files {
                let content = fs::read_to_string(query_file).into_diagnostic()?;
                tracing::debug!(file = %query_file.display(), "checking");

                let diagnostics: Vec<_> = analyzer
                    .analyze(&content)
                    .into_iter()
                    .filter(|d| !disabled_rules.contains(d.code()))
                    .collect();

                if !diagnostics.is_empty() {
                    let formatter =
                        OutputFormatter::new(output_format, query_file.display().to_string());
                    formatter.print_diagnostics(&diagnostics, &content)?;

                    for diag in &diagnostics {
                        match diag.severity {
                            Severity::Error => total_errors += 1,
                            Severity::Warning => total_warnings += 1,
                        }
                    }
                }
            }

            if !quiet {
                if total_errors > 0 || total_warnings > 0 {
                    eprintln!();
                    eprintln!(
                        "Found {} error(s), {} warning(s) in {} file(s)",
                        total_errors,
                        total_warnings,
                        query_files.len()
                    );
                } else {
                    eprintln!("All {} file(s) passed validation", query_files.len());
                }
            }

            Ok(total_errors > 0)
        }

        Command::Catalog { files } => {
            let files = expand_patterns(
                &files
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>(),
            )?;
            let Some((catalog, _)) = load_catalog(
                &files,
                tablescope_core::schema::DEFAULT_DATABASE,
                OutputFormat::Human,
                quiet,
            )?
            else {
                return Ok(true);
            };

            println!("Catalog:");
            println!("========");
            for db in catalog.databases() {
                println!("\nDatabase: {}", db.name);
                for (table_name, table) in &db.tables {
                    println!("  Table: {} ({})", table_name, table.kind);
                    for col in table.columns.values() {
                        let nullable = if col.nullable { "NULL" } else { "NOT NULL" };
                        println!(
                            "    - {} {} {}",
                            col.name,
                            col.data_type.display_name(),
                            nullable
                        );
                    }
                }
            }

            Ok(false)
        }

        Command::Tables {
            file,
            database,
            dialect,
        } => {
            let dialect: SqlDialect = dialect.parse().map_err(|e: String| miette::miette!(e))?;
            let content = fs::read_to_string(&file).into_diagnostic()?;

            let parser_dialect = dialect.parser_dialect();
            let statements =
                match sqlparser::parser::Parser::parse_sql(parser_dialect.as_ref(), &content) {
                    Ok(statements) => statements,
                    Err(e) => {
                        eprintln!("Parse error: {}", e);
                        return Ok(true);
                    }
                };

            for (i, stmt) in statements.iter().enumerate() {
                let references = NameResolver::new(&database).resolve(&lower_statement(stmt));
                println!("Statement {}:", i + 1);
                for name in references.names() {
                    println!("  {}", name);
                }
                for token in references.malformed() {
                    println!("  {} (not a table name)", token);
                }
            }

            Ok(false)
        }
    }
}

/// Expand glob patterns; plain paths are kept as given
fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if pattern.contains('*') {
            for path in glob::glob(pattern).into_diagnostic()?.flatten() {
                paths.push(path);
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }
    Ok(paths)
}

/// Build the catalog from TOML or DDL files, with the number of warnings
/// its files produced. Returns `None` after printing the diagnostics of a
/// file that could not be loaded.
fn load_catalog(
    files: &[PathBuf],
    default_database: &str,
    format: OutputFormat,
    quiet: bool,
) -> Result<Option<(InMemoryCatalog, usize)>> {
    let mut builder = CatalogBuilder::with_default_database(default_database);
    let mut warning_count = 0;
    for path in files {
        let content = fs::read_to_string(path).into_diagnostic()?;
        let result = if is_toml(path) {
            builder.parse_toml(&content)
        } else {
            builder.parse_ddl(&content)
        };
        let formatter = OutputFormatter::new(format, path.display().to_string());
        if let Err(diags) = result {
            formatter.print_diagnostics(&diags, &content)?;
            return Ok(None);
        }

        let warnings = builder.take_warnings();
        if !warnings.is_empty() {
            tracing::warn!(
                file = %path.display(),
                count = warnings.len(),
                "catalog definitions produced warnings"
            );
            warning_count += warnings.len();
            if !quiet {
                formatter.print_diagnostics(&warnings, &content)?;
            }
        }
    }

    let (catalog, _) = builder.build();
    Ok(Some((catalog, warning_count)))
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}
