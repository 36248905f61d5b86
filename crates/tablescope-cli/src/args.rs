//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "tablescope")]
#[command(author, version, about = "Resolve SQL table references against a metadata catalog")]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check that the tables read by SQL files can be loaded
    Check {
        /// SQL files to check (supports glob patterns)
        files: Vec<PathBuf>,

        /// Catalog definition files (.toml or .sql DDL)
        #[arg(short, long = "catalog", value_name = "FILE")]
        catalog: Vec<PathBuf>,

        /// Database that unqualified table names resolve against
        #[arg(long, value_name = "NAME")]
        database: Option<String>,

        /// SQL dialect
        #[arg(short, long)]
        dialect: Option<String>,

        /// Storage kinds accepted for planning (repeatable)
        #[arg(long = "supported-kind", value_name = "KIND")]
        supported_kinds: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Configuration file (defaults to tablescope.toml in this or a parent directory)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Diagnostic codes to suppress (e.g. E0001)
        #[arg(long, value_name = "CODE")]
        disable: Vec<String>,
    },

    /// Display catalog contents
    Catalog {
        /// Catalog definition files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show the table references of each statement in a SQL file
    Tables {
        /// SQL file to inspect
        file: PathBuf,

        /// Database that unqualified table names resolve against
        #[arg(long, value_name = "NAME", default_value = "default")]
        database: String,

        /// SQL dialect
        #[arg(short, long, default_value = "generic")]
        dialect: String,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output
    Json,
    /// SARIF output (for GitHub Code Scanning)
    Sarif,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_args() {
        let args = Args::parse_from([
            "tablescope",
            "-v",
            "check",
            "q.sql",
            "--catalog",
            "catalog.toml",
            "--database",
            "sales",
            "--supported-kind",
            "hdfs",
            "--supported-kind",
            "kudu",
            "--format",
            "json",
        ]);
        assert_eq!(args.verbose, 1);
        let Command::Check {
            files,
            catalog,
            database,
            supported_kinds,
            format,
            ..
        } = args.command
        else {
            panic!("expected check");
        };
        assert_eq!(files, vec![PathBuf::from("q.sql")]);
        assert_eq!(catalog, vec![PathBuf::from("catalog.toml")]);
        assert_eq!(database.as_deref(), Some("sales"));
        assert_eq!(supported_kinds, vec!["hdfs", "kudu"]);
        assert_eq!(format, Some(OutputFormat::Json));
    }
}
