//! Configuration file handling

use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tablescope_core::{QueryContext, SqlDialect, TableKind};

use crate::args::OutputFormat;

pub const CONFIG_FILE_NAME: &str = "tablescope.toml";

/// Configuration for tablescope
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Catalog definition files or patterns
    #[serde(default)]
    pub catalog: Vec<String>,

    /// Query file patterns to check
    #[serde(default)]
    pub files: Vec<String>,

    /// Current database for unqualified names
    #[serde(default)]
    pub database: Option<String>,

    /// SQL dialect (generic, hive, postgresql, mysql)
    #[serde(default)]
    pub dialect: Option<String>,

    /// Storage kinds accepted for planning
    #[serde(default)]
    pub supported_kinds: Vec<String>,

    /// Output format (human, json, sarif)
    #[serde(default)]
    pub format: Option<String>,

    /// Diagnostic codes to suppress (e.g., ["E0001"])
    #[serde(default)]
    pub disable: Vec<String>,
}

/// Values given on the command line for `check`
pub struct CheckOverrides<'a> {
    pub catalog: &'a [PathBuf],
    pub files: &'a [PathBuf],
    pub database: Option<&'a str>,
    pub dialect: Option<&'a str>,
    pub supported_kinds: &'a [String],
    pub format: Option<OutputFormat>,
    pub disable: &'a [String],
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).into_diagnostic()?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).into_diagnostic()
    }

    /// Try to find and load tablescope.toml in current directory or parent directories
    pub fn find_and_load() -> Result<Option<Self>> {
        let mut current_dir = std::env::current_dir().into_diagnostic()?;

        loop {
            let config_path = current_dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                tracing::debug!(path = %config_path.display(), "using configuration file");
                return Ok(Some(Self::from_file(&config_path)?));
            }

            if !current_dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Merge CLI arguments into configuration.
    /// CLI arguments take precedence over config file values.
    pub fn merge_with_args(mut self, args: &CheckOverrides<'_>) -> Self {
        if !args.catalog.is_empty() {
            self.catalog = args.catalog.iter().map(|p| p.display().to_string()).collect();
        }

        if !args.files.is_empty() {
            self.files = args.files.iter().map(|p| p.display().to_string()).collect();
        }

        if let Some(database) = args.database {
            self.database = Some(database.to_string());
        }

        if let Some(dialect) = args.dialect {
            self.dialect = Some(dialect.to_string());
        }

        if !args.supported_kinds.is_empty() {
            self.supported_kinds = args.supported_kinds.to_vec();
        }

        if let Some(fmt) = args.format {
            self.format = Some(format!("{:?}", fmt).to_lowercase());
        }

        if !args.disable.is_empty() {
            self.disable = args.disable.to_vec();
        }

        self
    }

    pub fn dialect(&self) -> Result<SqlDialect> {
        match &self.dialect {
            Some(name) => name.parse().map_err(|e: String| miette::miette!(e)),
            None => Ok(SqlDialect::default()),
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        match self.format.as_deref() {
            Some("json") => OutputFormat::Json,
            Some("sarif") => OutputFormat::Sarif,
            _ => OutputFormat::Human,
        }
    }

    /// Query context from the configured database and storage kinds
    pub fn query_context(&self) -> Result<QueryContext> {
        let mut context = match &self.database {
            Some(db) => QueryContext::new(db),
            None => QueryContext::default(),
        };
        if !self.supported_kinds.is_empty() {
            let kinds = self
                .supported_kinds
                .iter()
                .map(|kind| kind.parse::<TableKind>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e: String| miette::miette!(e))?;
            context = context.with_supported_kinds(kinds);
        }
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_values() {
        let config = Config::from_toml(
            r#"
            catalog = ["catalog.toml"]
            database = "Sales"
            dialect = "hive"
            supported_kinds = ["hdfs", "iceberg"]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.dialect().unwrap(), SqlDialect::Hive);
        assert_eq!(config.output_format(), OutputFormat::Json);
        let context = config.query_context().unwrap();
        assert_eq!(context.current_database(), "sales");
        assert_eq!(
            context.supported_kinds(),
            &[TableKind::Hdfs, TableKind::Iceberg]
        );
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = Config::from_toml(r#"database = "sales""#).unwrap();
        let catalog = vec![PathBuf::from("other.sql")];
        let merged = config.merge_with_args(&CheckOverrides {
            catalog: &catalog,
            files: &[],
            database: Some("reporting"),
            dialect: None,
            supported_kinds: &[],
            format: Some(OutputFormat::Sarif),
            disable: &[],
        });

        assert_eq!(merged.catalog, vec!["other.sql"]);
        assert_eq!(merged.database.as_deref(), Some("reporting"));
        assert_eq!(merged.output_format(), OutputFormat::Sarif);
        assert_eq!(merged.dialect().unwrap(), SqlDialect::Generic);
    }

    #[test]
    fn test_invalid_supported_kind() {
        let config = Config::from_toml(r#"supported_kinds = ["parquet"]"#).unwrap();
        assert!(config.query_context().is_err());
    }
}
