//! Complex column detection for names that did not resolve to tables
//!
//! Impala-style SQL lets a nested column appear in FROM with the same dotted
//! syntax as a table (`FROM t.addr` or `FROM db.t.addr`). Nested columns are
//! not supported, so such a name must fail here as a complex column instead of
//! failing later as a missing table.

use indexmap::IndexSet;
use tracing::trace;

use super::loader::{CatalogBulkLoader, LoadedTableSet};
use crate::error::MetadataError;
use crate::schema::{MetadataCatalog, TableName};
use crate::tree::RawNameToken;

/// Outcome for one unresolved name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The name addresses a nested column; fatal
    ComplexColumnReference,
    /// Just missing; reported later as table not found
    PlainNotFound,
}

pub struct ComplexReferenceClassifier<'a> {
    catalog: &'a dyn MetadataCatalog,
    current_db: String,
}

impl<'a> ComplexReferenceClassifier<'a> {
    pub fn new(catalog: &'a dyn MetadataCatalog, current_db: &str) -> Self {
        Self {
            catalog,
            current_db: current_db.to_lowercase(),
        }
    }

    /// Classify one name against the tables already loaded for the query.
    ///
    /// A two-part name `a.b` not matched by any loaded column gets one extra
    /// lookup of table `a` in the current database.
    pub fn classify(
        &self,
        token: &RawNameToken,
        loaded: &LoadedTableSet,
    ) -> Result<Verdict, MetadataError> {
        match token.parts().as_slice() {
            // db.table.column at the least
            [_, _, _, ..] => Ok(Verdict::ComplexColumnReference),
            [table, column] => {
                if loaded.any_table_has_column(column) {
                    return Ok(Verdict::ComplexColumnReference);
                }

                let candidate = TableName::new(&self.current_db, table);
                trace!(token = %token, table = %candidate, "checking for complex column");
                let single = IndexSet::from([candidate]);
                let reloaded = CatalogBulkLoader::new(self.catalog).load(&single)?;
                if reloaded.any_table_has_column(column) {
                    Ok(Verdict::ComplexColumnReference)
                } else {
                    Ok(Verdict::PlainNotFound)
                }
            }
            _ => Ok(Verdict::PlainNotFound),
        }
    }

    /// Classify every name, failing on the first complex column.
    ///
    /// Returns the names left for later not-found reporting.
    pub fn check(
        &self,
        tokens: &[RawNameToken],
        loaded: &LoadedTableSet,
    ) -> Result<Vec<RawNameToken>, MetadataError> {
        let mut deferred = Vec::new();
        for token in tokens {
            match self.classify(token, loaded)? {
                Verdict::ComplexColumnReference => {
                    return Err(MetadataError::UnsupportedComplexReference {
                        name: token.text().to_string(),
                        span: token.span(),
                    });
                }
                Verdict::PlainNotFound => deferred.push(token.clone()),
            }
        }
        Ok(deferred)
    }
}
