//! [`QueryEngine`] backed by the `sentinel-kql` front end.

use sentinel_kql::{Database, ParsedQuery, Table};

use crate::diagnostic::Severity;
use crate::error::QueryEngineError;
use crate::query::{QueryAnalysis, QueryDiagnostic, QueryEngine, QuerySchema, SemanticContext};

#[derive(Debug, Default, Clone, Copy)]
pub struct KustoEngine;

impl QueryEngine for KustoEngine {
    fn name(&self) -> &'static str {
        "sentinel-kql"
    }

    fn parse(&self, text: &str) -> Result<QueryAnalysis, QueryEngineError> {
        Ok(convert(sentinel_kql::parse(text)))
    }

    fn prepare(&self, schema: &QuerySchema) -> Result<SemanticContext, QueryEngineError> {
        Ok(SemanticContext::new(schema.to_database()?))
    }

    fn analyze(
        &self,
        text: &str,
        context: &SemanticContext,
    ) -> Result<QueryAnalysis, QueryEngineError> {
        let db = context
            .downcast_ref::<Database>()
            .ok_or(QueryEngineError::ForeignContext)?;
        Ok(convert(sentinel_kql::analyze(text, db)))
    }
}

impl QuerySchema {
    /// Build a `sentinel-kql` database, rejecting unknown column types.
    pub fn to_database(&self) -> Result<Database, QueryEngineError> {
        let schema_err = |e: sentinel_kql::KqlError| QueryEngineError::Schema(e.to_string());
        let tables = self
            .tables
            .iter()
            .map(|(name, table)| {
                Table::new(
                    name.as_str(),
                    table.columns.iter().map(|(c, ty)| (c.as_str(), ty.as_str())),
                )
                .map_err(schema_err)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Database::from_tables(self.database.as_str(), tables).map_err(schema_err)
    }
}

fn convert(parsed: ParsedQuery) -> QueryAnalysis {
    let diagnostics = parsed
        .diagnostics
        .into_iter()
        .map(|d| QueryDiagnostic {
            severity: match d.severity {
                sentinel_kql::Severity::Error => Severity::Error,
                sentinel_kql::Severity::Warning => Severity::Warning,
            },
            message: d.message,
            start: d.start,
            length: d.length,
        })
        .collect();
    QueryAnalysis {
        diagnostics,
        output_columns: parsed
            .output_columns
            .map(|cols| cols.into_iter().map(|c| c.name).collect()),
    }
}
