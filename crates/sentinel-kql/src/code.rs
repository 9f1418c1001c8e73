//! Entry points that turn query text into diagnostics and result columns.

use serde::Serialize;

use crate::ast::Query;
use crate::parser::parse_query;
use crate::schema::{Column, Database};
use crate::semantic::analyze_query;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A finding located by byte offset and length in the query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub start: usize,
    pub length: usize,
}

/// Result of parsing (and optionally analyzing) one query.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedQuery {
    #[serde(skip)]
    pub ast: Option<Query>,
    pub diagnostics: Vec<Diagnostic>,
    /// Columns the query produces, when they can be inferred.
    pub output_columns: Option<Vec<Column>>,
}

impl ParsedQuery {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn column_names(&self) -> Option<Vec<&str>> {
        self.output_columns
            .as_ref()
            .map(|cols| cols.iter().map(|c| c.name.as_str()).collect())
    }
}

/// Parse a query and report syntax diagnostics only.
///
/// Output columns are inferred without a schema, so they are known only when
/// the query fully determines them (for example by ending in `project`).
pub fn parse(text: &str) -> ParsedQuery {
    run(text, None)
}

/// Parse a query and resolve its names and types against `db`.
///
/// Semantic diagnostics are produced only when the query is syntactically valid.
pub fn analyze(text: &str, db: &Database) -> ParsedQuery {
    run(text, Some(db))
}

fn run(text: &str, db: Option<&Database>) -> ParsedQuery {
    match parse_query(text) {
        Err(err) => {
            log::debug!("KQL syntax error at offset {}: {}", err.start, err.message);
            ParsedQuery {
                ast: None,
                diagnostics: vec![Diagnostic {
                    severity: Severity::Error,
                    message: err.message,
                    start: err.start,
                    length: err.length,
                }],
                output_columns: None,
            }
        }
        Ok(query) => {
            let analysis = analyze_query(&query, db);
            ParsedQuery {
                ast: Some(query),
                diagnostics: analysis.diagnostics,
                output_columns: analysis.output_columns,
            }
        }
    }
}
