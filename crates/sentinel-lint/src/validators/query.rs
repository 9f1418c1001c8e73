use std::collections::BTreeSet;
use std::sync::Arc;

use crate::diagnostic::{Diagnostic, Severity, err, warning};
use crate::error::ValidatorError;
use crate::query::{QueryEngine, SemanticContext};
use crate::record::{Record, display_value, is_truthy, lookup, scalar_text, type_name};
use crate::validator::{LintContext, Validator};
use crate::validators::field_mappings;

const MAX_EXCERPT: usize = 50;

/// Syntax, optional semantics, and entity-column agreement of the `query`
/// field, delegated to a [`QueryEngine`].
pub struct QueryValidator {
    engine: Arc<dyn QueryEngine>,
    context: Option<SemanticContext>,
}

impl QueryValidator {
    /// `context` enables semantic checks. Build it with the same engine's
    /// [`prepare`](QueryEngine::prepare).
    pub fn new(engine: Arc<dyn QueryEngine>, context: Option<SemanticContext>) -> Self {
        QueryValidator { engine, context }
    }
}

impl Validator for QueryValidator {
    fn name(&self) -> &'static str {
        "KQL Validator"
    }

    fn id(&self) -> &'static str {
        "query"
    }

    fn validate(
        &self,
        record: &Record,
        _ctx: &LintContext<'_>,
    ) -> Result<Vec<Diagnostic>, ValidatorError> {
        let mut d = Vec::new();
        let Some(query) = record.get("query").filter(|v| is_truthy(v)) else {
            return Ok(d);
        };
        let Some(query) = query.as_str() else {
            d.push(err(
                format!("Field 'query' must be a string, got {}", type_name(query)),
                "query",
            ));
            return Ok(d);
        };

        // Any syntax finding, warnings included, ends the query checks.
        let Some(mut columns) = self.check_syntax(query, &mut d) else {
            return Ok(d);
        };

        if let Some(context) = &self.context {
            match self.engine.analyze(query, context) {
                Ok(analysis) => {
                    for diag in &analysis.diagnostics {
                        if !is_semantic(&diag.message) {
                            continue;
                        }
                        d.push(match diag.severity {
                            Severity::Error => {
                                err(format!("KQL semantic error: {}", diag.message), "query")
                            }
                            Severity::Warning => {
                                warning(format!("KQL semantic warning: {}", diag.message), "query")
                            }
                        });
                    }
                    if analysis.output_columns.is_some() {
                        columns = analysis.output_columns;
                    }
                }
                Err(e) => d.push(warning(format!("Semantic validation failed: {e}"), "query")),
            }
        }

        // Columns the engine could not infer skip the cross-check.
        if let Some(columns) = columns.filter(|c| !c.is_empty()) {
            check_entity_columns(record, &columns, &mut d);
        }
        Ok(d)
    }
}

impl QueryValidator {
    /// Report syntax diagnostics. Returns the schema-free output columns
    /// when the query is clean, `None` otherwise.
    fn check_syntax(
        &self,
        query: &str,
        d: &mut Vec<Diagnostic>,
    ) -> Option<Option<BTreeSet<String>>> {
        let analysis = match self.engine.parse(query) {
            Ok(analysis) => analysis,
            Err(e) => {
                d.push(err(format!("Failed to parse KQL query: {e}"), "query"));
                return None;
            }
        };
        if analysis.diagnostics.is_empty() {
            return Some(analysis.output_columns);
        }
        for diag in &analysis.diagnostics {
            d.push(match diag.severity {
                Severity::Error => err(
                    format!(
                        "KQL syntax error: {}. Issue at position {}: '{}'",
                        diag.message,
                        diag.start,
                        excerpt(query, diag.start, diag.length)
                    ),
                    "query",
                ),
                Severity::Warning => {
                    warning(format!("KQL syntax warning: {}", diag.message), "query")
                }
            });
        }
        None
    }
}

/// Semantic messages about unresolved names or types. Anything else
/// duplicates what the syntax pass already said.
fn is_semantic(message: &str) -> bool {
    message.contains("does not exist")
        || message.contains("does not refer")
        || message.to_lowercase().contains("type")
}

fn check_entity_columns(record: &Record, columns: &BTreeSet<String>, d: &mut Vec<Diagnostic>) {
    for (idx, entity, field_idx, mapping) in field_mappings(record) {
        let Some(column) = lookup(mapping, "columnName")
            .filter(|v| is_truthy(v))
            .and_then(scalar_text)
        else {
            continue;
        };
        if columns.contains(&column) {
            continue;
        }
        let entity_type = lookup(entity, "entityType").map_or_else(|| "None".to_string(), display_value);
        let available: Vec<&str> = columns.iter().map(String::as_str).collect();
        d.push(err(
            format!(
                "Entity mapping for '{entity_type}' references column '{column}' which is not \
                 present in query output. Available columns: {}",
                available.join(", ")
            ),
            format!("entityMappings[{idx}].fieldMappings[{field_idx}].columnName"),
        ));
    }
}

/// The offending slice of `query`, trimmed and capped for display.
fn excerpt(query: &str, start: usize, length: usize) -> String {
    let end = start.saturating_add(length).min(query.len());
    let Some(slice) = query.get(start..end) else {
        return "<error extracting excerpt>".to_string();
    };
    let slice = slice.trim();
    if slice.chars().count() > MAX_EXCERPT {
        let mut short: String = slice.chars().take(MAX_EXCERPT - 3).collect();
        short.push_str("...");
        short
    } else {
        slice.to_string()
    }
}
