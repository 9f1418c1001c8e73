use crate::diagnostic::{Diagnostic, warning};
use crate::error::ValidatorError;
use crate::record::{Record, is_truthy, lookup, scalar_text};
use crate::tables::asim::{entity_pattern, is_asim_field, suggest_fields};
use crate::validator::{LintContext, Validator};
use crate::validators::field_mappings;

const ASIM_DOCS: &str = "https://learn.microsoft.com/en-us/azure/sentinel/normalization-common-fields";

/// Advises when mapped columns do not follow ASIM field naming.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsimFieldValidator;

impl Validator for AsimFieldValidator {
    fn name(&self) -> &'static str {
        "ASIM Field Validator"
    }

    fn id(&self) -> &'static str {
        "asim"
    }

    fn validate(
        &self,
        record: &Record,
        _ctx: &LintContext<'_>,
    ) -> Result<Vec<Diagnostic>, ValidatorError> {
        let mut d = Vec::new();
        for (idx, entity, field_idx, mapping) in field_mappings(record) {
            let Some(entity_type) = lookup(entity, "entityType")
                .filter(|v| is_truthy(v))
                .and_then(scalar_text)
            else {
                continue;
            };
            let Some(column) = lookup(mapping, "columnName")
                .filter(|v| is_truthy(v))
                .and_then(scalar_text)
            else {
                continue;
            };
            if !is_asim_field(&column) {
                d.push(warning(
                    naming_advice(&entity_type, &column),
                    format!("entityMappings[{idx}].fieldMappings[{field_idx}].columnName"),
                ));
            }
        }
        Ok(d)
    }
}

fn naming_advice(entity_type: &str, column: &str) -> String {
    let mut parts = vec![format!(
        "Entity mapping for '{entity_type}' uses columnName '{column}' which does not follow \
         ASIM normalized field naming conventions."
    )];

    match entity_pattern(entity_type) {
        Some(pattern) => {
            let examples: Vec<_> = pattern.examples.iter().take(4).copied().collect();
            parts.push(format!(
                "For '{entity_type}' entities, ASIM recommends field names like: {}.",
                examples.join(", ")
            ));
            if !pattern.prefixes.is_empty() {
                parts.push(format!(
                    "Typical prefixes for this entity type: {}.",
                    pattern.prefixes.join(", ")
                ));
            }
            let suggestions = suggest_fields(entity_type, column);
            if !suggestions.is_empty() {
                parts.push(format!("Suggested fields: {}.", suggestions.join(", ")));
            }
        }
        None => parts.push(format!(
            "Please refer to ASIM documentation for recommended field names: {ASIM_DOCS}"
        )),
    }

    parts.push(
        "Using ASIM-normalized field names improves query consistency and cross-source \
         correlation."
            .to_string(),
    );
    parts.join(" ")
}
