use serde_yaml::{Mapping, Value};

use crate::diagnostic::{Diagnostic, err, warning};
use crate::error::ValidatorError;
use crate::record::{Record, display_value, is_truthy, lookup};
use crate::tables::entities::{entity_type_ignore_case, entity_types, strong_identifiers};
use crate::validator::{LintContext, Validator};

/// Shape of `entityMappings` and the strength of each mapped identifier.
///
/// Identifiers are matched case-sensitively because Sentinel silently
/// ignores a mapping whose identifier is cased differently. A casing
/// mistake is therefore an error, while an identifier missing from the
/// strong list is only a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntityValidator;

impl Validator for EntityValidator {
    fn name(&self) -> &'static str {
        "Entity Validator"
    }

    fn id(&self) -> &'static str {
        "entity"
    }

    fn validate(
        &self,
        record: &Record,
        _ctx: &LintContext<'_>,
    ) -> Result<Vec<Diagnostic>, ValidatorError> {
        let mut d = Vec::new();
        let Some(mappings) = record.get("entityMappings").filter(|v| is_truthy(v)) else {
            return Ok(d);
        };
        let Some(mappings) = mappings.as_sequence() else {
            d.push(err("Field 'entityMappings' must be a list", "entityMappings"));
            return Ok(d);
        };
        for (idx, entity) in mappings.iter().enumerate() {
            validate_entity(entity, idx, &mut d);
        }
        Ok(d)
    }
}

fn validate_entity(entity: &Value, idx: usize, d: &mut Vec<Diagnostic>) {
    let Some(entity) = entity.as_mapping() else {
        d.push(err(
            format!("Entity mapping at index {idx} must be a dictionary"),
            format!("entityMappings[{idx}]"),
        ));
        return;
    };

    let Some(entity_type) = lookup(entity, "entityType").filter(|v| is_truthy(v)) else {
        d.push(err(
            format!("Entity mapping at index {idx} missing 'entityType'"),
            format!("entityMappings[{idx}].entityType"),
        ));
        return;
    };
    let entity_type = display_value(entity_type);
    let identifiers = strong_identifiers(&entity_type);
    if identifiers.is_none() {
        d.push(unknown_entity_type(&entity_type, idx));
    }

    let Some(fields) = lookup(entity, "fieldMappings").filter(|v| is_truthy(v)) else {
        d.push(err(
            format!("Entity '{entity_type}' has no fieldMappings"),
            format!("entityMappings[{idx}].fieldMappings"),
        ));
        return;
    };
    let Some(fields) = fields.as_sequence() else {
        d.push(err(
            format!("Field 'entityMappings[{idx}].fieldMappings' must be a list"),
            format!("entityMappings[{idx}].fieldMappings"),
        ));
        return;
    };

    for (field_idx, mapping) in fields.iter().enumerate() {
        if let Some(mapping) = mapping.as_mapping() {
            validate_field_mapping(mapping, &entity_type, identifiers, idx, field_idx, d);
        }
    }
}

fn validate_field_mapping(
    mapping: &Mapping,
    entity_type: &str,
    identifiers: Option<&[&str]>,
    idx: usize,
    field_idx: usize,
    d: &mut Vec<Diagnostic>,
) {
    let path = format!("entityMappings[{idx}].fieldMappings[{field_idx}]");

    let Some(identifier) = lookup(mapping, "identifier").filter(|v| is_truthy(v)) else {
        d.push(err(
            format!("Field mapping for entity '{entity_type}' missing 'identifier'"),
            format!("{path}.identifier"),
        ));
        return;
    };
    if !lookup(mapping, "columnName").is_some_and(is_truthy) {
        d.push(err(
            format!("Field mapping for entity '{entity_type}' missing 'columnName'"),
            format!("{path}.columnName"),
        ));
        return;
    }

    // Unknown entity types were already reported; nothing to compare against.
    let Some(identifiers) = identifiers else {
        return;
    };
    let identifier = display_value(identifier);
    if identifiers.contains(&identifier.as_str()) {
        return;
    }
    match identifiers
        .iter()
        .find(|id| id.eq_ignore_ascii_case(&identifier))
    {
        Some(correct) => d.push(err(
            format!(
                "Entity type '{entity_type}' identifier '{identifier}' has incorrect casing. \
                 Use '{correct}' (identifiers are case-sensitive)"
            ),
            format!("{path}.identifier"),
        )),
        None => d.push(warning(
            format!(
                "Entity type '{entity_type}' is using identifier '{identifier}' which may not \
                 be a strong identifier. Recommended strong identifiers: {}",
                identifiers.join(", ")
            ),
            format!("{path}.identifier"),
        )),
    }
}

fn unknown_entity_type(entity_type: &str, idx: usize) -> Diagnostic {
    let field = format!("entityMappings[{idx}].entityType");
    match entity_type_ignore_case(entity_type) {
        Some(correct) => err(
            format!(
                "Unknown entity type '{entity_type}'. Did you mean '{correct}'? \
                 Entity types are case-sensitive"
            ),
            field,
        ),
        None => err(
            format!(
                "Unknown entity type '{entity_type}'. Valid entity types are: {}",
                entity_types().join(", ")
            ),
            field,
        ),
    }
}
