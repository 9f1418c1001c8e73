use serde_yaml::Value;

use crate::diagnostic::{Diagnostic, err};
use crate::error::ValidatorError;
use crate::record::{Record, type_name, untagged};
use crate::tables::schema::{EXPECTED_TYPES, FieldType, REQUIRED_FIELDS};
use crate::validator::{LintContext, Validator};

/// Required fields and the type of every known field.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaValidator;

impl Validator for SchemaValidator {
    fn name(&self) -> &'static str {
        "Schema Validator"
    }

    fn id(&self) -> &'static str {
        "schema"
    }

    fn validate(
        &self,
        record: &Record,
        _ctx: &LintContext<'_>,
    ) -> Result<Vec<Diagnostic>, ValidatorError> {
        let mut diagnostics: Vec<Diagnostic> = REQUIRED_FIELDS
            .iter()
            .filter(|field| !record.contains_key(field))
            .map(|field| err(format!("Missing required field '{field}'"), *field))
            .collect();

        for (path, expected) in EXPECTED_TYPES {
            // Absent anywhere along the path means optional, not wrong.
            let Some(value) = record.get_path(path) else {
                continue;
            };
            if matches_type(value, *expected) {
                continue;
            }
            let actual = type_name(value);
            let message = if *expected == FieldType::Bool && actual == "str" {
                format!(
                    "Field '{path}' has incorrect type. Expected {expected}, got {actual}. \
                     Use {path}: true instead of {path}: 'true'"
                )
            } else {
                format!("Field '{path}' has incorrect type. Expected {expected}, got {actual}")
            };
            diagnostics.push(err(message, *path));
        }

        Ok(diagnostics)
    }
}

/// Booleans and integers are distinct: `true` is not an `int` and `1` is
/// not a `bool`.
fn matches_type(value: &Value, expected: FieldType) -> bool {
    match (untagged(value), expected) {
        (Value::String(_), FieldType::Str) => true,
        (Value::Bool(_), FieldType::Bool) => true,
        (Value::Number(n), FieldType::Int) => n.is_i64() || n.is_u64(),
        (Value::Sequence(_), FieldType::List) => true,
        (Value::Mapping(_), FieldType::Dict) => true,
        _ => false,
    }
}
