use crate::diagnostic::{Diagnostic, err};
use crate::error::ValidatorError;
use crate::record::{Record, display_value};
use crate::validator::{LintContext, Validator};

/// Checks that `id` is a well-formed GUID that no sibling file reuses.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentifierValidator;

impl Validator for IdentifierValidator {
    fn name(&self) -> &'static str {
        "GUID Validator"
    }

    fn id(&self) -> &'static str {
        "guid"
    }

    fn validate(
        &self,
        record: &Record,
        ctx: &LintContext<'_>,
    ) -> Result<Vec<Diagnostic>, ValidatorError> {
        if !record.contains_key("id") {
            return Ok(vec![err("Missing required field 'id'", "id")]);
        }

        let guid = match record.get_str("id") {
            Some(s) if is_valid_guid(s) => s,
            _ => {
                let shown = record.get("id").map_or("None".to_string(), display_value);
                return Ok(vec![err(
                    format!(
                        "Field 'id' contains invalid GUID format: '{shown}'. \
                         Expected format: 'xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx'"
                    ),
                    "id",
                )]);
            }
        };

        let Some(siblings) = ctx.siblings else {
            return Ok(Vec::new());
        };
        let duplicates = siblings.duplicates_of(guid, ctx.path);
        if duplicates.is_empty() {
            return Ok(Vec::new());
        }
        let files = duplicates
            .iter()
            .map(|p| {
                p.file_name()
                    .map_or_else(|| p.display().to_string(), |n| n.to_string_lossy().into_owned())
            })
            .collect::<Vec<_>>()
            .join(", ");
        Ok(vec![err(
            format!("GUID '{guid}' is not unique. Also found in: {files}"),
            "id",
        )])
    }
}

/// Canonical hyphenated GUID: 8-4-4-4-12 hex digits.
fn is_valid_guid(s: &str) -> bool {
    if s.len() != 36 {
        return false;
    }
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() != 5 {
        return false;
    }
    let expected_lens = [8, 4, 4, 4, 12];
    parts
        .iter()
        .zip(expected_lens.iter())
        .all(|(part, &len)| part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit()))
}
