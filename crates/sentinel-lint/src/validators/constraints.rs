//! Limits and enumerations Microsoft Sentinel imposes on analytics rules.
//!
//! Every check here is independent and only runs when its field is set.
//! Wrong types on fields the schema validator knows about are left to it;
//! the checks below simply skip such values.

use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::diagnostic::{Diagnostic, err};
use crate::duration::RuleDuration;
use crate::error::ValidatorError;
use crate::record::{Record, is_truthy, lookup, scalar_text, type_name};
use crate::tables::sentinel::*;
use crate::validator::{LintContext, Validator};

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("version regex must compile"));

static TECHNIQUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^T(\d{4})(?:\.(\d{1,3}))?$").expect("technique regex must compile")
});

/// `{{column}}` placeholders in alert format strings.
static PARAMETER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*\w+\s*\}\}").expect("parameter regex must compile"));

#[derive(Debug, Default, Clone, Copy)]
pub struct ConstraintsValidator;

impl Validator for ConstraintsValidator {
    fn name(&self) -> &'static str {
        "Sentinel Constraints Validator"
    }

    fn id(&self) -> &'static str {
        "constraints"
    }

    fn validate(
        &self,
        record: &Record,
        _ctx: &LintContext<'_>,
    ) -> Result<Vec<Diagnostic>, ValidatorError> {
        let mut d = Vec::new();
        check_enum(record, "kind", VALID_KINDS, &mut d);
        check_enum(record, "severity", VALID_SEVERITIES, &mut d);
        check_enum(record, "triggerOperator", VALID_TRIGGER_OPERATORS, &mut d);
        check_trigger_threshold(record, &mut d);
        check_tactics(record, &mut d);
        check_techniques(record, &mut d);
        check_name(record, &mut d);
        check_max_length(record, "description", MAX_DESCRIPTION_LENGTH, "", &mut d);
        check_max_length(
            record,
            "query",
            MAX_QUERY_LENGTH,
            ". Consider moving static lists to watchlists or using KQL functions.",
            &mut d,
        );
        check_version(record, &mut d);
        check_event_grouping(record, &mut d);
        check_entity_limits(record, &mut d);
        check_custom_details(record, &mut d);
        check_alert_details_override(record, &mut d);
        check_grouping_configuration(record, &mut d);
        Ok(d)
    }
}

// =============================================================================
// Enumerations
// =============================================================================

fn quoted_list(values: &[&str]) -> String {
    format!("'{}'", values.join("', '"))
}

/// Present string fields must be non-blank and one of `valid`.
fn check_enum(record: &Record, field: &str, valid: &[&str], d: &mut Vec<Diagnostic>) {
    let Some(value) = record.get_str(field) else {
        return;
    };
    if value.trim().is_empty() {
        d.push(err(format!("Field '{field}' cannot be empty"), field));
    } else if !valid.contains(&value) {
        d.push(err(
            format!(
                "Field '{field}' has invalid value '{value}'. Must be one of: {}",
                quoted_list(valid)
            ),
            field,
        ));
    }
}

fn check_trigger_threshold(record: &Record, d: &mut Vec<Diagnostic>) {
    let Some(Value::Number(threshold)) = record.get("triggerThreshold") else {
        return;
    };
    if !threshold.is_i64() && !threshold.is_u64() {
        return;
    }
    // A u64 beyond i64::MAX has no i64 form and is out of range too.
    let in_range = threshold
        .as_i64()
        .is_some_and(|t| (0..=MAX_TRIGGER_THRESHOLD).contains(&t));
    if !in_range {
        d.push(err(
            format!(
                "Field 'triggerThreshold' must be between 0 and {MAX_TRIGGER_THRESHOLD}, \
                 got {threshold}"
            ),
            "triggerThreshold",
        ));
    }
}

fn check_tactics(record: &Record, d: &mut Vec<Diagnostic>) {
    let Some(tactics) = record.get_seq("tactics") else {
        return;
    };
    for (idx, tactic) in tactics.iter().enumerate() {
        let field = format!("tactics[{idx}]");
        let Some(tactic) = tactic.as_str() else {
            d.push(err(
                format!(
                    "Tactic at index {idx} must be a string, got {}",
                    type_name(tactic)
                ),
                field,
            ));
            continue;
        };
        if VALID_TACTICS.contains(&tactic) {
            continue;
        }
        let squashed = tactic.replace(' ', "");
        if VALID_TACTICS.contains(&squashed.as_str()) {
            d.push(err(
                format!(
                    "Tactic '{tactic}' contains spaces. MITRE ATT&CK tactics must not \
                     contain spaces. Use '{squashed}' instead"
                ),
                field,
            ));
        } else {
            d.push(err(
                format!(
                    "Tactic '{tactic}' is not a valid MITRE ATT&CK v13 tactic. \
                     Valid tactics are: {}",
                    VALID_TACTICS.join(", ")
                ),
                field,
            ));
        }
    }
}

fn check_techniques(record: &Record, d: &mut Vec<Diagnostic>) {
    let Some(techniques) = record.get_seq("relevantTechniques") else {
        return;
    };
    for (idx, technique) in techniques.iter().enumerate() {
        let field = format!("relevantTechniques[{idx}]");
        let Some(technique) = technique.as_str() else {
            d.push(err(
                format!(
                    "Technique at index {idx} must be a string, got {}",
                    type_name(technique)
                ),
                field,
            ));
            continue;
        };
        if !is_valid_technique(technique) {
            d.push(err(
                format!(
                    "Technique '{technique}' has invalid format. Must be 'T####' \
                     (e.g., T1078) or 'T####.###' (e.g., T1078.001) where #### is in \
                     range 1000-1999"
                ),
                field,
            ));
        }
    }
}

/// `T####` or `T####.###`, main id 1000-1999 and sub id 1-999.
pub(crate) fn is_valid_technique(technique: &str) -> bool {
    let Some(caps) = TECHNIQUE_RE.captures(technique) else {
        return false;
    };
    let main: u32 = caps[1].parse().unwrap_or(0);
    if !(1000..=1999).contains(&main) {
        return false;
    }
    match caps.get(2) {
        Some(sub) => sub.as_str().parse::<u32>().is_ok_and(|n| (1..=999).contains(&n)),
        None => true,
    }
}

// =============================================================================
// Text fields
// =============================================================================

fn check_name(record: &Record, d: &mut Vec<Diagnostic>) {
    let Some(name) = record.get_str("name").filter(|s| !s.is_empty()) else {
        return;
    };
    check_max_length(record, "name", MAX_NAME_LENGTH, "", d);
    if name.ends_with('.') {
        d.push(err("Field 'name' must not end with a period", "name"));
    }
}

fn check_max_length(
    record: &Record,
    field: &str,
    max: usize,
    advice: &str,
    d: &mut Vec<Diagnostic>,
) {
    let Some(text) = record.get_str(field) else {
        return;
    };
    let len = text.chars().count();
    if len > max {
        d.push(err(
            format!(
                "Field '{field}' exceeds maximum length of {max} characters. \
                 Current length: {len} characters{advice}"
            ),
            field,
        ));
    }
}

fn check_version(record: &Record, d: &mut Vec<Diagnostic>) {
    let Some(version) = record.get_str("version") else {
        return;
    };
    if version.trim().is_empty() {
        d.push(err("Field 'version' cannot be empty", "version"));
    } else if !VERSION_RE.is_match(version) {
        d.push(err(
            format!(
                "Field 'version' has invalid format '{version}'. Must follow semantic \
                 versioning format 'a.b.c' (e.g., '1.0.0', '1.2.3')"
            ),
            "version",
        ));
    }
}

// =============================================================================
// Structured fields
// =============================================================================

/// Mapping value of `field` inside `parent`, or an error when it is set to
/// something other than a mapping.
fn expect_mapping<'a>(
    value: Option<&'a Value>,
    message: impl FnOnce(&Value) -> String,
    field: &str,
    d: &mut Vec<Diagnostic>,
) -> Option<&'a Mapping> {
    let value = value.filter(|v| is_truthy(v))?;
    match value.as_mapping() {
        Some(m) => Some(m),
        None => {
            d.push(err(message(value), field));
            None
        }
    }
}

fn check_event_grouping(record: &Record, d: &mut Vec<Diagnostic>) {
    let Some(grouping) = expect_mapping(
        record.get("eventGroupingSettings"),
        |v| {
            format!(
                "Field 'eventGroupingSettings' must be a dictionary, got {}",
                type_name(v)
            )
        },
        "eventGroupingSettings",
        d,
    ) else {
        return;
    };
    let Some(kind) = lookup(grouping, "aggregationKind").and_then(Value::as_str) else {
        return;
    };
    if !kind.is_empty() && !VALID_AGGREGATION_KINDS.contains(&kind) {
        d.push(err(
            format!(
                "Field 'eventGroupingSettings.aggregationKind' has invalid value '{kind}'. \
                 Must be one of: {}",
                quoted_list(VALID_AGGREGATION_KINDS)
            ),
            "eventGroupingSettings.aggregationKind",
        ));
    }
}

fn check_entity_limits(record: &Record, d: &mut Vec<Diagnostic>) {
    let Some(mappings) = record.get_seq("entityMappings") else {
        return;
    };
    if mappings.len() > MAX_ENTITY_MAPPINGS {
        d.push(err(
            format!(
                "Field 'entityMappings' exceeds maximum of {MAX_ENTITY_MAPPINGS} mappings. \
                 Current count: {} mappings",
                mappings.len()
            ),
            "entityMappings",
        ));
    }
    for (idx, entity) in mappings.iter().enumerate() {
        let Some(entity) = entity.as_mapping() else {
            continue;
        };
        let Some(fields) = lookup(entity, "fieldMappings").and_then(Value::as_sequence) else {
            continue;
        };
        if fields.len() > MAX_FIELD_MAPPINGS_PER_ENTITY {
            let entity_type = lookup(entity, "entityType")
                .and_then(scalar_text)
                .unwrap_or_else(|| "unknown".to_string());
            d.push(err(
                format!(
                    "Entity mapping '{entity_type}' at index {idx} exceeds maximum of \
                     {MAX_FIELD_MAPPINGS_PER_ENTITY} field mappings. Current count: {} \
                     field mappings",
                    fields.len()
                ),
                format!("entityMappings[{idx}].fieldMappings"),
            ));
        }
    }
}

fn check_custom_details(record: &Record, d: &mut Vec<Diagnostic>) {
    let Some(details) = record.get_mapping("customDetails") else {
        return;
    };
    if details.len() > MAX_CUSTOM_DETAILS {
        d.push(err(
            format!(
                "Field 'customDetails' exceeds maximum of {MAX_CUSTOM_DETAILS} key/value \
                 pairs. Current count: {} pairs",
                details.len()
            ),
            "customDetails",
        ));
    }
}

fn check_alert_details_override(record: &Record, d: &mut Vec<Diagnostic>) {
    let Some(overrides) = expect_mapping(
        record.get("alertDetailsOverride"),
        |v| {
            format!(
                "Field 'alertDetailsOverride' must be a dictionary, got {}",
                type_name(v)
            )
        },
        "alertDetailsOverride",
        d,
    ) else {
        return;
    };
    for (key, max) in [
        ("alertDisplayNameFormat", MAX_ALERT_NAME_LENGTH),
        ("alertDescriptionFormat", MAX_ALERT_DESCRIPTION_LENGTH),
    ] {
        if let Some(text) = lookup(overrides, key).and_then(Value::as_str)
            && !text.is_empty()
        {
            check_alert_format(text, &format!("alertDetailsOverride.{key}"), max, d);
        }
    }
}

fn check_alert_format(text: &str, field: &str, max: usize, d: &mut Vec<Diagnostic>) {
    let len = text.chars().count();
    if len > max {
        d.push(err(
            format!(
                "Field '{field}' exceeds maximum length of {max} characters. \
                 Current length: {len} characters"
            ),
            field,
        ));
    }

    let parameters: Vec<&str> = PARAMETER_RE.find_iter(text).map(|m| m.as_str()).collect();
    if parameters.len() > MAX_ALERT_PARAMETERS {
        d.push(err(
            format!(
                "Field '{field}' exceeds maximum of {MAX_ALERT_PARAMETERS} parameters. \
                 Current count: {} parameters. Parameters must be in format {{{{columnName}}}}",
                parameters.len()
            ),
            field,
        ));
    }

    // One report per field is enough.
    if let Some(param) = parameters.iter().find(|p| {
        let p: &str = p;
        let inner = &p[2..p.len() - 2];
        inner != inner.trim()
    }) {
        d.push(err(
            format!(
                "Parameter '{param}' in '{field}' has leading or trailing whitespace. \
                 Must be in format {{{{columnName}}}} without spaces inside braces"
            ),
            field,
        ));
    }
}

fn check_grouping_configuration(record: &Record, d: &mut Vec<Diagnostic>) {
    let Some(incident) = record.get("incidentConfiguration") else {
        return;
    };
    let Some(incident) = incident.as_mapping() else {
        d.push(err(
            "Field 'incidentConfiguration' must be a dictionary",
            "incidentConfiguration",
        ));
        return;
    };
    let Some(grouping) = lookup(incident, "groupingConfiguration") else {
        return;
    };
    let Some(grouping) = grouping.as_mapping() else {
        d.push(err(
            "Field 'groupingConfiguration' must be a dictionary",
            "incidentConfiguration.groupingConfiguration",
        ));
        return;
    };
    if !lookup(grouping, "enabled").is_some_and(is_truthy) {
        return;
    }

    const FIELD: &str = "incidentConfiguration.groupingConfiguration.lookbackDuration";
    let Some(lookback) = lookup(grouping, "lookbackDuration").filter(|v| is_truthy(v)) else {
        d.push(err(
            "When grouping is enabled, lookbackDuration must be specified",
            FIELD,
        ));
        return;
    };
    let Some(lookback) = lookback.as_str() else {
        return;
    };
    match lookback.trim().parse::<RuleDuration>() {
        Ok(duration) if duration.minutes() < MIN_LOOKBACK_MINUTES => d.push(err(
            format!("lookbackDuration '{lookback}' is too short. Minimum duration is 3h"),
            FIELD,
        )),
        Ok(duration) if duration.minutes() > MAX_LOOKBACK_MINUTES => d.push(err(
            format!("lookbackDuration '{lookback}' is too long. Maximum duration is 24h"),
            FIELD,
        )),
        Ok(_) => {}
        Err(e) => d.push(err(format!("Invalid lookbackDuration format: {e}"), FIELD)),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn lint(yaml: &str) -> Vec<Diagnostic> {
        ConstraintsValidator
            .validate(
                &yaml.parse().unwrap(),
                &LintContext::new(Path::new("rule.yaml")),
            )
            .unwrap()
    }

    fn has_message(d: &[Diagnostic], needle: &str) -> bool {
        d.iter().any(|d| d.message.contains(needle))
    }

    fn with(extra: &str) -> String {
        format!("{VALID}{extra}")
    }

    const VALID: &str = r#"
id: 929a690e-bef0-4204-a928-ef5e620d6fcc
name: Brute force against Windows host
description: Detects repeated failed logons.
kind: Scheduled
severity: Medium
version: 1.0.0
triggerOperator: gt
triggerThreshold: 5
tactics:
  - CredentialAccess
relevantTechniques:
  - T1110
  - T1110.001
query: SecurityEvent | where EventID == 4625
eventGroupingSettings:
  aggregationKind: AlertPerResult
customDetails:
  Computer: Computer
alertDetailsOverride:
  alertDisplayNameFormat: "Brute force on {{Computer}}"
  alertDescriptionFormat: "{{Account}} failed {{FailedCount}} times"
incidentConfiguration:
  createIncident: true
  groupingConfiguration:
    enabled: true
    lookbackDuration: 5h
entityMappings:
  - entityType: Host
    fieldMappings:
      - identifier: HostName
        columnName: Computer
"#;

    #[test]
    fn valid_rule_has_no_findings() {
        let d = lint(VALID);
        assert!(d.is_empty(), "unexpected: {d:?}");
    }

    #[test]
    fn empty_record_has_no_findings() {
        assert!(lint("other: 1").is_empty());
    }

    // ── Enumerations ────────────────────────────────────────────────────

    #[test]
    fn invalid_kind() {
        let d = lint("kind: Realtime");
        assert_eq!(
            d[0].message,
            "Field 'kind' has invalid value 'Realtime'. Must be one of: 'Scheduled', 'NRT'"
        );
    }

    #[test]
    fn blank_severity() {
        let d = lint("severity: '  '");
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].message, "Field 'severity' cannot be empty");
    }

    #[test]
    fn enum_values_are_case_sensitive() {
        let d = lint("severity: high\ntriggerOperator: GREATERTHAN");
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn wrong_type_is_left_to_schema_validator() {
        assert!(lint("kind: 5\ntriggerThreshold: 'x'\ntactics: Execution").is_empty());
    }

    #[test]
    fn trigger_threshold_range() {
        assert!(has_message(
            &lint("triggerThreshold: 10001"),
            "must be between 0 and 10000, got 10001"
        ));
        assert!(has_message(&lint("triggerThreshold: -1"), "got -1"));
        assert!(lint("triggerThreshold: 10000").is_empty());
        assert!(has_message(
            &lint("triggerThreshold: 18446744073709551615"),
            "got 18446744073709551615"
        ));
        assert!(lint("triggerThreshold: 2.5").is_empty());
    }

    #[test]
    fn tactic_with_spaces_gets_correction() {
        let d = lint("tactics: ['Credential Access']");
        assert_eq!(d.len(), 1);
        assert!(has_message(&d, "Use 'CredentialAccess' instead"));
        assert_eq!(d[0].field.as_deref(), Some("tactics[0]"));
    }

    #[test]
    fn unknown_tactic_lists_valid_ones() {
        let d = lint("tactics: [Execution, Hacking]");
        assert_eq!(d.len(), 1);
        assert!(has_message(&d, "Tactic 'Hacking' is not a valid MITRE ATT&CK v13 tactic"));
        assert_eq!(d[0].field.as_deref(), Some("tactics[1]"));
    }

    #[test]
    fn non_string_tactic() {
        let d = lint("tactics: [42]");
        assert_eq!(d[0].message, "Tactic at index 0 must be a string, got int");
    }

    #[test]
    fn technique_formats() {
        assert!(is_valid_technique("T1078"));
        assert!(is_valid_technique("T1078.001"));
        assert!(!is_valid_technique("T1078.1000"));
        assert!(!is_valid_technique("T2078"));
        assert!(!is_valid_technique("T0999"));
        assert!(!is_valid_technique("T1078.000"));
        assert!(!is_valid_technique("t1078"));
    }

    #[test]
    fn invalid_technique_is_reported_per_index() {
        let d = lint("relevantTechniques: [T1078, T2078]");
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].field.as_deref(), Some("relevantTechniques[1]"));
    }

    // ── Text fields ─────────────────────────────────────────────────────

    #[test]
    fn long_name_ending_in_period() {
        let name = format!("{}.", "a".repeat(60));
        let d = lint(&format!("name: '{name}'"));
        assert_eq!(d.len(), 2);
        assert!(has_message(&d, "Current length: 61 characters"));
        assert!(has_message(&d, "must not end with a period"));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let name = "é".repeat(50);
        assert!(lint(&format!("name: '{name}'")).is_empty());
    }

    #[test]
    fn long_query_gets_advice() {
        let query = "x".repeat(10_001);
        let d = lint(&format!("query: '{query}'"));
        assert!(has_message(&d, "Consider moving static lists to watchlists"));
    }

    #[test]
    fn version_format() {
        assert!(has_message(&lint("version: '1.0'"), "invalid format '1.0'"));
        assert!(has_message(&lint("version: ''"), "cannot be empty"));
        assert!(lint("version: 10.2.33").is_empty());
    }

    // ── Structured fields ───────────────────────────────────────────────

    #[test]
    fn aggregation_kind() {
        let d = lint("eventGroupingSettings:\n  aggregationKind: PerEvent\n");
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].field.as_deref(), Some("eventGroupingSettings.aggregationKind"));
    }

    #[test]
    fn container_fields_must_be_mappings() {
        let d = lint(
            "eventGroupingSettings: [a]\nalertDetailsOverride: text\nincidentConfiguration: 3\n",
        );
        assert_eq!(d.len(), 3);
        assert!(has_message(&d, "'eventGroupingSettings' must be a dictionary, got list"));
        assert!(has_message(&d, "'alertDetailsOverride' must be a dictionary, got str"));
        assert!(has_message(&d, "'incidentConfiguration' must be a dictionary"));
    }

    #[test]
    fn entity_and_field_mapping_limits() {
        let mut yaml = String::from("entityMappings:\n");
        for _ in 0..11 {
            yaml.push_str("  - entityType: Host\n    fieldMappings: []\n");
        }
        yaml.push_str(
            "  - entityType: Account\n    fieldMappings:\n      - {}\n      - {}\n      - {}\n      - {}\n",
        );
        let d = lint(&yaml);
        assert_eq!(d.len(), 2);
        assert!(has_message(&d, "maximum of 10 mappings. Current count: 12"));
        assert!(has_message(&d, "Entity mapping 'Account' at index 11 exceeds maximum of 3"));
    }

    #[test]
    fn custom_details_limit() {
        let mut yaml = String::from("customDetails:\n");
        for i in 0..21 {
            yaml.push_str(&format!("  K{i}: C{i}\n"));
        }
        assert!(has_message(&lint(&yaml), "Current count: 21 pairs"));
    }

    #[test]
    fn too_many_alert_parameters() {
        let d = lint(
            "alertDetailsOverride:\n  alertDisplayNameFormat: '{{a}} {{b}} {{c}} {{d}}'\n",
        );
        assert_eq!(d.len(), 1);
        assert!(has_message(&d, "exceeds maximum of 3 parameters. Current count: 4"));
    }

    #[test]
    fn parameter_whitespace_reported_once() {
        let d = lint(
            "alertDetailsOverride:\n  alertDescriptionFormat: '{{ a }} and {{b }}'\n",
        );
        assert_eq!(d.len(), 1);
        assert!(has_message(&d, "Parameter '{{ a }}'"));
    }

    #[test]
    fn grouping_requires_lookback() {
        let d = lint("incidentConfiguration:\n  groupingConfiguration:\n    enabled: true\n");
        assert_eq!(
            d[0].message,
            "When grouping is enabled, lookbackDuration must be specified"
        );
    }

    #[test]
    fn lookback_bounds() {
        let cfg = |lookback: &str| {
            format!(
                "incidentConfiguration:\n  groupingConfiguration:\n    enabled: true\n    lookbackDuration: {lookback}\n"
            )
        };
        assert!(has_message(&lint(&cfg("2h")), "too short"));
        assert!(has_message(&lint(&cfg("170m")), "too short"));
        assert!(has_message(&lint(&cfg("2d")), "too long"));
        assert!(lint(&cfg("3h")).is_empty());
        assert!(lint(&cfg("1d")).is_empty());
        assert!(has_message(
            &lint(&cfg("5s")),
            "Invalid lookbackDuration format: Duration must end with 'm', 'h', or 'd'"
        ));
    }

    #[test]
    fn disabled_grouping_skips_lookback() {
        let d = lint(
            "incidentConfiguration:\n  groupingConfiguration:\n    enabled: false\n    lookbackDuration: 1m\n",
        );
        assert!(d.is_empty());
    }

    #[test]
    fn all_violations_are_collected() {
        let d = lint(&with("").replace("kind: Scheduled", "kind: Bogus").replace(
            "severity: Medium",
            "severity: Critical",
        ));
        assert_eq!(d.len(), 2);
    }
}
