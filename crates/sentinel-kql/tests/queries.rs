use sentinel_kql::{Database, Severity, Table, analyze, parse};

fn sentinel_db() -> Database {
    Database::from_tables(
        "SecurityInsights",
        [
            Table::new(
                "SecurityEvent",
                [
                    ("TimeGenerated", "datetime"),
                    ("Computer", "string"),
                    ("Account", "string"),
                    ("EventID", "int"),
                    ("IpAddress", "string"),
                ],
            )
            .unwrap(),
            Table::new(
                "AuditLogs",
                [
                    ("TimeGenerated", "datetime"),
                    ("OperationName", "string"),
                    ("InitiatedBy", "dynamic"),
                ],
            )
            .unwrap(),
        ],
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Realistic rule queries
// ---------------------------------------------------------------------------

const BRUTE_FORCE: &str = r#"
let threshold = 10;
let lookback = 1h;
SecurityEvent
| where TimeGenerated > ago(lookback)
| where EventID == 4625 and Account !endswith "$"
| summarize FailedLogons = count(), Hosts = make_set(Computer) by Account, IpAddress, bin(TimeGenerated, 5m)
| where FailedLogons >= threshold
| extend AccountName = tostring(split(Account, "\\")[1])
| project TimeGenerated, Account, AccountName, IpAddress, FailedLogons, Hosts
"#;

#[test]
fn brute_force_rule_parses_and_infers_columns() {
    let parsed = parse(BRUTE_FORCE);
    assert!(!parsed.has_errors(), "{:?}", parsed.diagnostics);
    assert_eq!(
        parsed.column_names(),
        Some(vec!["TimeGenerated", "Account", "AccountName", "IpAddress", "FailedLogons", "Hosts"])
    );
}

#[test]
fn brute_force_rule_is_semantically_clean() {
    let parsed = analyze(BRUTE_FORCE, &sentinel_db());
    assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
}

#[test]
fn audit_rule_with_dynamic_access() {
    let query = r#"AuditLogs
| where OperationName has_any ("Add member to role", "Add owner to application")
| extend Actor = tostring(InitiatedBy.user.userPrincipalName)
| mv-expand Target = TargetResources
| project TimeGenerated, Actor, OperationName"#;
    let parsed = parse(query);
    assert!(!parsed.has_errors(), "{:?}", parsed.diagnostics);
    assert_eq!(parsed.column_names(), Some(vec!["TimeGenerated", "Actor", "OperationName"]));

    // TargetResources is not part of the test schema.
    let analyzed = analyze(query, &sentinel_db());
    assert_eq!(analyzed.diagnostics.len(), 1);
    assert!(analyzed.diagnostics[0].message.contains("'TargetResources'"));
}

#[test]
fn unresolved_columns_without_projection() {
    let parsed = parse("SecurityEvent | where EventID == 4688");
    assert!(!parsed.has_errors());
    assert_eq!(parsed.output_columns, None);

    let analyzed = analyze("SecurityEvent | where EventID == 4688", &sentinel_db());
    assert_eq!(analyzed.output_columns.map(|c| c.len()), Some(5));
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[test]
fn syntax_error_has_location() {
    let text = "SecurityEvent | where EventID == ";
    let parsed = parse(text);
    assert_eq!(parsed.diagnostics.len(), 1);
    let diag = &parsed.diagnostics[0];
    assert_eq!(diag.severity, Severity::Error);
    assert_eq!(
        diag.message,
        "Unexpected end of query; expected name or expression"
    );
    assert_eq!(diag.start, text.len());
    assert_eq!(diag.length, 1);
    assert!(parsed.ast.is_none());
}

#[test]
fn in_accepts_parenthesized_subquery() {
    for text in [
        "SecurityEvent | where EventID in ((SecurityEvent | where EventID == 1 | distinct EventID))",
        "SecurityEvent | where EventID in (SecurityEvent | where EventID == 1 | distinct EventID)",
        "SecurityEvent | where EventID in ((4624), 4625)",
    ] {
        let parsed = parse(text);
        assert!(parsed.diagnostics.is_empty(), "{text}: {:?}", parsed.diagnostics);
        assert!(parsed.ast.is_some());
    }
}

#[test]
fn unbalanced_parenthesis_is_a_syntax_error() {
    let parsed = parse("SecurityEvent | where (EventID == 1");
    assert!(parsed.has_errors());
}

#[test]
fn semantic_diagnostic_offsets_point_at_name() {
    let text = "SecurityEvent | project Acount";
    let parsed = analyze(text, &sentinel_db());
    assert_eq!(parsed.diagnostics.len(), 1);
    let diag = &parsed.diagnostics[0];
    assert_eq!(&text[diag.start..diag.start + diag.length], "Acount");
}

#[test]
fn type_mismatch_reported() {
    let parsed = analyze("SecurityEvent | where TimeGenerated == 'yesterday'", &sentinel_db());
    assert_eq!(parsed.diagnostics.len(), 1);
    assert!(parsed.diagnostics[0].message.contains("types datetime and string"));
}

#[test]
fn parsed_query_serializes_without_ast() {
    let parsed = parse("print x = 1");
    let json = serde_json::to_value(&parsed).unwrap();
    assert!(json.get("ast").is_none());
    assert_eq!(json["output_columns"][0]["name"], "x");
    assert_eq!(json["output_columns"][0]["type"], "long");
}
