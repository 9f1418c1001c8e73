//! Required fields, expected field types and the default query schema.

use std::fmt;

/// Fields every analytics rule must carry.
pub const REQUIRED_FIELDS: &[&str] = &[
    "id",
    "name",
    "kind",
    "description",
    "severity",
    "enabled",
    "query",
    "queryFrequency",
    "queryPeriod",
    "triggerOperator",
    "triggerThreshold",
];

/// Type a field is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Bool,
    Int,
    List,
    Dict,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Str => "str",
            FieldType::Bool => "bool",
            FieldType::Int => "int",
            FieldType::List => "list",
            FieldType::Dict => "dict",
        };
        f.write_str(name)
    }
}

/// Dot-path → expected type.
pub const EXPECTED_TYPES: &[(&str, FieldType)] = &[
    ("id", FieldType::Str),
    ("name", FieldType::Str),
    ("displayName", FieldType::Str),
    ("version", FieldType::Str),
    ("lastModified", FieldType::Str),
    ("kind", FieldType::Str),
    ("description", FieldType::Str),
    ("severity", FieldType::Str),
    ("enabled", FieldType::Bool),
    ("queryFrequency", FieldType::Str),
    ("queryPeriod", FieldType::Str),
    ("triggerOperator", FieldType::Str),
    ("triggerThreshold", FieldType::Int),
    ("query", FieldType::Str),
    ("suppressionEnabled", FieldType::Bool),
    ("tactics", FieldType::List),
    ("relevantTechniques", FieldType::List),
    ("entityMappings", FieldType::List),
    ("customDetails", FieldType::Dict),
    ("incidentConfiguration.createIncident", FieldType::Bool),
    ("incidentConfiguration.groupingConfiguration.enabled", FieldType::Bool),
    ("incidentConfiguration.groupingConfiguration.reopenClosedIncident", FieldType::Bool),
    ("incidentConfiguration.groupingConfiguration.lookbackDuration", FieldType::Str),
    ("incidentConfiguration.groupingConfiguration.matchingMethod", FieldType::Str),
    ("incidentConfiguration.groupingConfiguration.groupByEntities", FieldType::List),
    ("incidentConfiguration.groupingConfiguration.groupByAlertDetails", FieldType::List),
    ("incidentConfiguration.groupingConfiguration.groupByCustomDetails", FieldType::List),
    ("eventGroupingSettings.aggregationKind", FieldType::Str),
    ("alertDetailsOverride.alertDisplayNameFormat", FieldType::Str),
    ("alertDetailsOverride.alertDescriptionFormat", FieldType::Str),
    ("alertDetailsOverride.alertTacticsColumnName", FieldType::Str),
    ("alertDetailsOverride.alertSeverityColumnName", FieldType::Str),
];

pub fn expected_type(path: &str) -> Option<FieldType> {
    EXPECTED_TYPES
        .iter()
        .find(|(p, _)| *p == path)
        .map(|(_, ty)| *ty)
}

pub const DEFAULT_DATABASE: &str = "SecurityInsights";

/// Tables used for semantic query analysis when no schema file is given.
pub const SENTINEL_TABLES: &[(&str, &[(&str, &str)])] = &[
    (
        "SecurityEvent",
        &[
            ("TimeGenerated", "datetime"),
            ("Computer", "string"),
            ("Account", "string"),
            ("EventID", "int"),
            ("CommandLine", "string"),
            ("ProcessName", "string"),
            ("WorkstationName", "string"),
            ("IpAddress", "string"),
            ("LogonType", "int"),
        ],
    ),
    (
        "SigninLogs",
        &[
            ("TimeGenerated", "datetime"),
            ("UserPrincipalName", "string"),
            ("IPAddress", "string"),
            ("Location", "string"),
            ("AppDisplayName", "string"),
            ("ClientAppUsed", "string"),
            ("ConditionalAccessStatus", "string"),
            ("ResultType", "string"),
            ("ResultDescription", "string"),
        ],
    ),
    (
        "AuditLogs",
        &[
            ("TimeGenerated", "datetime"),
            ("OperationName", "string"),
            ("Category", "string"),
            ("ResultType", "string"),
            ("InitiatedBy", "dynamic"),
            ("TargetResources", "dynamic"),
        ],
    ),
    (
        "CommonSecurityLog",
        &[
            ("TimeGenerated", "datetime"),
            ("DeviceVendor", "string"),
            ("DeviceProduct", "string"),
            ("DeviceAction", "string"),
            ("SourceIP", "string"),
            ("DestinationIP", "string"),
            ("SourcePort", "int"),
            ("DestinationPort", "int"),
            ("Protocol", "string"),
        ],
    ),
    (
        "Syslog",
        &[
            ("TimeGenerated", "datetime"),
            ("Computer", "string"),
            ("Facility", "string"),
            ("SeverityLevel", "string"),
            ("SyslogMessage", "string"),
            ("ProcessName", "string"),
            ("HostIP", "string"),
        ],
    ),
];
