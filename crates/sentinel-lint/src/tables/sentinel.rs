//! Enumerations and limits imposed by Microsoft Sentinel on analytics rules.

pub const VALID_KINDS: &[&str] = &["Scheduled", "NRT"];

pub const VALID_SEVERITIES: &[&str] = &["Informational", "Low", "Medium", "High"];

pub const VALID_TRIGGER_OPERATORS: &[&str] =
    &["GreaterThan", "LessThan", "Equal", "gt", "lt", "eq"];

/// MITRE ATT&CK tactics, written without spaces.
pub const VALID_TACTICS: &[&str] = &[
    "Reconnaissance",
    "ResourceDevelopment",
    "InitialAccess",
    "Execution",
    "Persistence",
    "PrivilegeEscalation",
    "DefenseEvasion",
    "CredentialAccess",
    "Discovery",
    "LateralMovement",
    "Collection",
    "CommandAndControl",
    "Exfiltration",
    "Impact",
];

pub const VALID_AGGREGATION_KINDS: &[&str] = &["SingleAlert", "AlertPerResult"];

pub const MAX_NAME_LENGTH: usize = 50;
pub const MAX_DESCRIPTION_LENGTH: usize = 255;
pub const MAX_QUERY_LENGTH: usize = 10_000;
pub const MAX_TRIGGER_THRESHOLD: i64 = 10_000;
pub const MAX_ENTITY_MAPPINGS: usize = 10;
pub const MAX_FIELD_MAPPINGS_PER_ENTITY: usize = 3;
pub const MAX_CUSTOM_DETAILS: usize = 20;
pub const MAX_ALERT_NAME_LENGTH: usize = 256;
pub const MAX_ALERT_DESCRIPTION_LENGTH: usize = 5_000;
pub const MAX_ALERT_PARAMETERS: usize = 3;

/// Allowed `lookbackDuration` range when incident grouping is enabled.
pub const MIN_LOOKBACK_MINUTES: u64 = 3 * 60;
pub const MAX_LOOKBACK_MINUTES: u64 = 24 * 60;

/// Longest allowed `queryPeriod`: 14 days.
pub const MAX_QUERY_PERIOD_MINUTES: u64 = 14 * 24 * 60;
