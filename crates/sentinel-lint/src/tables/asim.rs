//! ASIM (Advanced Security Information Model) normalized field names.
//!
//! Most names are a base field with a role prefix (`Src`, `Target`, ...).
//! [`is_asim_field`] checks against the full expanded vocabulary, built
//! once on first use.

use std::collections::HashSet;
use std::sync::LazyLock;

pub const USER_FIELDS: &[&str] = &[
    "Username",
    "UserId",
    "UserIdType",
    "UserType",
    "OriginalUserType",
    "UserScope",
    "UserScopeId",
    "SessionId",
    "Upn",
    "Domain",
    "DomainType",
    "EmailAddress",
];

pub const HOST_FIELDS: &[&str] = &[
    "Hostname",
    "Domain",
    "DomainType",
    "FQDN",
    "Description",
    "Id",
    "IdType",
    "MacAddr",
    "IpAddr",
    "Zone",
    "Os",
    "OsVersion",
    "Action",
    "OriginalAction",
    "Interface",
    "ScopeId",
    "Scope",
    "Type",
];

pub const PROCESS_FIELDS: &[&str] = &[
    "ProcessName",
    "ProcessId",
    "ProcessGuid",
    "ProcessCommandLine",
    "ProcessCreationTime",
    "ProcessIntegrityLevel",
    "ProcessTokenElevation",
    "ProcessFileCompany",
    "ProcessFileDescription",
    "ProcessFileProduct",
    "ProcessFileVersion",
    "ProcessFileInternalName",
    "ProcessFileOriginalName",
    "ProcessFileMD5",
    "ProcessFileSHA1",
    "ProcessFileSHA256",
    "ProcessFileSHA512",
    "ProcessCurrentDirectory",
    "ProcessStartTime",
    "ProcessEndTime",
];

pub const FILE_FIELDS: &[&str] = &[
    "FileName",
    "FilePath",
    "FilePathType",
    "FileDirectory",
    "FileExtension",
    "FileMimeType",
    "FileSize",
    "FileCreationTime",
    "FileContentType",
    "FileMD5",
    "FileSHA1",
    "FileSHA256",
    "FileSHA512",
    "FileHashType",
];

pub const REGISTRY_FIELDS: &[&str] = &[
    "RegistryKey",
    "RegistryValue",
    "RegistryValueType",
    "RegistryValueData",
    "RegistryPreviousKey",
    "RegistryPreviousValue",
    "RegistryPreviousValueType",
    "RegistryPreviousValueData",
];

pub const APPLICATION_FIELDS: &[&str] = &["AppName", "AppId", "AppType"];

pub const URL_FIELDS: &[&str] = &["Url", "UrlOriginal", "UrlHostname", "UrlDomain", "UrlCategory"];

pub const EMAIL_FIELDS: &[&str] = &[
    "EmailSubject",
    "EmailSenderAddress",
    "EmailRecipient",
    "EmailDirection",
    "EmailSenderName",
    "EmailRecipientName",
];

pub const DNS_FIELDS: &[&str] = &[
    "DnsQuery",
    "DnsQueryType",
    "DnsQueryTypeName",
    "DnsQueryClass",
    "DnsQueryClassName",
    "DnsResponseCode",
    "DnsResponseCodeName",
    "DnsResponseName",
    "DnsFlagsAuthenticated",
    "DnsFlagsAuthoritative",
    "DnsFlagsCheckingDisabled",
    "DnsFlagsRecursionAvailable",
    "DnsFlagsRecursionDesired",
    "DnsFlagsTruncated",
];

pub const NETWORK_FIELDS: &[&str] = &[
    "PortNumber",
    "Bytes",
    "Packets",
    "VlanId",
    "NetworkApplicationProtocol",
    "NetworkProtocol",
    "NetworkDirection",
    "NetworkDuration",
    "NetworkIcmpType",
    "NetworkIcmpCode",
    "NetworkConnectionHistory",
    "NetworkProtocolVersion",
    "NetworkRuleName",
    "NetworkRuleNumber",
];

pub const GEOLOCATION_FIELDS: &[&str] = &[
    "GeoCountry",
    "GeoRegion",
    "GeoCity",
    "GeoLatitude",
    "GeoLongitude",
];

pub const THREAT_FIELDS: &[&str] = &[
    "ThreatName",
    "ThreatCategory",
    "ThreatId",
    "ThreatRiskLevel",
    "ThreatOriginalRiskLevel",
    "ThreatIpAddr",
    "ThreatField",
    "ThreatConfidence",
    "ThreatOriginalConfidence",
    "ThreatIsActive",
    "ThreatFirstReportedTime",
    "ThreatLastReportedTime",
];

pub const CLOUDAPP_FIELDS: &[&str] = &[
    "CloudAppName",
    "CloudAppId",
    "CloudAppOperation",
    "CloudAppRiskLevel",
];

/// Names accepted as-is, mostly common Windows event columns.
pub const STANDALONE_FIELDS: &[&str] = &[
    "User",
    "Computer",
    "IpAddr",
    "Hostname",
    "Application",
    "EventType",
    "EventResult",
    "EventResultDetails",
    "EventMessage",
    "EventOriginalType",
    "EventOriginalResultDetails",
    "HttpStatusCode",
    "HttpRequestMethod",
    "HttpVersion",
    "HttpUserAgent",
    "HttpReferrer",
    "HttpContentType",
    "HttpContentFormat",
    "Account",
    "AccountType",
    "LogonType",
    "SubjectUserName",
    "SubjectUserSid",
    "SubjectDomainName",
    "TargetUserName",
    "TargetUserSid",
    "TargetDomainName",
    "WorkstationName",
    "ImpersonationLevel",
    "PrivilegeList",
    "RuleName",
    "RuleNumber",
    "AlertName",
    "AlertSeverity",
];

/// Base field lists and the role prefixes each may carry.
const PREFIXED: &[(&[&str], &[&str])] = &[
    (USER_FIELDS, &["Actor", "Target", "Src", "Dst"]),
    (HOST_FIELDS, &["Src", "Dst", "Dvc"]),
    (PROCESS_FIELDS, &["Acting", "Target", "Parent"]),
    (FILE_FIELDS, &["Target", "Src"]),
    (APPLICATION_FIELDS, &["Acting", "Target"]),
    (GEOLOCATION_FIELDS, &["Src", "Dst"]),
    (&["PortNumber", "Bytes", "Packets", "VlanId"], &["Src", "Dst"]),
    (&["VlanId"], &["Inner", "Outer"]),
];

/// Field lists valid without a prefix.
const UNPREFIXED: &[&[&str]] = &[
    REGISTRY_FIELDS,
    URL_FIELDS,
    EMAIL_FIELDS,
    DNS_FIELDS,
    NETWORK_FIELDS,
    THREAT_FIELDS,
    CLOUDAPP_FIELDS,
    STANDALONE_FIELDS,
];

static VOCABULARY: LazyLock<HashSet<String>> = LazyLock::new(|| {
    let mut names: HashSet<String> = UNPREFIXED
        .iter()
        .flat_map(|list| list.iter())
        .map(|f| f.to_string())
        .collect();
    for (fields, prefixes) in PREFIXED {
        for prefix in *prefixes {
            names.extend(fields.iter().map(|f| format!("{prefix}{f}")));
        }
    }
    names
});

static VOCABULARY_LOWER: LazyLock<HashSet<String>> =
    LazyLock::new(|| VOCABULARY.iter().map(|f| f.to_lowercase()).collect());

/// Whether `name` is a normalized field name. Exact match first, then a
/// case-insensitive one.
pub fn is_asim_field(name: &str) -> bool {
    VOCABULARY.contains(name) || VOCABULARY_LOWER.contains(&name.to_lowercase())
}

/// Naming guidance for one entity type.
#[derive(Debug, Clone, Copy)]
pub struct EntityPattern {
    pub prefixes: &'static [&'static str],
    pub base_fields: &'static [&'static str],
    pub examples: &'static [&'static str],
}

const ENTITY_PATTERNS: &[(&str, EntityPattern)] = &[
    (
        "Account",
        EntityPattern {
            prefixes: &["Actor", "Target", "Src", "Dst"],
            base_fields: USER_FIELDS,
            examples: &["ActorUsername", "TargetUsername", "ActorUserId", "SrcUsername"],
        },
    ),
    (
        "Host",
        EntityPattern {
            prefixes: &["Src", "Dst", "Dvc"],
            base_fields: HOST_FIELDS,
            examples: &["SrcHostname", "DstHostname", "DvcIpAddr", "SrcIpAddr"],
        },
    ),
    (
        "IP",
        EntityPattern {
            prefixes: &["Src", "Dst", "Dvc"],
            base_fields: &["IpAddr"],
            examples: &["SrcIpAddr", "DstIpAddr", "DvcIpAddr"],
        },
    ),
    (
        "Process",
        EntityPattern {
            prefixes: &["Acting", "Target", "Parent"],
            base_fields: PROCESS_FIELDS,
            examples: &["ActingProcessName", "TargetProcessId", "ActingProcessCommandLine"],
        },
    ),
    (
        "File",
        EntityPattern {
            prefixes: &["Target", "Src"],
            base_fields: FILE_FIELDS,
            examples: &["TargetFileName", "SrcFilePath", "TargetFileSHA256"],
        },
    ),
    (
        "URL",
        EntityPattern {
            prefixes: &[],
            base_fields: URL_FIELDS,
            examples: &["Url", "UrlHostname", "UrlCategory"],
        },
    ),
    (
        "DNS",
        EntityPattern {
            prefixes: &[],
            base_fields: DNS_FIELDS,
            examples: &["DnsQuery", "DnsQueryType", "DnsResponseCode"],
        },
    ),
    (
        "RegistryKey",
        EntityPattern {
            prefixes: &[],
            base_fields: REGISTRY_FIELDS,
            examples: &["RegistryKey", "RegistryValue", "RegistryValueType"],
        },
    ),
    (
        "RegistryValue",
        EntityPattern {
            prefixes: &[],
            base_fields: REGISTRY_FIELDS,
            examples: &["RegistryValue", "RegistryValueType", "RegistryValueData"],
        },
    ),
    (
        "Malware",
        EntityPattern {
            prefixes: &[],
            base_fields: THREAT_FIELDS,
            examples: &["ThreatName", "ThreatCategory", "ThreatRiskLevel"],
        },
    ),
    (
        "CloudApplication",
        EntityPattern {
            prefixes: &[],
            base_fields: CLOUDAPP_FIELDS,
            examples: &["CloudAppName", "CloudAppId", "CloudAppOperation"],
        },
    ),
];

pub fn entity_pattern(entity_type: &str) -> Option<&'static EntityPattern> {
    ENTITY_PATTERNS
        .iter()
        .find(|(t, _)| *t == entity_type)
        .map(|(_, p)| p)
}

/// Normalized names worth suggesting in place of `column` for an entity.
///
/// Base fields that contain `column` (or are contained in it) are offered
/// with every role prefix of the entity type. With no such overlap the
/// entity's first few examples are returned instead.
pub fn suggest_fields(entity_type: &str, column: &str) -> Vec<String> {
    let Some(pattern) = entity_pattern(entity_type) else {
        return Vec::new();
    };
    let column = column.to_lowercase();

    let mut suggestions = Vec::new();
    for base in pattern.base_fields {
        let base_lower = base.to_lowercase();
        if !(base_lower.contains(&column) || column.contains(&base_lower)) {
            continue;
        }
        if pattern.prefixes.is_empty() {
            suggestions.push(base.to_string());
        } else {
            suggestions.extend(pattern.prefixes.iter().map(|p| format!("{p}{base}")));
        }
    }

    if suggestions.is_empty() {
        suggestions = pattern.examples.iter().take(3).map(|e| e.to_string()).collect();
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_names_are_in_vocabulary() {
        assert!(is_asim_field("ActorUsername"));
        assert!(is_asim_field("DvcIpAddr"));
        assert!(is_asim_field("ParentProcessId"));
        assert!(is_asim_field("InnerVlanId"));
        assert!(!is_asim_field("Username"));
        assert!(!is_asim_field("ParentUsername"));
    }

    #[test]
    fn lookup_falls_back_to_case_insensitive() {
        assert!(is_asim_field("srcipaddr"));
        assert!(is_asim_field("DNSQUERY"));
    }

    #[test]
    fn suggestions_expand_matching_base_fields() {
        let s = suggest_fields("IP", "IPAddress");
        assert_eq!(s, ["SrcIpAddr", "DstIpAddr", "DvcIpAddr"]);
    }

    #[test]
    fn suggestions_fall_back_to_examples() {
        let s = suggest_fields("Account", "zzz");
        assert_eq!(s, ["ActorUsername", "TargetUsername", "ActorUserId"]);
        assert!(suggest_fields("Mailbox", "x").is_empty());
    }
}
