//! Strong identifiers per Sentinel entity type.

/// Entity type → identifiers that uniquely identify an instance of it.
pub const STRONG_IDENTIFIERS: &[(&str, &[&str])] = &[
    (
        "Account",
        &[
            "Name",
            "FullName",
            "NTDomain",
            "DnsDomain",
            "UPNSuffix",
            "Sid",
            "AadUserId",
            "AadTenantId",
            "ObjectGuid",
            "PUID",
        ],
    ),
    (
        "Host",
        &[
            "FullName",
            "DnsDomain",
            "NTDomain",
            "HostName",
            "NetBiosName",
            "AzureID",
            "OMSAgentID",
            "OSFamily",
            "OSVersion",
        ],
    ),
    ("IP", &["Address"]),
    ("Malware", &["Name", "Category"]),
    ("File", &["Name", "Directory", "FileHashType", "FileHashValue"]),
    (
        "Process",
        &["ProcessId", "CommandLine", "ElevationToken", "CreationTimeUtc"],
    ),
    ("CloudApplication", &["AppId", "Name", "InstanceName"]),
    ("DNS", &["DomainName"]),
    ("AzureResource", &["ResourceId"]),
    ("FileHash", &["Algorithm", "Value"]),
    ("RegistryKey", &["Hive", "Key"]),
    ("RegistryValue", &["Name", "Value", "ValueType"]),
    ("SecurityGroup", &["DistinguishedName", "SID", "ObjectGuid"]),
    ("URL", &["Url"]),
    (
        "IoTDevice",
        &["DeviceId", "DeviceName", "Source", "IoTSecurityAgentId"],
    ),
    (
        "MailCluster",
        &[
            "NetworkMessageIds",
            "CountByDeliveryStatus",
            "CountByThreatType",
            "CountByProtectionStatus",
            "Threats",
            "Query",
            "QueryTime",
            "MailCount",
            "Source",
        ],
    ),
    (
        "MailMessage",
        &[
            "NetworkMessageId",
            "Recipient",
            "Urls",
            "Threats",
            "Sender",
            "P1Sender",
            "P2Sender",
            "Subject",
            "BodyFingerprintBin1",
            "AntispamDirection",
            "DeliveryAction",
            "DeliveryLocation",
        ],
    ),
    (
        "Mailbox",
        &[
            "MailboxPrimaryAddress",
            "DisplayName",
            "Upn",
            "ExternalDirectoryObjectId",
        ],
    ),
    (
        "SubmissionMail",
        &[
            "SubmissionId",
            "Submitter",
            "NetworkMessageId",
            "Recipient",
            "Sender",
            "Subject",
        ],
    ),
];

/// Strong identifiers for an entity type (exact, case-sensitive name).
pub fn strong_identifiers(entity_type: &str) -> Option<&'static [&'static str]> {
    STRONG_IDENTIFIERS
        .iter()
        .find(|(t, _)| *t == entity_type)
        .map(|(_, ids)| *ids)
}

/// Correctly cased entity type for a case-insensitive match.
pub fn entity_type_ignore_case(entity_type: &str) -> Option<&'static str> {
    STRONG_IDENTIFIERS
        .iter()
        .map(|(t, _)| *t)
        .find(|t| t.eq_ignore_ascii_case(entity_type))
}

/// All known entity types, sorted.
pub fn entity_types() -> Vec<&'static str> {
    let mut types: Vec<_> = STRONG_IDENTIFIERS.iter().map(|(t, _)| *t).collect();
    types.sort_unstable();
    types
}
