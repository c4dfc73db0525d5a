//! Data model shared by the pgplan resolver and its callers.
//!
//! [`Request`] is the raw, partially-specified deployment request,
//! [`ResolvedPlan`] the validated result and [`DerivedOutputs`] the
//! convenience values computed from a plan.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

mod named;
mod outputs;
mod plan;
mod request;

pub use named::NamedEntries;
pub use outputs::{DerivedOutputs, PostgresInfo, ReplicaTopology};
pub use plan::{
    DatabaseRecord, MaintenanceWindow, NetworkConfig, Password, PerformanceFlags, ReplicaRecord,
    ResolvedPlan, ResolvedSizing, SecretResolution, StorageConfig, UserRecord,
};
pub use request::{
    BackupSettings, DatabaseSpec, InsightsSettings, MaintenanceSettings, NetworkRule,
    NetworkSettings, ReplicaSpec, Request, UserSpec,
};

/// PostgreSQL major version, written `POSTGRES_<major>` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EngineVersion(pub u32);

impl EngineVersion {
    /// Parse the `POSTGRES_<major>` form. Catalog membership is checked elsewhere.
    pub fn parse(value: &str) -> Option<Self> {
        let major = value.strip_prefix("POSTGRES_")?;
        if major.is_empty() || !major.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        major.parse().ok().map(Self)
    }

    pub fn major(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "POSTGRES_{}", self.0)
    }
}

impl Serialize for EngineVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EngineVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid engine version '{}'", raw)))
    }
}

/// Cloud SQL edition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Edition {
    Enterprise,
    EnterprisePlus,
}

impl Edition {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ENTERPRISE" => Some(Self::Enterprise),
            "ENTERPRISE_PLUS" => Some(Self::EnterprisePlus),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enterprise => "ENTERPRISE",
            Self::EnterprisePlus => "ENTERPRISE_PLUS",
        }
    }
}

/// Zonal (single zone) or regional (high availability) placement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityType {
    Zonal,
    Regional,
}

impl AvailabilityType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ZONAL" => Some(Self::Zonal),
            "REGIONAL" => Some(Self::Regional),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zonal => "ZONAL",
            Self::Regional => "REGIONAL",
        }
    }
}

/// Privilege level granted to a database user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    ReadWrite,
    ReadOnly,
}

impl Role {
    /// Case-insensitive parse, so `Admin` and `admin` are the same role.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "readwrite" => Some(Self::ReadWrite),
            "readonly" => Some(Self::ReadOnly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::ReadWrite => "readwrite",
            Self::ReadOnly => "readonly",
        }
    }
}

/// SSL enforcement for client connections
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SslMode {
    AllowUnencryptedAndEncrypted,
    EncryptedOnly,
    TrustedClientCertificateRequired,
}

impl SslMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ALLOW_UNENCRYPTED_AND_ENCRYPTED" => Some(Self::AllowUnencryptedAndEncrypted),
            "ENCRYPTED_ONLY" => Some(Self::EncryptedOnly),
            "TRUSTED_CLIENT_CERTIFICATE_REQUIRED" => Some(Self::TrustedClientCertificateRequired),
            _ => None,
        }
    }
}

/// Maintenance update channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UpdateTrack {
    Canary,
    Stable,
    Week5,
}

impl UpdateTrack {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "canary" => Some(Self::Canary),
            "stable" => Some(Self::Stable),
            "week5" => Some(Self::Week5),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_version_parse() {
        assert_eq!(EngineVersion::parse("POSTGRES_15"), Some(EngineVersion(15)));
        assert_eq!(EngineVersion::parse("POSTGRES_"), None);
        assert_eq!(EngineVersion::parse("postgres_15"), None);
        assert_eq!(EngineVersion::parse("POSTGRES_1a"), None);
        assert_eq!(EngineVersion(16).to_string(), "POSTGRES_16");
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("ReadWrite"), Some(Role::ReadWrite));
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&Edition::EnterprisePlus).unwrap(), "\"ENTERPRISE_PLUS\"");
        assert_eq!(serde_json::to_string(&Role::ReadOnly).unwrap(), "\"readonly\"");
        assert_eq!(serde_json::to_string(&UpdateTrack::Week5).unwrap(), "\"week5\"");
        assert_eq!(
            serde_json::to_string(&SslMode::EncryptedOnly).unwrap(),
            "\"ENCRYPTED_ONLY\""
        );
        assert_eq!(serde_json::to_string(&EngineVersion(14)).unwrap(), "\"POSTGRES_14\"");
    }
}
