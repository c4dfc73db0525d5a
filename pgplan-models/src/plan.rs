//! The resolved, validated provisioning plan

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{
    AvailabilityType, BackupSettings, Edition, EngineVersion, InsightsSettings, NetworkRule, Role,
    SslMode, UpdateTrack,
};

/// Engine flag name -> value, in the engine's native unit strings
pub type PerformanceFlags = BTreeMap<String, String>;

/// Machine size and placement after presets and overrides are merged
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedSizing {
    pub machine_type: String,
    pub disk_size_gb: u32,
    pub edition: Edition,
    pub availability_type: AvailabilityType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    pub autoresize: bool,
    /// None when autoresize is off or unlimited
    pub autoresize_limit_gb: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseRecord {
    pub name: String,
    pub charset: String,
    pub collation: String,
}

/// Generated password. `Debug` never shows the value.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(********)")
    }
}

/// How a user's password is obtained
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SecretResolution {
    /// Caller-supplied reference, used verbatim
    Referenced { secret: String },
    /// Freshly generated; `secret_id` is set when it is to be stored in the
    /// secret manager
    Generated {
        password: Password,
        secret_id: Option<String>,
    },
}

impl SecretResolution {
    pub fn secret_id(&self) -> Option<&str> {
        match self {
            Self::Generated { secret_id, .. } => secret_id.as_deref(),
            Self::Referenced { .. } => None,
        }
    }

    pub fn generated_password(&self) -> Option<&Password> {
        match self {
            Self::Generated { password, .. } => Some(password),
            Self::Referenced { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub name: String,
    pub role: Role,
    pub secret: SecretResolution,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicaRecord {
    pub name: String,
    /// `<primary>-<name>`
    pub instance_name: String,
    pub region: String,
    pub availability_type: AvailabilityType,
    pub failover_target: bool,
    pub machine_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    pub ipv4_enabled: bool,
    pub private_network: Option<String>,
    pub ssl_mode: SslMode,
    pub authorized_networks: Vec<NetworkRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaintenanceWindow {
    pub day: u32,
    pub hour: u32,
    pub update_track: UpdateTrack,
}

/// Fully validated plan. Every field combination in it is consistent with
/// the provider's constraints; it is never mutated after resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedPlan {
    pub instance_name: String,
    pub project_id: String,
    pub region: String,
    pub engine_version: EngineVersion,
    pub sizing: ResolvedSizing,
    pub storage: StorageConfig,
    pub databases: BTreeMap<String, DatabaseRecord>,
    pub users: BTreeMap<String, UserRecord>,
    pub read_replicas: BTreeMap<String, ReplicaRecord>,
    pub flags: PerformanceFlags,
    pub extensions: Vec<String>,
    pub network: NetworkConfig,
    pub backup: BackupSettings,
    pub insights: InsightsSettings,
    pub maintenance: MaintenanceWindow,
    pub labels: BTreeMap<String, String>,
    pub deletion_protection: bool,
    pub generate_permission_script: bool,
}

impl ResolvedPlan {
    /// Copy of the plan with every generated password masked
    pub fn redacted(&self) -> Self {
        let mut plan = self.clone();
        for user in plan.users.values_mut() {
            if let SecretResolution::Generated { password, .. } = &mut user.secret {
                *password = Password::new("********");
            }
        }
        plan
    }

    pub fn failover_replica(&self) -> Option<&ReplicaRecord> {
        self.read_replicas.values().find(|replica| replica.failover_target)
    }
}
