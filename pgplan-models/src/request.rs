//! The raw deployment request

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::NamedEntries;

/// Partially-specified request for a managed PostgreSQL deployment.
///
/// Enum-like fields stay as strings here so that a bad value is reported as
/// a resolution error naming the field, not as a parse failure. On the wire
/// every setting is a top-level key and unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawRequest", into = "RawRequest")]
pub struct Request {
    pub instance_name: String,
    pub project_id: String,
    pub region: String,
    /// `POSTGRES_<major>` (default: "POSTGRES_15")
    pub engine_version: String,
    /// Named sizing preset: budget, balanced, performance or custom
    pub preset: Option<String>,
    pub machine_type: Option<String>,
    pub disk_size_gb: Option<u32>,
    pub edition: Option<String>,
    pub availability_type: Option<String>,
    pub disk_autoresize: bool,
    /// Upper bound for autoresize; 0 means unlimited
    pub disk_autoresize_limit_gb: Option<u32>,
    pub databases: NamedEntries<DatabaseSpec>,
    pub users: NamedEntries<UserSpec>,
    pub read_replicas: NamedEntries<ReplicaSpec>,
    pub network: NetworkSettings,
    pub backup: BackupSettings,
    pub insights: InsightsSettings,
    pub maintenance: MaintenanceSettings,
    pub auto_generate_performance_flags: bool,
    pub max_connections: Option<u32>,
    /// Explicit engine flags
    pub database_flags: BTreeMap<String, String>,
    pub postgresql_extensions: Vec<String>,
    pub default_password_length: u32,
    pub store_passwords_in_secret_manager: bool,
    pub generate_permission_script: bool,
    pub use_random_suffix: bool,
    pub deletion_protection: bool,
    pub labels: BTreeMap<String, String>,
}

/// Flat wire form of [`Request`], one key per module variable
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawRequest {
    instance_name: String,
    project_id: String,
    region: String,
    #[serde(alias = "postgres_version")]
    engine_version: String,
    #[serde(alias = "use_preset_config")]
    preset: Option<String>,
    machine_type: Option<String>,
    disk_size_gb: Option<u32>,
    #[serde(alias = "sql_edition")]
    edition: Option<String>,
    availability_type: Option<String>,
    disk_autoresize: bool,
    disk_autoresize_limit_gb: Option<u32>,
    databases: NamedEntries<DatabaseSpec>,
    users: NamedEntries<UserSpec>,
    read_replicas: NamedEntries<ReplicaSpec>,
    ipv4_enabled: bool,
    private_network: Option<String>,
    ssl_mode: String,
    authorized_networks: Vec<NetworkRule>,
    backup_enabled: bool,
    backup_start_time: String,
    backup_retention_days: u32,
    point_in_time_recovery: bool,
    transaction_log_retention_days: u32,
    query_insights_enabled: bool,
    query_string_length: u32,
    record_application_tags: bool,
    record_client_address: bool,
    query_plans_per_minute: u32,
    maintenance_window_day: u32,
    maintenance_window_hour: u32,
    maintenance_window_update_track: String,
    auto_generate_performance_flags: bool,
    /// Accepts a number or a numeric string
    #[serde(deserialize_with = "number_or_string")]
    max_connections: Option<u32>,
    database_flags: BTreeMap<String, String>,
    postgresql_extensions: Vec<String>,
    default_password_length: u32,
    store_passwords_in_secret_manager: bool,
    generate_permission_script: bool,
    use_random_suffix: bool,
    deletion_protection: bool,
    labels: BTreeMap<String, String>,
}

impl Default for RawRequest {
    fn default() -> Self {
        Request::default().into()
    }
}

impl From<RawRequest> for Request {
    fn from(raw: RawRequest) -> Self {
        Self {
            instance_name: raw.instance_name,
            project_id: raw.project_id,
            region: raw.region,
            engine_version: raw.engine_version,
            preset: raw.preset,
            machine_type: raw.machine_type,
            disk_size_gb: raw.disk_size_gb,
            edition: raw.edition,
            availability_type: raw.availability_type,
            disk_autoresize: raw.disk_autoresize,
            disk_autoresize_limit_gb: raw.disk_autoresize_limit_gb,
            databases: raw.databases,
            users: raw.users,
            read_replicas: raw.read_replicas,
            network: NetworkSettings {
                ipv4_enabled: raw.ipv4_enabled,
                private_network: raw.private_network,
                ssl_mode: raw.ssl_mode,
                authorized_networks: raw.authorized_networks,
            },
            backup: BackupSettings {
                backup_enabled: raw.backup_enabled,
                backup_start_time: raw.backup_start_time,
                backup_retention_days: raw.backup_retention_days,
                point_in_time_recovery: raw.point_in_time_recovery,
                transaction_log_retention_days: raw.transaction_log_retention_days,
            },
            insights: InsightsSettings {
                query_insights_enabled: raw.query_insights_enabled,
                query_string_length: raw.query_string_length,
                record_application_tags: raw.record_application_tags,
                record_client_address: raw.record_client_address,
                query_plans_per_minute: raw.query_plans_per_minute,
            },
            maintenance: MaintenanceSettings {
                maintenance_window_day: raw.maintenance_window_day,
                maintenance_window_hour: raw.maintenance_window_hour,
                maintenance_window_update_track: raw.maintenance_window_update_track,
            },
            auto_generate_performance_flags: raw.auto_generate_performance_flags,
            max_connections: raw.max_connections,
            database_flags: raw.database_flags,
            postgresql_extensions: raw.postgresql_extensions,
            default_password_length: raw.default_password_length,
            store_passwords_in_secret_manager: raw.store_passwords_in_secret_manager,
            generate_permission_script: raw.generate_permission_script,
            use_random_suffix: raw.use_random_suffix,
            deletion_protection: raw.deletion_protection,
            labels: raw.labels,
        }
    }
}

impl From<Request> for RawRequest {
    fn from(request: Request) -> Self {
        let Request {
            instance_name,
            project_id,
            region,
            engine_version,
            preset,
            machine_type,
            disk_size_gb,
            edition,
            availability_type,
            disk_autoresize,
            disk_autoresize_limit_gb,
            databases,
            users,
            read_replicas,
            network,
            backup,
            insights,
            maintenance,
            auto_generate_performance_flags,
            max_connections,
            database_flags,
            postgresql_extensions,
            default_password_length,
            store_passwords_in_secret_manager,
            generate_permission_script,
            use_random_suffix,
            deletion_protection,
            labels,
        } = request;

        Self {
            instance_name,
            project_id,
            region,
            engine_version,
            preset,
            machine_type,
            disk_size_gb,
            edition,
            availability_type,
            disk_autoresize,
            disk_autoresize_limit_gb,
            databases,
            users,
            read_replicas,
            ipv4_enabled: network.ipv4_enabled,
            private_network: network.private_network,
            ssl_mode: network.ssl_mode,
            authorized_networks: network.authorized_networks,
            backup_enabled: backup.backup_enabled,
            backup_start_time: backup.backup_start_time,
            backup_retention_days: backup.backup_retention_days,
            point_in_time_recovery: backup.point_in_time_recovery,
            transaction_log_retention_days: backup.transaction_log_retention_days,
            query_insights_enabled: insights.query_insights_enabled,
            query_string_length: insights.query_string_length,
            record_application_tags: insights.record_application_tags,
            record_client_address: insights.record_client_address,
            query_plans_per_minute: insights.query_plans_per_minute,
            maintenance_window_day: maintenance.maintenance_window_day,
            maintenance_window_hour: maintenance.maintenance_window_hour,
            maintenance_window_update_track: maintenance.maintenance_window_update_track,
            auto_generate_performance_flags,
            max_connections,
            database_flags,
            postgresql_extensions,
            default_password_length,
            store_passwords_in_secret_manager,
            generate_permission_script,
            use_random_suffix,
            deletion_protection,
            labels,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSpec {
    /// Default: "UTF8"
    pub charset: Option<String>,
    /// Default: "en_US.UTF8"
    pub collation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct UserSpec {
    /// admin, readwrite or readonly
    pub role: String,
    /// Falls back to the request's `default_password_length`
    pub password_length: Option<u32>,
    /// Reference to an existing secret; disables generation
    pub password_secret: Option<String>,
}

impl UserSpec {
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ReplicaSpec {
    pub region: String,
    pub availability_type: String,
    pub failover_target: bool,
    /// Defaults to the primary's machine type
    pub machine_type: Option<String>,
}

impl Default for ReplicaSpec {
    fn default() -> Self {
        Self {
            region: String::new(),
            availability_type: "ZONAL".to_string(),
            failover_target: false,
            machine_type: None,
        }
    }
}

impl ReplicaSpec {
    pub fn in_region(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NetworkRule {
    pub name: String,
    pub cidr: String,
}

impl NetworkRule {
    pub fn new(name: impl Into<String>, cidr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cidr: cidr.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkSettings {
    pub ipv4_enabled: bool,
    /// VPC self-link for private IP
    pub private_network: Option<String>,
    pub ssl_mode: String,
    pub authorized_networks: Vec<NetworkRule>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            ipv4_enabled: true,
            private_network: None,
            ssl_mode: "ENCRYPTED_ONLY".to_string(),
            authorized_networks: Vec::new(),
        }
    }
}

/// Backup and point-in-time recovery; also the resolved form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackupSettings {
    pub backup_enabled: bool,
    /// `HH:MM`, UTC
    pub backup_start_time: String,
    pub backup_retention_days: u32,
    pub point_in_time_recovery: bool,
    pub transaction_log_retention_days: u32,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            backup_enabled: true,
            backup_start_time: "03:00".to_string(),
            backup_retention_days: 7,
            point_in_time_recovery: true,
            transaction_log_retention_days: 7,
        }
    }
}

/// Query insights; also the resolved form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InsightsSettings {
    pub query_insights_enabled: bool,
    pub query_string_length: u32,
    pub record_application_tags: bool,
    pub record_client_address: bool,
    pub query_plans_per_minute: u32,
}

impl Default for InsightsSettings {
    fn default() -> Self {
        Self {
            query_insights_enabled: true,
            query_string_length: 1024,
            record_application_tags: false,
            record_client_address: false,
            query_plans_per_minute: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MaintenanceSettings {
    /// 1 = Monday .. 7 = Sunday
    pub maintenance_window_day: u32,
    pub maintenance_window_hour: u32,
    pub maintenance_window_update_track: String,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            maintenance_window_day: 7,
            maintenance_window_hour: 3,
            maintenance_window_update_track: "stable".to_string(),
        }
    }
}

fn number_or_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid number '{}'", text))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_yaml_uses_defaults_and_aliases() {
        let yaml = r#"
instance_name: test-perf
project_id: test-project
region: us-central1
use_preset_config: performance
postgres_version: POSTGRES_16
auto_generate_performance_flags: true
max_connections: "500"
ipv4_enabled: true
authorized_networks:
  - name: office
    cidr: 203.0.113.0/24
users:
  app_user:
    role: readwrite
    password_length: 16
"#;
        let request: Request = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(request.preset.as_deref(), Some("performance"));
        assert_eq!(request.engine_version, "POSTGRES_16");
        assert_eq!(request.max_connections, Some(500));
        assert_eq!(request.network.authorized_networks.len(), 1);
        assert_eq!(request.network.ssl_mode, "ENCRYPTED_ONLY");
        assert!(request.backup.backup_enabled);
        assert_eq!(request.maintenance.maintenance_window_update_track, "stable");
        assert_eq!(request.default_password_length, 16);
        let (name, user) = request.users.iter().next().unwrap();
        assert_eq!(name, "app_user");
        assert_eq!(user.password_length, Some(16));
    }

    #[test]
    fn test_misspelled_key_is_rejected() {
        let json = r#"{
            "instance_name": "orders-db",
            "project_id": "test-project",
            "region": "us-central1",
            "postgress_version": "POSTGRES_11"
        }"#;
        let err = serde_json::from_str::<Request>(json).unwrap_err();
        assert!(err.to_string().contains("postgress_version"));

        let yaml = "instance_name: orders-db\nusers:\n  app_user:\n    rol: admin\n";
        assert!(serde_yaml::from_str::<Request>(yaml).is_err());

        let yaml = "instance_name: orders-db\nauthorized_networks:\n  - name: office\n    cidr: 203.0.113.0/24\n    note: hq\n";
        assert!(serde_yaml::from_str::<Request>(yaml).is_err());
    }

    #[test]
    fn test_empty_maps_load_as_empty() {
        let yaml = r#"
instance_name: orders-db
project_id: test-project
region: us-central1
databases: ~
users:
read_replicas: {}
"#;
        let request: Request = serde_yaml::from_str(yaml).unwrap();
        assert!(request.databases.is_empty());
        assert!(request.users.is_empty());
        assert!(request.read_replicas.is_empty());

        let request: Request =
            serde_json::from_str(r#"{"instance_name": "orders-db", "users": null}"#).unwrap();
        assert!(request.users.is_empty());
    }

    #[test]
    fn test_serializes_flat() {
        let mut request = Request::new("orders-db", "test-project", "us-central1");
        request.network.ssl_mode = "TRUSTED_CLIENT_CERTIFICATE_REQUIRED".to_string();
        request.maintenance.maintenance_window_day = 2;

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["ssl_mode"], "TRUSTED_CLIENT_CERTIFICATE_REQUIRED");
        assert_eq!(json["maintenance_window_day"], 2);
        assert!(json.get("network").is_none());

        let back: Request = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_max_connections_accepts_number() {
        let request: Request =
            serde_json::from_str(r#"{"instance_name": "a", "max_connections": 250}"#).unwrap();
        assert_eq!(request.max_connections, Some(250));
    }

    #[test]
    fn test_max_connections_rejects_garbage() {
        let result: Result<Request, _> =
            serde_json::from_str(r#"{"instance_name": "a", "max_connections": "lots"}"#);
        assert!(result.is_err());
    }
}
