use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{AvailabilityType, Edition, EngineVersion};

/// Read-only values computed from a resolved plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DerivedOutputs {
    pub instance_name: String,
    /// `project:region:instance`
    pub instance_connection_name: String,
    pub database_names: Vec<String>,
    /// Database name -> unix-socket connection string (no credentials)
    pub connection_strings: BTreeMap<String, String>,
    /// User name -> secret manager id, for generated passwords only
    pub user_secret_ids: BTreeMap<String, String>,
    pub replica_topology: ReplicaTopology,
    pub cloud_sql_proxy_command: String,
    pub metrics_dashboard_url: String,
    pub postgres_info: PostgresInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicaTopology {
    /// Region -> replica instance names, sorted
    pub by_region: BTreeMap<String, Vec<String>>,
    pub failover_target: Option<String>,
    pub replica_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostgresInfo {
    pub engine_version: EngineVersion,
    pub edition: Edition,
    pub machine_type: String,
    pub disk_size_gb: u32,
    pub availability_type: AvailabilityType,
}
