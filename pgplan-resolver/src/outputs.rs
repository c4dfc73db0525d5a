//! Derived outputs for a resolved plan

use pgplan_models::{DerivedOutputs, PostgresInfo, ReplicaTopology, ResolvedPlan};
use std::collections::BTreeMap;

pub const PROXY_PORT: u16 = 5432;

/// Compute the read-only outputs of `plan`. Never fails and never exposes
/// a password.
pub fn derive(plan: &ResolvedPlan) -> DerivedOutputs {
    let connection_name = instance_connection_name(plan);

    let connection_strings = plan
        .databases
        .keys()
        .map(|db| (db.clone(), connection_string(&connection_name, db)))
        .collect();

    let user_secret_ids = plan
        .users
        .iter()
        .filter_map(|(name, user)| {
            user.secret
                .secret_id()
                .map(|id| (name.clone(), id.to_string()))
        })
        .collect();

    DerivedOutputs {
        instance_name: plan.instance_name.clone(),
        database_names: plan.databases.keys().cloned().collect(),
        connection_strings,
        user_secret_ids,
        replica_topology: replica_topology(plan),
        cloud_sql_proxy_command: format!("cloud-sql-proxy {} --port {}", connection_name, PROXY_PORT),
        metrics_dashboard_url: format!(
            "https://console.cloud.google.com/sql/instances/{}/overview?project={}",
            plan.instance_name, plan.project_id
        ),
        postgres_info: PostgresInfo {
            engine_version: plan.engine_version,
            edition: plan.sizing.edition,
            machine_type: plan.sizing.machine_type.clone(),
            disk_size_gb: plan.sizing.disk_size_gb,
            availability_type: plan.sizing.availability_type,
        },
        instance_connection_name: connection_name,
    }
}

fn instance_connection_name(plan: &ResolvedPlan) -> String {
    format!("{}:{}:{}", plan.project_id, plan.region, plan.instance_name)
}

/// Unix-socket form used through the proxy; credentials come from the
/// secret, not the string
fn connection_string(connection_name: &str, database: &str) -> String {
    format!("postgresql:///{}?host=/cloudsql/{}", database, connection_name)
}

fn replica_topology(plan: &ResolvedPlan) -> ReplicaTopology {
    let mut by_region: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for replica in plan.read_replicas.values() {
        by_region
            .entry(replica.region.clone())
            .or_default()
            .push(replica.instance_name.clone());
    }
    for names in by_region.values_mut() {
        names.sort();
    }

    ReplicaTopology {
        by_region,
        failover_target: plan.failover_replica().map(|replica| replica.instance_name.clone()),
        replica_count: plan.read_replicas.len(),
    }
}
