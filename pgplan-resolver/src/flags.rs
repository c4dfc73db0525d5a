//! Engine tuning flags derived from machine size
//!
//! All sizes are computed in whole megabytes and rendered as `<n>GB` when
//! they divide evenly, `<n>MB` otherwise.

use pgplan_models::{PerformanceFlags, ResolvedSizing};
use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::error::{ErrorKind, PlanError};
use crate::validators::{self, MachineClass};

/// Concurrent connections assumed when `max_connections` is not given
pub const DEFAULT_EXPECTED_CONNECTIONS: u32 = 100;
/// Sorts/hashes one query may run at once, used to split RAM for work_mem
const WORK_MEM_OPERATIONS: u64 = 4;
const WORK_MEM_FLOOR_MB: u64 = 4;
const MAINTENANCE_WORK_MEM_MIN_MB: u64 = 64;
const MAINTENANCE_WORK_MEM_MAX_MB: u64 = 2048;

pub const SHARED_BUFFERS: &str = "shared_buffers";
pub const EFFECTIVE_CACHE_SIZE: &str = "effective_cache_size";
pub const WORK_MEM: &str = "work_mem";
pub const MAINTENANCE_WORK_MEM: &str = "maintenance_work_mem";
pub const MAX_CONNECTIONS: &str = "max_connections";

/// Flags for `sizing`. Shared-core tiers cannot be tuned.
pub fn derive(
    sizing: &ResolvedSizing,
    max_connections: Option<u32>,
) -> Result<PerformanceFlags, PlanError> {
    let memory_mb = match validators::machine_type("machine_type", &sizing.machine_type)? {
        MachineClass::Custom { memory_mb, .. } => u64::from(memory_mb),
        MachineClass::SharedCore => {
            return Err(PlanError::new(
                ErrorKind::InvalidMachineType,
                "machine_type",
                &sizing.machine_type,
            ))
        }
    };

    let connections = u64::from(max_connections.unwrap_or(DEFAULT_EXPECTED_CONNECTIONS).max(1));
    let work_mem = (memory_mb / (WORK_MEM_OPERATIONS * connections)).max(WORK_MEM_FLOOR_MB);
    let maintenance_work_mem =
        (memory_mb * 5 / 100).clamp(MAINTENANCE_WORK_MEM_MIN_MB, MAINTENANCE_WORK_MEM_MAX_MB);

    let mut flags = PerformanceFlags::new();
    flags.insert(SHARED_BUFFERS.to_string(), format_memory(memory_mb * 25 / 100));
    flags.insert(EFFECTIVE_CACHE_SIZE.to_string(), format_memory(memory_mb * 75 / 100));
    flags.insert(WORK_MEM.to_string(), format_memory(work_mem));
    flags.insert(MAINTENANCE_WORK_MEM.to_string(), format_memory(maintenance_work_mem));
    if let Some(max_connections) = max_connections {
        flags.insert(MAX_CONNECTIONS.to_string(), max_connections.to_string());
    }
    Ok(flags)
}

/// Combine derived flags (if any), explicit flags, `max_connections` and
/// flags required by extensions. Explicit values always win per key.
pub fn merge(
    derived: Option<PerformanceFlags>,
    explicit: &BTreeMap<String, String>,
    max_connections: Option<u32>,
    extensions: &[String],
) -> PerformanceFlags {
    let mut flags = derived.unwrap_or_default();
    if let Some(max_connections) = max_connections {
        flags
            .entry(MAX_CONNECTIONS.to_string())
            .or_insert_with(|| max_connections.to_string());
    }
    for extension in extensions {
        if let Some((flag, value)) = Catalog::required_flag(extension) {
            flags.entry(flag.to_string()).or_insert_with(|| value.to_string());
        }
    }
    for (name, value) in explicit {
        flags.insert(name.clone(), value.clone());
    }
    flags
}

pub fn format_memory(mb: u64) -> String {
    if mb > 0 && mb % 1024 == 0 {
        format!("{}GB", mb / 1024)
    } else {
        format!("{}MB", mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgplan_models::{AvailabilityType, Edition};

    fn sizing(machine_type: &str) -> ResolvedSizing {
        ResolvedSizing {
            machine_type: machine_type.to_string(),
            disk_size_gb: 100,
            edition: Edition::Enterprise,
            availability_type: AvailabilityType::Zonal,
        }
    }

    #[test]
    fn test_performance_preset_with_500_connections() {
        let flags = derive(&sizing("db-custom-8-32768"), Some(500)).unwrap();
        assert_eq!(flags[SHARED_BUFFERS], "8GB");
        assert_eq!(flags[EFFECTIVE_CACHE_SIZE], "24GB");
        assert_eq!(flags[WORK_MEM], "16MB");
        assert_eq!(flags[MAINTENANCE_WORK_MEM], "1638MB");
        assert_eq!(flags[MAX_CONNECTIONS], "500");
    }

    #[test]
    fn test_budget_default_connections() {
        let flags = derive(&sizing("db-custom-2-7680"), None).unwrap();
        assert_eq!(flags[SHARED_BUFFERS], "1920MB");
        assert_eq!(flags[EFFECTIVE_CACHE_SIZE], "5760MB");
        assert_eq!(flags[WORK_MEM], "19MB");
        assert_eq!(flags[MAINTENANCE_WORK_MEM], "384MB");
        assert!(!flags.contains_key(MAX_CONNECTIONS));
    }

    #[test]
    fn test_bounds_apply() {
        // 1 vCPU / 3840 MB with many connections hits the work_mem floor
        let flags = derive(&sizing("db-custom-1-3840"), Some(5000)).unwrap();
        assert_eq!(flags[WORK_MEM], "4MB");
        assert_eq!(flags[MAINTENANCE_WORK_MEM], "192MB");

        let flags = derive(&sizing("db-custom-96-638976"), None).unwrap();
        assert_eq!(flags[MAINTENANCE_WORK_MEM], "2GB");
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let sizing = sizing("db-custom-4-16384");
        let first = derive(&sizing, Some(200)).unwrap();
        let second = derive(&sizing, Some(200)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_shared_core_cannot_be_tuned() {
        let err = derive(&sizing("db-g1-small"), None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidMachineType);
    }

    #[test]
    fn test_merge_explicit_wins() {
        let derived = derive(&sizing("db-custom-4-16384"), None).unwrap();
        let mut explicit = BTreeMap::new();
        explicit.insert(WORK_MEM.to_string(), "64MB".to_string());
        explicit.insert("log_min_duration_statement".to_string(), "1000".to_string());

        let flags = merge(Some(derived), &explicit, Some(300), &["pgaudit".to_string()]);
        assert_eq!(flags[WORK_MEM], "64MB");
        assert_eq!(flags[SHARED_BUFFERS], "4GB");
        assert_eq!(flags["log_min_duration_statement"], "1000");
        assert_eq!(flags[MAX_CONNECTIONS], "300");
        assert_eq!(flags["cloudsql.enable_pgaudit"], "on");
    }

    #[test]
    fn test_merge_without_derivation_passes_explicit_through() {
        let mut explicit = BTreeMap::new();
        explicit.insert(MAX_CONNECTIONS.to_string(), "250".to_string());
        let flags = merge(None, &explicit, Some(500), &[]);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[MAX_CONNECTIONS], "250");
    }

    #[test]
    fn test_format_memory() {
        assert_eq!(format_memory(8192), "8GB");
        assert_eq!(format_memory(256), "256MB");
        assert_eq!(format_memory(0), "0MB");
    }
}
