//! Expansion of the database, user and replica maps into normalized records
//!
//! Names are checked for uniqueness once, then entries are processed in
//! sorted order so the first error is the same whatever order the request
//! was written in. Errors are rooted at `<map>.<name>`.

use pgplan_models::{
    AvailabilityType, DatabaseRecord, DatabaseSpec, NamedEntries, ReplicaRecord, ReplicaSpec,
    UserRecord, UserSpec,
};
use rand::{CryptoRng, RngCore};
use std::collections::BTreeMap;

use crate::error::{ErrorKind, PlanError};
use crate::secrets::SecretStrategy;
use crate::validators::{self, IdentifierKind};

pub const DEFAULT_CHARSET: &str = "UTF8";
pub const DEFAULT_COLLATION: &str = "en_US.UTF8";

pub fn expand_databases(
    specs: &NamedEntries<DatabaseSpec>,
) -> Result<BTreeMap<String, DatabaseRecord>, PlanError> {
    validators::unique_names("databases", specs.names())?;

    let mut records = BTreeMap::new();
    for (name, spec) in specs.sorted() {
        let path = format!("databases.{}", name);
        validators::identifier(IdentifierKind::Database, &path, name)?;

        let charset = non_empty_or(&spec.charset, DEFAULT_CHARSET, "charset").map_err(|e| e.at(&path))?;
        let collation =
            non_empty_or(&spec.collation, DEFAULT_COLLATION, "collation").map_err(|e| e.at(&path))?;

        records.insert(
            name.to_string(),
            DatabaseRecord {
                name: name.to_string(),
                charset,
                collation,
            },
        );
    }
    Ok(records)
}

pub fn expand_users<R: RngCore + CryptoRng>(
    specs: &NamedEntries<UserSpec>,
    strategy: &SecretStrategy<'_>,
    rng: &mut R,
) -> Result<BTreeMap<String, UserRecord>, PlanError> {
    validators::unique_names("users", specs.names())?;

    let mut records = BTreeMap::new();
    for (name, spec) in specs.sorted() {
        let path = format!("users.{}", name);
        validators::identifier(IdentifierKind::User, &path, name)?;

        let role = validators::role("role", &spec.role).map_err(|e| e.at(&path))?;
        let secret = strategy.resolve(name, spec, rng).map_err(|e| e.at(&path))?;

        records.insert(
            name.to_string(),
            UserRecord {
                name: name.to_string(),
                role,
                secret,
            },
        );
    }
    Ok(records)
}

/// Replicas inherit the primary's machine type unless they set their own.
/// Same-region replicas are allowed; only one may be the failover target.
pub fn expand_replicas(
    specs: &NamedEntries<ReplicaSpec>,
    primary_instance: &str,
    primary_machine_type: &str,
) -> Result<BTreeMap<String, ReplicaRecord>, PlanError> {
    validators::unique_names("read_replicas", specs.names())?;

    let mut records: BTreeMap<String, ReplicaRecord> = BTreeMap::new();
    let mut failover_target: Option<&str> = None;
    for (name, spec) in specs.sorted() {
        let path = format!("read_replicas.{}", name);
        validators::identifier(IdentifierKind::Replica, &path, name)?;

        let instance_name = format!("{}-{}", primary_instance, name);
        validators::identifier(IdentifierKind::Instance, "instance_name", &instance_name)
            .map_err(|e| e.at(&path))?;

        validators::identifier(IdentifierKind::Region, "region", &spec.region)
            .map_err(|e| e.at(&path))?;

        let availability_type =
            validators::one_of("availability_type", &spec.availability_type, AvailabilityType::parse)
                .map_err(|e| e.at(&path))?;

        let machine_type = match &spec.machine_type {
            Some(machine_type) => {
                validators::machine_type("machine_type", machine_type).map_err(|e| e.at(&path))?;
                machine_type.clone()
            }
            None => primary_machine_type.to_string(),
        };

        if spec.failover_target {
            if let Some(existing) = failover_target {
                return Err(PlanError::new(
                    ErrorKind::MultipleFailoverTargets,
                    format!("{}.failover_target", path),
                    format!("{}, {}", existing, name),
                ));
            }
            failover_target = Some(name);
        }

        records.insert(
            name.to_string(),
            ReplicaRecord {
                name: name.to_string(),
                instance_name,
                region: spec.region.clone(),
                availability_type,
                failover_target: spec.failover_target,
                machine_type,
            },
        );
    }
    Ok(records)
}

fn non_empty_or(value: &Option<String>, default: &str, field: &str) -> Result<String, PlanError> {
    match value {
        None => Ok(default.to_string()),
        Some(value) if value.trim().is_empty() => {
            Err(PlanError::new(ErrorKind::InvalidIdentifier, field, value))
        }
        Some(value) => Ok(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgplan_models::SecretResolution;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_databases_get_default_encoding() {
        let mut specs = NamedEntries::new();
        specs.push("test_db", DatabaseSpec::default());
        specs.push(
            "app_db",
            DatabaseSpec {
                charset: Some("UTF8".to_string()),
                collation: Some("C".to_string()),
            },
        );

        let records = expand_databases(&specs).unwrap();
        let names: Vec<_> = records.keys().cloned().collect();
        assert_eq!(names, vec!["app_db", "test_db"]);
        assert_eq!(records["test_db"].charset, DEFAULT_CHARSET);
        assert_eq!(records["test_db"].collation, DEFAULT_COLLATION);
        assert_eq!(records["app_db"].collation, "C");
    }

    #[test]
    fn test_duplicate_database_is_reported() {
        let mut specs = NamedEntries::new();
        specs.push("app_db", DatabaseSpec::default());
        specs.push("app_db", DatabaseSpec::default());
        let err = expand_databases(&specs).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateIdentifier);
        assert_eq!(err.field, "databases.app_db");
    }

    #[test]
    fn test_users_roles_are_canonical() {
        let mut specs = NamedEntries::new();
        specs.push("admin_user", UserSpec::with_role("Admin"));
        specs.push("readonly_user", UserSpec::with_role("READONLY"));
        let strategy = SecretStrategy::new("test-users", 16, false);
        let records = expand_users(&specs, &strategy, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(records["admin_user"].role.as_str(), "admin");
        assert_eq!(records["readonly_user"].role.as_str(), "readonly");
        assert!(matches!(records["admin_user"].secret, SecretResolution::Generated { .. }));
    }

    #[test]
    fn test_unknown_role_names_the_user() {
        let mut specs = NamedEntries::new();
        specs.push("admin_user", UserSpec::with_role("superuser"));
        let strategy = SecretStrategy::new("test-users", 16, false);
        let err = expand_users(&specs, &strategy, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownRole);
        assert_eq!(err.field, "users.admin_user.role");
        assert_eq!(err.value, "superuser");
    }

    #[test]
    fn test_short_password_names_the_user() {
        let mut specs = NamedEntries::new();
        specs.push(
            "app_user",
            UserSpec {
                role: "readwrite".to_string(),
                password_length: Some(4),
                password_secret: None,
            },
        );
        let strategy = SecretStrategy::new("test-users", 16, false);
        let err = expand_users(&specs, &strategy, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::PasswordTooShort);
        assert_eq!(err.field, "users.app_user.password_length");
    }

    #[test]
    fn test_replicas_inherit_machine_type() {
        let mut specs = NamedEntries::new();
        specs.push("replica1", ReplicaSpec::in_region("us-east1"));
        specs.push(
            "replica2",
            ReplicaSpec {
                region: "us-central1".to_string(),
                availability_type: "REGIONAL".to_string(),
                failover_target: true,
                machine_type: Some("db-custom-2-7680".to_string()),
            },
        );
        let records = expand_replicas(&specs, "orders", "db-custom-4-16384").unwrap();
        assert_eq!(records["replica1"].instance_name, "orders-replica1");
        assert_eq!(records["replica1"].machine_type, "db-custom-4-16384");
        assert_eq!(records["replica1"].availability_type, AvailabilityType::Zonal);
        assert_eq!(records["replica2"].machine_type, "db-custom-2-7680");
        assert!(records["replica2"].failover_target);
    }

    #[test]
    fn test_two_failover_targets_fail() {
        let mut specs = NamedEntries::new();
        for name in ["b-replica", "a-replica"] {
            specs.push(
                name,
                ReplicaSpec {
                    failover_target: true,
                    ..ReplicaSpec::in_region("us-east1")
                },
            );
        }
        let err = expand_replicas(&specs, "orders", "db-custom-4-16384").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MultipleFailoverTargets);
        assert_eq!(err.field, "read_replicas.b-replica.failover_target");
        assert_eq!(err.value, "a-replica, b-replica");
    }

    #[test]
    fn test_replica_needs_a_region() {
        let mut specs = NamedEntries::new();
        specs.push("replica1", ReplicaSpec::in_region(""));
        let err = expand_replicas(&specs, "orders", "db-custom-4-16384").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidIdentifier);
        assert_eq!(err.field, "read_replicas.replica1.region");
    }

    #[test]
    fn test_replica_availability_enum() {
        let mut specs = NamedEntries::new();
        specs.push(
            "replica1",
            ReplicaSpec {
                availability_type: "MULTI_REGION".to_string(),
                ..ReplicaSpec::in_region("us-east1")
            },
        );
        let err = expand_replicas(&specs, "orders", "db-custom-4-16384").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedValue);
        assert_eq!(err.field, "read_replicas.replica1.availability_type");
    }
}
