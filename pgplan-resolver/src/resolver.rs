//! Request -> ResolvedPlan
//!
//! Resolution runs in fixed steps and stops at the first failure; no partial
//! plan is ever returned:
//! 1. instance scalars and labels
//! 2. sizing (preset, overrides, disk/autoresize)
//! 3. extensions and performance flags
//! 4. databases, users, replicas
//! 5. network rules
//! 6. backup/HA, insights, maintenance
//! 7. assembly, which adds no further checks

use pgplan_models::{
    AvailabilityType, BackupSettings, Edition, InsightsSettings, MaintenanceWindow, NetworkConfig,
    PerformanceFlags, Request, ResolvedPlan, ResolvedSizing, SslMode, StorageConfig, UpdateTrack,
};
use rand::rngs::OsRng;
use rand::{CryptoRng, Rng, RngCore};
use std::collections::BTreeMap;

use crate::catalog::Catalog;
use crate::entities;
use crate::error::{ErrorKind, PlanError};
use crate::flags;
use crate::presets::{Preset, SizingBuilder};
use crate::secrets::SecretStrategy;
use crate::validators::{self, IdentifierKind};

const MIN_MAX_CONNECTIONS: u32 = 14;
const MAX_MAX_CONNECTIONS: u32 = 262_143;

/// Resolves requests against a fixed catalog.
///
/// The RNG is only used for passwords and the optional instance-name
/// suffix. Production code uses [`OsRng`]; tests pass a seeded `StdRng`.
pub struct Resolver<R = OsRng> {
    catalog: Catalog,
    rng: R,
}

impl Resolver<OsRng> {
    pub fn new() -> Self {
        Self::with_catalog(Catalog::default())
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self::with_rng(catalog, OsRng)
    }
}

impl Default for Resolver<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + CryptoRng> Resolver<R> {
    pub fn with_rng(catalog: Catalog, rng: R) -> Self {
        Self { catalog, rng }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn resolve(&mut self, request: &Request) -> Result<ResolvedPlan, PlanError> {
        // Step 1: instance scalars
        validators::identifier(IdentifierKind::Instance, "instance_name", &request.instance_name)?;
        validators::identifier(IdentifierKind::Project, "project_id", &request.project_id)?;
        validators::identifier(IdentifierKind::Region, "region", &request.region)?;
        let engine_version =
            validators::engine_version(&self.catalog, "engine_version", &request.engine_version)?;
        let labels = resolve_labels(&request.labels)?;
        let instance_name = self.instance_name(request)?;

        // Step 2: sizing
        let sizing = resolve_sizing(request)?;
        let storage = StorageConfig {
            autoresize: request.disk_autoresize,
            autoresize_limit_gb: validators::autoresize_limit(
                sizing.disk_size_gb,
                request.disk_autoresize,
                request.disk_autoresize_limit_gb,
            )?,
        };

        // Step 3: extensions and flags
        let extensions = validators::extensions(&self.catalog, &request.postgresql_extensions)?;
        let flags = resolve_flags(request, &sizing, &extensions)?;

        // Step 4: entities
        let databases = entities::expand_databases(&request.databases)?;
        let strategy = SecretStrategy::new(
            &instance_name,
            request.default_password_length,
            request.store_passwords_in_secret_manager,
        );
        let users = entities::expand_users(&request.users, &strategy, &mut self.rng)?;
        let read_replicas =
            entities::expand_replicas(&request.read_replicas, &instance_name, &sizing.machine_type)?;

        // Step 5: network
        let network = resolve_network(request)?;

        // Step 6: backup/HA, insights, maintenance
        let backup = resolve_backup(&request.backup, &sizing)?;
        let insights = resolve_insights(&request.insights)?;
        let maintenance = resolve_maintenance(request)?;

        // Step 7: assembly
        Ok(ResolvedPlan {
            instance_name,
            project_id: request.project_id.clone(),
            region: request.region.clone(),
            engine_version,
            sizing,
            storage,
            databases,
            users,
            read_replicas,
            flags,
            extensions,
            network,
            backup,
            insights,
            maintenance,
            labels,
            deletion_protection: request.deletion_protection,
            generate_permission_script: request.generate_permission_script,
        })
    }

    fn instance_name(&mut self, request: &Request) -> Result<String, PlanError> {
        if !request.use_random_suffix {
            return Ok(request.instance_name.clone());
        }
        let suffix: u16 = self.rng.gen();
        let name = format!("{}-{:04x}", request.instance_name, suffix);
        validators::identifier(IdentifierKind::Instance, "instance_name", &name)?;
        Ok(name)
    }
}

fn resolve_labels(labels: &BTreeMap<String, String>) -> Result<BTreeMap<String, String>, PlanError> {
    for (key, value) in labels {
        let field = format!("labels.{}", key);
        validators::identifier(IdentifierKind::LabelKey, &field, key)?;
        validators::identifier(IdentifierKind::LabelValue, &field, value)?;
    }
    Ok(labels.clone())
}

fn resolve_sizing(request: &Request) -> Result<ResolvedSizing, PlanError> {
    let preset = request
        .preset
        .as_deref()
        .map(|name| validators::one_of("preset", name, Preset::from_name))
        .transpose()?;
    let edition = request
        .edition
        .as_deref()
        .map(|value| validators::one_of("edition", value, Edition::parse))
        .transpose()?;
    let availability_type = request
        .availability_type
        .as_deref()
        .map(|value| validators::one_of("availability_type", value, AvailabilityType::parse))
        .transpose()?;

    SizingBuilder::new(preset)
        .machine_type(request.machine_type.clone())
        .disk_size_gb(request.disk_size_gb)
        .edition(edition)
        .availability_type(availability_type)
        .build()
}

fn resolve_flags(
    request: &Request,
    sizing: &ResolvedSizing,
    extensions: &[String],
) -> Result<PerformanceFlags, PlanError> {
    for (name, value) in &request.database_flags {
        let field = format!("database_flags.{}", name);
        validators::identifier(IdentifierKind::FlagName, &field, name)?;
        if value.trim().is_empty() {
            return Err(PlanError::new(ErrorKind::UnsupportedValue, field, value));
        }
    }
    let max_connections = effective_max_connections(request)?;

    let derived = if request.auto_generate_performance_flags {
        Some(flags::derive(sizing, max_connections)?)
    } else {
        None
    };
    Ok(flags::merge(
        derived,
        &request.database_flags,
        max_connections,
        extensions,
    ))
}

/// `max_connections` from the request field or an explicit flag. Both are
/// range-checked and must agree when both are set; derived `work_mem` uses
/// the returned value.
fn effective_max_connections(request: &Request) -> Result<Option<u32>, PlanError> {
    if let Some(max_connections) = request.max_connections {
        validators::range(
            "max_connections",
            max_connections,
            MIN_MAX_CONNECTIONS,
            MAX_MAX_CONNECTIONS,
        )?;
    }

    let Some(raw) = request.database_flags.get(flags::MAX_CONNECTIONS) else {
        return Ok(request.max_connections);
    };
    let field = format!("database_flags.{}", flags::MAX_CONNECTIONS);
    let explicit: u32 = raw
        .trim()
        .parse()
        .map_err(|_| PlanError::new(ErrorKind::UnsupportedValue, &field, raw))?;
    validators::range(&field, explicit, MIN_MAX_CONNECTIONS, MAX_MAX_CONNECTIONS)?;

    match request.max_connections {
        Some(requested) if requested != explicit => Err(PlanError::new(
            ErrorKind::ConflictingSettings,
            field,
            format!("{} != {}", explicit, requested),
        )),
        _ => Ok(Some(explicit)),
    }
}

fn resolve_network(request: &Request) -> Result<NetworkConfig, PlanError> {
    let settings = &request.network;
    let rules = &settings.authorized_networks;

    validators::unique_names("authorized_networks", rules.iter().map(|rule| rule.name.as_str()))?;
    for rule in rules {
        let field = format!("authorized_networks.{}", rule.name);
        validators::identifier(IdentifierKind::NetworkRule, &field, &rule.name)?;
        validators::cidr(&field, &rule.cidr)?;
    }

    let ssl_mode = validators::one_of("ssl_mode", &settings.ssl_mode, SslMode::parse)?;

    if let Some(private_network) = &settings.private_network {
        validators::identifier(IdentifierKind::PrivateNetwork, "private_network", private_network)?;
    }
    if !settings.ipv4_enabled {
        if settings.private_network.is_none() {
            return Err(PlanError::new(ErrorKind::ConflictingSettings, "ipv4_enabled", false));
        }
        if let Some(rule) = rules.first() {
            return Err(PlanError::new(
                ErrorKind::ConflictingSettings,
                format!("authorized_networks.{}", rule.name),
                &rule.cidr,
            ));
        }
    }

    Ok(NetworkConfig {
        ipv4_enabled: settings.ipv4_enabled,
        private_network: settings.private_network.clone(),
        ssl_mode,
        authorized_networks: rules.clone(),
    })
}

fn resolve_backup(
    backup: &BackupSettings,
    sizing: &ResolvedSizing,
) -> Result<BackupSettings, PlanError> {
    validators::start_time("backup_start_time", &backup.backup_start_time)?;
    validators::range("backup_retention_days", backup.backup_retention_days, 1, 365)?;
    let max_log_days = match sizing.edition {
        Edition::Enterprise => 7,
        Edition::EnterprisePlus => 35,
    };
    validators::range(
        "transaction_log_retention_days",
        backup.transaction_log_retention_days,
        1,
        max_log_days,
    )?;

    if !backup.backup_enabled {
        if backup.point_in_time_recovery {
            return Err(PlanError::new(
                ErrorKind::ConflictingSettings,
                "point_in_time_recovery",
                true,
            ));
        }
        if sizing.availability_type == AvailabilityType::Regional {
            return Err(PlanError::new(
                ErrorKind::ConflictingSettings,
                "availability_type",
                sizing.availability_type.as_str(),
            ));
        }
    }
    Ok(backup.clone())
}

fn resolve_insights(insights: &InsightsSettings) -> Result<InsightsSettings, PlanError> {
    validators::range("query_string_length", insights.query_string_length, 256, 4500)?;
    validators::range("query_plans_per_minute", insights.query_plans_per_minute, 0, 20)?;
    Ok(insights.clone())
}

fn resolve_maintenance(request: &Request) -> Result<MaintenanceWindow, PlanError> {
    let settings = &request.maintenance;
    Ok(MaintenanceWindow {
        day: validators::range("maintenance_window_day", settings.maintenance_window_day, 1, 7)?,
        hour: validators::range("maintenance_window_hour", settings.maintenance_window_hour, 0, 23)?,
        update_track: validators::one_of(
            "maintenance_window_update_track",
            &settings.maintenance_window_update_track,
            UpdateTrack::parse,
        )?,
    })
}
