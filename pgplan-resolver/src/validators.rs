//! Pure predicates over request values
//!
//! Each check returns the value it accepted (parsed where that is useful) or
//! a [`PlanError`] whose field is relative to the caller; callers re-root it
//! with [`PlanError::at`] when the value sits inside an entity.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::net::IpAddr;

use pgplan_models::{EngineVersion, Role};

use crate::catalog::Catalog;
use crate::error::{ErrorKind, PlanError};

/// Smallest disk Cloud SQL provisions
pub const MIN_DISK_SIZE_GB: u32 = 10;
/// Largest disk Cloud SQL provisions
pub const MAX_DISK_SIZE_GB: u32 = 65_536;

static INSTANCE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]([a-z0-9-]{0,78}[a-z0-9])?$").unwrap());
static PROJECT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]{4,28}[a-z0-9]$").unwrap());
static REGION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]+(-[a-z]+)+[0-9]+$").unwrap());
static SQL_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]{0,62}$").unwrap());
static REPLICA_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{0,30}[a-z0-9])?$").unwrap());
static RULE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 _.-]{0,63}$").unwrap());
static LABEL_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_-]{0,62}$").unwrap());
static LABEL_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_-]{0,63}$").unwrap());
static SECRET_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,255}$").unwrap());
static FLAG_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_.]{0,127}$").unwrap());
static PRIVATE_NETWORK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^projects/[a-z][a-z0-9-]{4,28}[a-z0-9]/global/networks/[a-z]([a-z0-9-]{0,61}[a-z0-9])?$").unwrap());
static CUSTOM_MACHINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^db-custom-([0-9]{1,3})-([0-9]{3,7})$").unwrap());
static START_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").unwrap());

const SHARED_CORE_TIERS: &[&str] = &["db-f1-micro", "db-g1-small"];
const RESERVED_DATABASES: &[&str] = &["postgres", "template0", "template1", "cloudsqladmin"];

/// Which naming rule an identifier must follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Instance,
    Project,
    Region,
    Database,
    User,
    Replica,
    NetworkRule,
    LabelKey,
    LabelValue,
    SecretId,
    FlagName,
    PrivateNetwork,
}

impl IdentifierKind {
    fn pattern(&self) -> &'static Regex {
        match self {
            Self::Instance => &INSTANCE_NAME,
            Self::Project => &PROJECT_ID,
            Self::Region => &REGION,
            Self::Database | Self::User => &SQL_NAME,
            Self::Replica => &REPLICA_NAME,
            Self::NetworkRule => &RULE_NAME,
            Self::LabelKey => &LABEL_KEY,
            Self::LabelValue => &LABEL_VALUE,
            Self::SecretId => &SECRET_ID,
            Self::FlagName => &FLAG_NAME,
            Self::PrivateNetwork => &PRIVATE_NETWORK,
        }
    }

    fn is_reserved(&self, value: &str) -> bool {
        match self {
            Self::Database => RESERVED_DATABASES.contains(&value),
            // cloudsqlsuperuser, cloudsqladmin, ... belong to the provider
            Self::User => value == "postgres" || value.starts_with("cloudsql"),
            _ => false,
        }
    }

    /// Label values may be empty; everything else must not be
    fn allows_empty(&self) -> bool {
        matches!(self, Self::LabelValue)
    }
}

pub fn identifier(kind: IdentifierKind, field: &str, value: &str) -> Result<(), PlanError> {
    if value.is_empty() && kind.allows_empty() {
        return Ok(());
    }
    if !kind.pattern().is_match(value) || kind.is_reserved(value) {
        return Err(PlanError::new(ErrorKind::InvalidIdentifier, field, value));
    }
    Ok(())
}

/// Fails on the first name seen twice, reporting it at `<prefix>.<name>`
pub fn unique_names<'a, I>(prefix: &str, names: I) -> Result<(), PlanError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(PlanError::new(
                ErrorKind::DuplicateIdentifier,
                format!("{}.{}", prefix, name),
                name,
            ));
        }
    }
    Ok(())
}

pub fn engine_version(catalog: &Catalog, field: &str, value: &str) -> Result<EngineVersion, PlanError> {
    EngineVersion::parse(value)
        .filter(|version| catalog.supports_engine(*version))
        .ok_or_else(|| PlanError::new(ErrorKind::UnsupportedEngineVersion, field, value))
}

pub fn role(field: &str, value: &str) -> Result<Role, PlanError> {
    Role::parse(value).ok_or_else(|| PlanError::new(ErrorKind::UnknownRole, field, value))
}

/// `addr/prefix` for IPv4 (prefix <= 32) or IPv6 (prefix <= 128)
pub fn cidr(field: &str, value: &str) -> Result<(), PlanError> {
    let invalid = || PlanError::new(ErrorKind::InvalidCidr, field, value);

    let (addr, prefix) = value.split_once('/').ok_or_else(invalid)?;
    let addr: IpAddr = addr.parse().map_err(|_| invalid())?;
    if prefix.is_empty() || prefix.len() > 3 || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
    let max_prefix = match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    if prefix > max_prefix {
        return Err(invalid());
    }
    Ok(())
}

pub fn disk_size(field: &str, disk_size_gb: u32) -> Result<u32, PlanError> {
    if disk_size_gb < MIN_DISK_SIZE_GB {
        return Err(PlanError::new(ErrorKind::DiskSizeTooSmall, field, disk_size_gb));
    }
    if disk_size_gb > MAX_DISK_SIZE_GB {
        return Err(PlanError::new(ErrorKind::OutOfRange, field, disk_size_gb));
    }
    Ok(disk_size_gb)
}

/// Effective autoresize limit: `None` when autoresize is off or unlimited (0)
pub fn autoresize_limit(
    disk_size_gb: u32,
    autoresize: bool,
    limit_gb: Option<u32>,
) -> Result<Option<u32>, PlanError> {
    match limit_gb {
        Some(limit) if autoresize && limit > 0 => {
            if limit < disk_size_gb {
                return Err(PlanError::new(
                    ErrorKind::AutoresizeLimitBelowDiskSize,
                    "disk_autoresize_limit_gb",
                    limit,
                ));
            }
            if limit > MAX_DISK_SIZE_GB {
                return Err(PlanError::new(ErrorKind::OutOfRange, "disk_autoresize_limit_gb", limit));
            }
            Ok(Some(limit))
        }
        _ => Ok(None),
    }
}

/// Each extension must be in the catalog and listed once; order is kept
pub fn extensions(catalog: &Catalog, requested: &[String]) -> Result<Vec<String>, PlanError> {
    let mut seen = HashSet::new();
    for (index, name) in requested.iter().enumerate() {
        let field = format!("postgresql_extensions.{}", index);
        if !catalog.supports_extension(name) {
            return Err(PlanError::new(ErrorKind::UnsupportedExtension, field, name));
        }
        if !seen.insert(name.as_str()) {
            return Err(PlanError::new(ErrorKind::DuplicateIdentifier, field, name));
        }
    }
    Ok(requested.to_vec())
}

/// Parsed machine tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineClass {
    Custom { vcpus: u32, memory_mb: u32 },
    SharedCore,
}

/// `db-custom-<vcpu>-<ram_mb>` within Cloud SQL's shape rules, or a shared-core tier.
///
/// vCPUs: 1 or an even number up to 96. Memory: a multiple of 256 MB, at
/// least 3840 MB, and 0.9 to 6.5 GB per vCPU.
pub fn machine_type(field: &str, value: &str) -> Result<MachineClass, PlanError> {
    if SHARED_CORE_TIERS.contains(&value) {
        return Ok(MachineClass::SharedCore);
    }

    let invalid = || PlanError::new(ErrorKind::InvalidMachineType, field, value);
    let captures = CUSTOM_MACHINE.captures(value).ok_or_else(invalid)?;
    let vcpus: u32 = captures[1].parse().map_err(|_| invalid())?;
    let memory_mb: u32 = captures[2].parse().map_err(|_| invalid())?;

    let vcpus_ok = vcpus == 1 || (vcpus % 2 == 0 && (2..=96).contains(&vcpus));
    let memory_ok = memory_mb % 256 == 0
        && memory_mb >= 3840
        && u64::from(memory_mb) * 10 >= u64::from(vcpus) * 9216
        && u64::from(memory_mb) <= u64::from(vcpus) * 6656;

    if !vcpus_ok || !memory_ok {
        return Err(invalid());
    }
    Ok(MachineClass::Custom { vcpus, memory_mb })
}

pub fn range(field: &str, value: u32, min: u32, max: u32) -> Result<u32, PlanError> {
    if value < min || value > max {
        return Err(PlanError::new(ErrorKind::OutOfRange, field, value));
    }
    Ok(value)
}

/// Parse an enumerated value, failing with `UnsupportedValue`
pub fn one_of<T>(field: &str, value: &str, parse: impl FnOnce(&str) -> Option<T>) -> Result<T, PlanError> {
    parse(value).ok_or_else(|| PlanError::new(ErrorKind::UnsupportedValue, field, value))
}

/// `HH:MM`, 24-hour clock
pub fn start_time(field: &str, value: &str) -> Result<(), PlanError> {
    if !START_TIME.is_match(value) {
        return Err(PlanError::new(ErrorKind::OutOfRange, field, value));
    }
    Ok(())
}
