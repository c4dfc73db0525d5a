//! Supported engine versions and extensions
//!
//! The catalog is fixed when a [`crate::Resolver`] is built and never changes
//! afterwards; callers may extend the extension list once at startup.

use pgplan_models::EngineVersion;
use std::collections::BTreeSet;

/// Lowest supported PostgreSQL major version
pub const MIN_ENGINE_VERSION: u32 = 12;
/// Highest supported PostgreSQL major version
pub const MAX_ENGINE_VERSION: u32 = 16;

/// Extensions Cloud SQL for PostgreSQL allows `CREATE EXTENSION` for
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "btree_gin",
    "btree_gist",
    "citext",
    "cube",
    "dblink",
    "earthdistance",
    "fuzzystrmatch",
    "hll",
    "hstore",
    "intarray",
    "isn",
    "lo",
    "ltree",
    "pg_buffercache",
    "pg_cron",
    "pg_partman",
    "pg_prewarm",
    "pg_repack",
    "pg_similarity",
    "pg_stat_statements",
    "pg_trgm",
    "pgaudit",
    "pgcrypto",
    "pgrowlocks",
    "pgstattuple",
    "plpgsql",
    "postgis",
    "postgres_fdw",
    "tablefunc",
    "tsm_system_rows",
    "tsm_system_time",
    "unaccent",
    "uuid-ossp",
    "vector",
];

/// Extensions that only load when a server flag is switched on
pub const EXTENSION_FLAGS: &[(&str, &str, &str)] = &[
    ("pg_cron", "cloudsql.enable_pg_cron", "on"),
    ("pgaudit", "cloudsql.enable_pgaudit", "on"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    engine_versions: BTreeSet<u32>,
    extensions: BTreeSet<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            engine_versions: (MIN_ENGINE_VERSION..=MAX_ENGINE_VERSION).collect(),
            extensions: SUPPORTED_EXTENSIONS.iter().map(|name| name.to_string()).collect(),
        }
    }
}

impl Catalog {
    /// Add extensions on top of the compiled-in list
    pub fn with_extensions<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in extra {
            let name: String = name.into();
            if !name.is_empty() {
                self.extensions.insert(name);
            }
        }
        self
    }

    pub fn supports_engine(&self, version: EngineVersion) -> bool {
        self.engine_versions.contains(&version.major())
    }

    pub fn supports_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    pub fn engine_versions(&self) -> impl Iterator<Item = EngineVersion> + '_ {
        self.engine_versions.iter().copied().map(EngineVersion)
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    /// Server flag an extension needs, if any
    pub fn required_flag(extension: &str) -> Option<(&'static str, &'static str)> {
        EXTENSION_FLAGS
            .iter()
            .find(|(name, _, _)| *name == extension)
            .map(|(_, flag, value)| (*flag, *value))
    }
}
