//! Static catalog of supported database types
//!
//! Maps a logical database type (as requested by callers) to the KubeBlocks
//! ClusterDefinition it is provisioned from, the ClusterVersion naming
//! template, and the name of its primary workload component.

use crate::provisioner::error::{Error, Result};

/// Substitution slot used by version templates
const VERSION_SLOT: &str = "%s";

/// Catalog entry for one logical database type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseTypeSpec {
    /// Logical type name used in requests (e.g. "mysql")
    pub name: &'static str,
    /// KubeBlocks ClusterDefinition name
    pub definition: &'static str,
    /// ClusterVersion name template with exactly one `%s` slot
    pub version_template: &'static str,
    /// Name of the primary workload component
    pub component: &'static str,
}

/// Every supported database type
pub static DATABASE_TYPES: &[DatabaseTypeSpec] = &[
    DatabaseTypeSpec {
        name: "postgresql",
        definition: "postgresql",
        version_template: "postgresql-%s",
        component: "postgresql",
    },
    DatabaseTypeSpec {
        name: "mysql",
        definition: "apecloud-mysql",
        version_template: "ac-mysql-%s",
        component: "mysql",
    },
    DatabaseTypeSpec {
        name: "redis",
        definition: "redis",
        version_template: "redis-%s",
        component: "redis",
    },
    DatabaseTypeSpec {
        name: "mongodb",
        definition: "mongodb",
        version_template: "mongodb-%s",
        component: "mongodb",
    },
    DatabaseTypeSpec {
        name: "kafka",
        definition: "kafka",
        version_template: "kafka-%s",
        component: "kafka",
    },
    DatabaseTypeSpec {
        name: "milvus",
        definition: "milvus",
        version_template: "milvus-%s",
        component: "milvus",
    },
];

/// Version used when a request does not name one
pub static DEFAULT_VERSIONS: &[(&str, &str)] = &[
    ("postgresql", "14.8.0"),
    ("mysql", "8.0.30-1"),
    ("redis", "7.0.6"),
    ("mongodb", "6.0"),
    ("kafka", "3.3.2"),
    ("milvus", "2.4.5"),
];

/// Database type used when a request leaves the type blank
pub const DEFAULT_DATABASE_TYPE: &str = "postgresql";

/// Look up the catalog entry for a logical database type
pub fn lookup(db_type: &str) -> Result<&'static DatabaseTypeSpec> {
    DATABASE_TYPES
        .iter()
        .find(|spec| spec.name == db_type)
        .ok_or_else(|| Error::UnsupportedType(db_type.to_string()))
}

/// Default version for a logical database type
pub fn default_version(db_type: &str) -> Result<&'static str> {
    DEFAULT_VERSIONS
        .iter()
        .find(|(name, _)| *name == db_type)
        .map(|(_, version)| *version)
        .ok_or_else(|| Error::NoDefaultVersion(db_type.to_string()))
}

/// Resolve the version to provision: an explicit, non-blank version always wins
pub fn resolve_version(db_type: &str, requested: Option<&str>) -> Result<String> {
    match requested.map(str::trim).filter(|v| !v.is_empty()) {
        Some(version) => Ok(version.to_string()),
        None => default_version(db_type).map(str::to_string),
    }
}

/// Substitute `version` into a single-slot version template
pub fn render_version(template: &'static str, version: &str) -> Result<String> {
    if template.matches(VERSION_SLOT).count() != 1 {
        return Err(Error::InvalidVersionTemplate { template });
    }
    Ok(template.replacen(VERSION_SLOT, version, 1))
}

/// Map a ClusterDefinition name back to its logical database type
pub fn definition_to_type(definition: &str) -> Option<&'static str> {
    DATABASE_TYPES
        .iter()
        .find(|spec| spec.definition == definition)
        .map(|spec| spec.name)
}
