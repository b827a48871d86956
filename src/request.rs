//! Request types accepted by the provisioner

use serde::{Deserialize, Serialize};

use crate::catalog::DatabaseTypeSpec;

/// Default CPU limit
pub const DEFAULT_CPU_LIMIT: &str = "1000m";
/// Default memory limit
pub const DEFAULT_MEMORY_LIMIT: &str = "1024Mi";
/// Default CPU request
pub const DEFAULT_CPU_REQUEST: &str = "100m";
/// Default memory request
pub const DEFAULT_MEMORY_REQUEST: &str = "102Mi";
/// Default data volume size
pub const DEFAULT_STORAGE: &str = "3Gi";

/// Request to create a database cluster, as received from callers
///
/// Every field except `name` may be omitted or blank; blanks are replaced
/// by defaults during validation.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CreateClusterRequest {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub db_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_request: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_request: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
}

impl CreateClusterRequest {
    pub fn new(name: impl Into<String>, db_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db_type: db_type.into(),
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_limits(mut self, cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        self.cpu_limit = Some(cpu.into());
        self.memory_limit = Some(memory.into());
        self
    }

    pub fn with_requests(mut self, cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        self.cpu_request = Some(cpu.into());
        self.memory_request = Some(memory.into());
        self
    }

    pub fn with_storage(mut self, storage: impl Into<String>) -> Self {
        self.storage = Some(storage.into());
        self
    }
}

/// Resource quantities for the primary component, in Kubernetes quantity syntax
///
/// Quantities are passed through verbatim; they are not parsed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ResourceSettings {
    pub cpu_limit: String,
    pub memory_limit: String,
    pub cpu_request: String,
    pub memory_request: String,
    pub storage: String,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            cpu_limit: DEFAULT_CPU_LIMIT.to_string(),
            memory_limit: DEFAULT_MEMORY_LIMIT.to_string(),
            cpu_request: DEFAULT_CPU_REQUEST.to_string(),
            memory_request: DEFAULT_MEMORY_REQUEST.to_string(),
            storage: DEFAULT_STORAGE.to_string(),
        }
    }
}

/// A validated request with every default applied
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterRequest {
    pub name: String,
    pub namespace: String,
    pub db_type: &'static DatabaseTypeSpec,
    /// Resolved version, before template substitution
    pub version: String,
    pub resources: ResourceSettings,
}

/// Query for listing clusters
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ListClustersRequest {
    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(rename = "type", default)]
    pub db_type: Option<String>,
}

/// Request naming a single cluster
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ClusterRef {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(rename = "type", default)]
    pub db_type: Option<String>,
}
