//! Projection of KubeBlocks Cluster objects into flat summaries
//!
//! The objects come back from the API server as loosely-typed JSON. Every
//! lookup here is optional: a missing or wrongly-typed field yields an empty
//! string (or zero replicas) and never an error, so one malformed object
//! cannot spoil a listing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog;
use crate::resources::common::{DATA_VOLUME, DEFINITION_LABEL, VERSION_LABEL};

/// Status reported when the cluster has no `status.phase` yet, or a blank one
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Flattened view of one database cluster
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub db_type: String,
    pub version: String,
    pub status: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cpu_limit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memory_limit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cpu_request: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memory_request: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_mode: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub replicas: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account: String,
}

impl ClusterSummary {
    /// Project a Cluster object into a summary
    pub fn from_object(object: &Value) -> Self {
        let metadata = object.get("metadata");
        let definition = label(object, DEFINITION_LABEL);
        // Report the logical type when the definition is one we provision
        let db_type = catalog::definition_to_type(&definition)
            .map(str::to_string)
            .unwrap_or(definition);

        let status = object
            .pointer("/status/phase")
            .and_then(Value::as_str)
            .filter(|phase| !phase.is_empty())
            .unwrap_or(UNKNOWN_STATUS)
            .to_string();

        let component = object.pointer("/spec/componentSpecs/0");
        let data_volume = component
            .and_then(|c| c.get("volumeClaimTemplates"))
            .and_then(Value::as_array)
            .and_then(|templates| {
                templates
                    .iter()
                    .find(|t| t.get("name").and_then(Value::as_str) == Some(DATA_VOLUME))
            });

        Self {
            name: string_at(metadata, "/name"),
            db_type,
            version: label(object, VERSION_LABEL),
            status,
            created_at: string_at(metadata, "/creationTimestamp"),
            cpu_limit: string_at(component, "/resources/limits/cpu"),
            memory_limit: string_at(component, "/resources/limits/memory"),
            cpu_request: string_at(component, "/resources/requests/cpu"),
            memory_request: string_at(component, "/resources/requests/memory"),
            storage: string_at(data_volume, "/spec/resources/requests/storage"),
            access_mode: string_at(data_volume, "/spec/accessModes/0"),
            replicas: component
                .and_then(|c| c.get("replicas"))
                .map(replica_count)
                .unwrap_or(0),
            service_account: string_at(component, "/serviceAccountName"),
        }
    }
}

/// String at a JSON pointer below `node`, or empty
fn string_at(node: Option<&Value>, pointer: &str) -> String {
    node.and_then(|n| n.pointer(pointer))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Value of a metadata label, or empty
///
/// Label keys contain `/`, so they are looked up by key rather than pointer.
fn label(object: &Value, key: &str) -> String {
    object
        .pointer("/metadata/labels")
        .and_then(|labels| labels.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// Replica count from any numeric representation
fn replica_count(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map_or(0, |f| {
            if f.is_finite() { f as i64 } else { 0 }
        }),
        _ => 0,
    }
}
