//! KubeBlocks Cluster descriptor generation
//!
//! Builds the body of the `apps.kubeblocks.io/v1alpha1` Cluster object for a
//! validated request. The result is a schema-less `DynamicObject`, since the
//! Cluster kind is a third-party CRD.
//!
//! Policy baked into every descriptor:
//! - a single component named after the catalog component, one replica
//! - one `data` volume claim, ReadWriteOnce
//! - soft anti-affinity across hosts, shared-node tenancy
//! - `Delete` termination policy plus the KubeBlocks finalizer

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::catalog;
use crate::provisioner::error::Result;
use crate::request::ClusterRequest;
use crate::resources::common::{
    CLUSTER_FINALIZER, DATA_ACCESS_MODE, DATA_VOLUME, DEFINITION_LABEL, HOSTNAME_TOPOLOGY_KEY,
    PROVIDER_LABEL, VERSION_LABEL, cluster_api_resource,
};

/// Replica count of the primary component
pub const COMPONENT_REPLICAS: i32 = 1;

/// Pod anti-affinity strength
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PodAntiAffinity {
    Preferred,
    Required,
}

/// Node tenancy of the cluster's pods
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tenancy {
    SharedNode,
    DedicatedNode,
}

/// What KubeBlocks does with backing resources when the Cluster is deleted
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationPolicy {
    DoNotTerminate,
    Halt,
    Delete,
    WipeOut,
}

/// KubeBlocks Cluster spec
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub affinity: AffinitySpec,
    pub cluster_definition_ref: String,
    pub cluster_version_ref: String,
    pub component_specs: Vec<ComponentSpec>,
    pub termination_policy: TerminationPolicy,
    pub tolerations: Vec<serde_json::Value>,
}

/// Scheduling affinity for all components
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AffinitySpec {
    pub node_labels: BTreeMap<String, String>,
    pub pod_anti_affinity: PodAntiAffinity,
    pub tenancy: Tenancy,
    pub topology_keys: Vec<String>,
}

/// A workload component of the cluster
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub component_def_ref: String,
    pub monitor: bool,
    pub name: String,
    pub replicas: i32,
    pub resources: ComponentResources,
    pub service_account_name: String,
    pub switch_policy: SwitchPolicy,
    pub volume_claim_templates: Vec<VolumeClaimTemplate>,
}

/// CPU and memory limits and requests
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ComponentResources {
    pub limits: ResourceList,
    pub requests: ResourceList,
}

/// Resource quantities for CPU and memory
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ResourceList {
    pub cpu: String,
    pub memory: String,
}

/// Switchover policy of the component
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SwitchPolicy {
    #[serde(rename = "type")]
    pub type_: String,
}

/// Persistent volume claim template
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VolumeClaimTemplate {
    pub name: String,
    pub spec: VolumeClaimSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeClaimSpec {
    pub access_modes: Vec<String>,
    pub resources: StorageResources,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StorageResources {
    pub requests: StorageRequest,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StorageRequest {
    pub storage: String,
}

/// A fully built Cluster object, ready to submit
///
/// Built once per request and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct ClusterDescriptor {
    object: DynamicObject,
    spec: ClusterSpec,
}

impl ClusterDescriptor {
    /// Cluster name
    pub fn name(&self) -> &str {
        self.object.metadata.name.as_deref().unwrap_or_default()
    }

    /// Cluster namespace
    pub fn namespace(&self) -> &str {
        self.object.metadata.namespace.as_deref().unwrap_or_default()
    }

    /// The typed spec the object body was built from
    pub fn spec(&self) -> &ClusterSpec {
        &self.spec
    }

    /// The object submitted to the API server
    pub fn as_object(&self) -> &DynamicObject {
        &self.object
    }

    /// The full object as a JSON tree
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(&self.object)?)
    }
}

/// Build the Cluster descriptor for a validated request
pub fn build_descriptor(request: &ClusterRequest) -> Result<ClusterDescriptor> {
    let db_type = request.db_type;
    let version_ref = catalog::render_version(db_type.version_template, &request.version)?;
    let resources = &request.resources;

    let labels = BTreeMap::from([
        (DEFINITION_LABEL.to_string(), db_type.definition.to_string()),
        (VERSION_LABEL.to_string(), version_ref.clone()),
        (PROVIDER_LABEL.to_string(), request.name.clone()),
    ]);

    let component = ComponentSpec {
        component_def_ref: db_type.component.to_string(),
        monitor: true,
        name: db_type.component.to_string(),
        replicas: COMPONENT_REPLICAS,
        resources: ComponentResources {
            limits: ResourceList {
                cpu: resources.cpu_limit.clone(),
                memory: resources.memory_limit.clone(),
            },
            requests: ResourceList {
                cpu: resources.cpu_request.clone(),
                memory: resources.memory_request.clone(),
            },
        },
        // The ServiceAccount shares the cluster's name
        service_account_name: request.name.clone(),
        switch_policy: SwitchPolicy {
            type_: "Noop".to_string(),
        },
        volume_claim_templates: vec![VolumeClaimTemplate {
            name: DATA_VOLUME.to_string(),
            spec: VolumeClaimSpec {
                access_modes: vec![DATA_ACCESS_MODE.to_string()],
                resources: StorageResources {
                    requests: StorageRequest {
                        storage: resources.storage.clone(),
                    },
                },
            },
        }],
    };

    let spec = ClusterSpec {
        affinity: AffinitySpec {
            node_labels: BTreeMap::new(),
            pod_anti_affinity: PodAntiAffinity::Preferred,
            tenancy: Tenancy::SharedNode,
            topology_keys: vec![HOSTNAME_TOPOLOGY_KEY.to_string()],
        },
        cluster_definition_ref: db_type.definition.to_string(),
        cluster_version_ref: version_ref,
        component_specs: vec![component],
        termination_policy: TerminationPolicy::Delete,
        tolerations: Vec::new(),
    };

    let mut object = DynamicObject::new(&request.name, &cluster_api_resource());
    object.metadata = ObjectMeta {
        name: Some(request.name.clone()),
        namespace: Some(request.namespace.clone()),
        labels: Some(labels),
        finalizers: Some(vec![CLUSTER_FINALIZER.to_string()]),
        ..Default::default()
    };
    object.data = json!({ "spec": serde_json::to_value(&spec)? });

    Ok(ClusterDescriptor { object, spec })
}
