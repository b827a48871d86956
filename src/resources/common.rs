//! Common utilities for Kubernetes resource generation
//!
//! Constants describing the KubeBlocks Cluster custom resource and the labels
//! shared by every object created for a database cluster.

use std::collections::BTreeMap;

use kube::api::ApiResource;
use kube::core::GroupVersionKind;

/// API group of the KubeBlocks Cluster custom resource
pub const CLUSTER_GROUP: &str = "apps.kubeblocks.io";

/// API version of the KubeBlocks Cluster custom resource
pub const CLUSTER_VERSION: &str = "v1alpha1";

/// Kind of the KubeBlocks Cluster custom resource
pub const CLUSTER_KIND: &str = "Cluster";

/// Plural resource name of the KubeBlocks Cluster custom resource
pub const CLUSTER_PLURAL: &str = "clusters";

/// Finalizer that makes KubeBlocks finish teardown before the object disappears
pub const CLUSTER_FINALIZER: &str = "cluster.kubeblocks.io/finalizer";

/// Label carrying the ClusterDefinition name
pub const DEFINITION_LABEL: &str = "clusterdefinition.kubeblocks.io/name";

/// Label carrying the ClusterVersion name
pub const VERSION_LABEL: &str = "clusterversion.kubeblocks.io/name";

/// Label tying every provisioned object to its database cluster
pub const PROVIDER_LABEL: &str = "sealos-db-provider-cr";

/// Value of `app.kubernetes.io/managed-by` on the RBAC objects
pub const MANAGED_BY: &str = "kbcli";

/// Topology key used for host anti-affinity
pub const HOSTNAME_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";

/// Name of the data volume claim template
pub const DATA_VOLUME: &str = "data";

/// Access mode of the data volume
pub const DATA_ACCESS_MODE: &str = "ReadWriteOnce";

/// ApiResource for the KubeBlocks Cluster custom resource
pub fn cluster_api_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(CLUSTER_GROUP, CLUSTER_VERSION, CLUSTER_KIND),
        CLUSTER_PLURAL,
    )
}

/// Labels for the ServiceAccount, Role and RoleBinding of a database cluster
pub fn access_labels(cluster_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (PROVIDER_LABEL.to_string(), cluster_name.to_string()),
        (
            "app.kubernetes.io/instance".to_string(),
            cluster_name.to_string(),
        ),
        (
            "app.kubernetes.io/managed-by".to_string(),
            MANAGED_BY.to_string(),
        ),
    ])
}
