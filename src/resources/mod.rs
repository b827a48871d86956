pub mod cluster;
pub mod common;
pub mod rbac;

pub use cluster::{ClusterDescriptor, build_descriptor};
pub use common::{CLUSTER_GROUP, CLUSTER_KIND, CLUSTER_PLURAL, CLUSTER_VERSION, cluster_api_resource};
