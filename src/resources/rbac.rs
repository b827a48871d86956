//! RBAC resources bound to a database cluster
//!
//! Each cluster gets its own ServiceAccount, a Role granting every verb on
//! every resource in the namespace, and a RoleBinding tying the two together.
//! All three share the cluster's name.

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use kube::core::ObjectMeta;

use crate::resources::common::access_labels;

fn metadata(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(access_labels(name)),
        ..Default::default()
    }
}

/// Generate the ServiceAccount the cluster's pods run as
pub fn generate_service_account(name: &str, namespace: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: metadata(name, namespace),
        ..Default::default()
    }
}

/// Generate a Role with unrestricted access inside the namespace
pub fn generate_role(name: &str, namespace: &str) -> Role {
    Role {
        metadata: metadata(name, namespace),
        rules: Some(vec![PolicyRule {
            api_groups: Some(vec!["*".to_string()]),
            resources: Some(vec!["*".to_string()]),
            verbs: vec!["*".to_string()],
            ..Default::default()
        }]),
    }
}

/// Generate the RoleBinding granting the Role to the ServiceAccount
pub fn generate_role_binding(name: &str, namespace: &str) -> RoleBinding {
    RoleBinding {
        metadata: metadata(name, namespace),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name: name.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: name.to_string(),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }]),
    }
}
