//! Kubernetes API access used by the provisioner
//!
//! `Orchestrator` is the narrow set of API verbs the provisioner needs:
//! typed creates for the RBAC objects, schema-less create/list/delete for
//! KubeBlocks Clusters, and a Secret read for connection credentials.
//! `KubeOrchestrator` implements it on top of a `kube::Client`.

use std::future::Future;

use k8s_openapi::api::core::v1::{Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::api::{ApiResource, DeleteParams, DynamicObject, ListParams, PostParams};
use kube::{Api, Client};
use serde_json::Value;
use tracing::warn;

use crate::resources::common::cluster_api_resource;

/// Kubernetes API verbs consumed by the provisioner
///
/// Every method is a single round trip; errors are the API server's own.
pub trait Orchestrator: Send + Sync {
    fn create_service_account(
        &self,
        namespace: &str,
        service_account: &ServiceAccount,
    ) -> impl Future<Output = Result<(), kube::Error>> + Send;

    fn create_role(
        &self,
        namespace: &str,
        role: &Role,
    ) -> impl Future<Output = Result<(), kube::Error>> + Send;

    fn create_role_binding(
        &self,
        namespace: &str,
        role_binding: &RoleBinding,
    ) -> impl Future<Output = Result<(), kube::Error>> + Send;

    fn delete_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<(), kube::Error>> + Send;

    fn delete_role(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<(), kube::Error>> + Send;

    fn delete_role_binding(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<(), kube::Error>> + Send;

    /// Whether the ServiceAccount can be read back from the API server
    fn service_account_exists(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<bool, kube::Error>> + Send;

    fn create_cluster(
        &self,
        namespace: &str,
        cluster: &DynamicObject,
    ) -> impl Future<Output = Result<(), kube::Error>> + Send;

    /// Every Cluster object in the namespace, as loosely-typed JSON trees
    fn list_clusters(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<Vec<Value>, kube::Error>> + Send;

    fn delete_cluster(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<(), kube::Error>> + Send;

    fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<Secret>, kube::Error>> + Send;
}

/// `Orchestrator` backed by a live Kubernetes API server
#[derive(Clone)]
pub struct KubeOrchestrator {
    client: Client,
    cluster_resource: ApiResource,
}

impl KubeOrchestrator {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cluster_resource: cluster_api_resource(),
        }
    }

    fn clusters(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.cluster_resource)
    }
}

impl Orchestrator for KubeOrchestrator {
    async fn create_service_account(
        &self,
        namespace: &str,
        service_account: &ServiceAccount,
    ) -> Result<(), kube::Error> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), service_account).await?;
        Ok(())
    }

    async fn create_role(&self, namespace: &str, role: &Role) -> Result<(), kube::Error> {
        let api: Api<Role> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), role).await?;
        Ok(())
    }

    async fn create_role_binding(
        &self,
        namespace: &str,
        role_binding: &RoleBinding,
    ) -> Result<(), kube::Error> {
        let api: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), role_binding).await?;
        Ok(())
    }

    async fn delete_service_account(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn delete_role(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        let api: Api<Role> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn delete_role_binding(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        let api: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn service_account_exists(&self, namespace: &str, name: &str) -> Result<bool, kube::Error> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?.is_some())
    }

    async fn create_cluster(
        &self,
        namespace: &str,
        cluster: &DynamicObject,
    ) -> Result<(), kube::Error> {
        self.clusters(namespace)
            .create(&PostParams::default(), cluster)
            .await?;
        Ok(())
    }

    async fn list_clusters(&self, namespace: &str) -> Result<Vec<Value>, kube::Error> {
        let list = self.clusters(namespace).list(&ListParams::default()).await?;
        let items = list
            .items
            .into_iter()
            .map(|obj| {
                serde_json::to_value(&obj).unwrap_or_else(|e| {
                    // An unserializable item projects to an empty summary
                    warn!(error = %e, "Failed to convert Cluster object to JSON");
                    Value::Null
                })
            })
            .collect();
        Ok(items)
    }

    async fn delete_cluster(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        self.clusters(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await
    }
}
