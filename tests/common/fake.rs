//! In-memory `Orchestrator` for driving the provisioner without a cluster
//!
//! Keeps the objects it is asked to create, answers reads from them, and
//! records every call in order. Individual verbs can be told to fail with a
//! given HTTP status, and the ServiceAccount can be made to appear late or
//! never.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use db_provisioner::Orchestrator;
use k8s_openapi::api::core::v1::{Secret, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::ResourceExt;
use kube::api::DynamicObject;
use serde_json::Value;

/// Orchestrator verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    CreateServiceAccount,
    CreateRole,
    CreateRoleBinding,
    DeleteServiceAccount,
    DeleteRole,
    DeleteRoleBinding,
    CheckServiceAccount,
    CreateCluster,
    ListClusters,
    DeleteCluster,
    GetSecret,
}

/// One recorded orchestrator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub verb: Verb,
    pub namespace: String,
    pub name: String,
}

/// When a created ServiceAccount becomes readable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityVisibility {
    Immediate,
    /// Readable from the n-th existence check onwards
    AfterChecks(u32),
    Never,
}

type Key = (String, String);

struct FakeState {
    calls: Vec<Call>,
    failures: HashMap<Verb, u16>,
    visibility: IdentityVisibility,
    identity_checks: u32,
    service_accounts: BTreeSet<Key>,
    roles: BTreeSet<Key>,
    role_bindings: BTreeSet<Key>,
    clusters: Vec<(String, Value)>,
    secrets: HashMap<Key, Secret>,
}

pub struct FakeOrchestrator {
    state: Mutex<FakeState>,
}

impl Default for FakeOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn api_error(code: u16) -> kube::Error {
    let reason = match code {
        404 => "NotFound",
        409 => "AlreadyExists",
        403 => "Forbidden",
        _ => "InternalError",
    };
    kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("fake {} error", reason),
        reason: reason.to_string(),
        code,
    })
}

impl FakeOrchestrator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                calls: Vec::new(),
                failures: HashMap::new(),
                visibility: IdentityVisibility::Immediate,
                identity_checks: 0,
                service_accounts: BTreeSet::new(),
                roles: BTreeSet::new(),
                role_bindings: BTreeSet::new(),
                clusters: Vec::new(),
                secrets: HashMap::new(),
            }),
        }
    }

    /// Make every call of `verb` fail with `code`
    pub fn fail_on(self, verb: Verb, code: u16) -> Self {
        self.state.lock().unwrap().failures.insert(verb, code);
        self
    }

    pub fn with_identity_visibility(self, visibility: IdentityVisibility) -> Self {
        self.state.lock().unwrap().visibility = visibility;
        self
    }

    /// Seed a Cluster object as if it already existed
    pub fn with_cluster(self, namespace: &str, object: Value) -> Self {
        self.state
            .lock()
            .unwrap()
            .clusters
            .push((namespace.to_string(), object));
        self
    }

    pub fn with_secret(self, namespace: &str, secret: Secret) -> Self {
        let key = (namespace.to_string(), secret.name_any());
        self.state.lock().unwrap().secrets.insert(key, secret);
        self
    }

    /// Every call so far, oldest first
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Verbs of every call so far, oldest first
    pub fn verbs(&self) -> Vec<Verb> {
        self.calls().into_iter().map(|c| c.verb).collect()
    }

    pub fn count(&self, verb: Verb) -> usize {
        self.calls().iter().filter(|c| c.verb == verb).count()
    }

    /// Cluster objects currently held in a namespace
    pub fn clusters(&self, namespace: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .clusters
            .iter()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, obj)| obj.clone())
            .collect()
    }

    pub fn has_service_account(&self, namespace: &str, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .service_accounts
            .contains(&(namespace.to_string(), name.to_string()))
    }

    pub fn has_role(&self, namespace: &str, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .roles
            .contains(&(namespace.to_string(), name.to_string()))
    }

    pub fn has_role_binding(&self, namespace: &str, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .role_bindings
            .contains(&(namespace.to_string(), name.to_string()))
    }

    /// Record a call and return the configured failure for its verb, if any
    fn enter(&self, verb: Verb, namespace: &str, name: &str) -> Result<(), kube::Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call {
            verb,
            namespace: namespace.to_string(),
            name: name.to_string(),
        });
        match state.failures.get(&verb) {
            Some(code) => Err(api_error(*code)),
            None => Ok(()),
        }
    }

    fn insert(
        &self,
        select: impl FnOnce(&mut FakeState) -> &mut BTreeSet<Key>,
        namespace: &str,
        name: &str,
    ) -> Result<(), kube::Error> {
        let mut state = self.state.lock().unwrap();
        if select(&mut state).insert((namespace.to_string(), name.to_string())) {
            Ok(())
        } else {
            Err(api_error(409))
        }
    }

    fn remove(
        &self,
        select: impl FnOnce(&mut FakeState) -> &mut BTreeSet<Key>,
        namespace: &str,
        name: &str,
    ) -> Result<(), kube::Error> {
        let mut state = self.state.lock().unwrap();
        if select(&mut state).remove(&(namespace.to_string(), name.to_string())) {
            Ok(())
        } else {
            Err(api_error(404))
        }
    }
}

impl Orchestrator for FakeOrchestrator {
    async fn create_service_account(
        &self,
        namespace: &str,
        service_account: &ServiceAccount,
    ) -> Result<(), kube::Error> {
        let name = service_account.name_any();
        self.enter(Verb::CreateServiceAccount, namespace, &name)?;
        self.insert(|s| &mut s.service_accounts, namespace, &name)
    }

    async fn create_role(&self, namespace: &str, role: &Role) -> Result<(), kube::Error> {
        let name = role.name_any();
        self.enter(Verb::CreateRole, namespace, &name)?;
        self.insert(|s| &mut s.roles, namespace, &name)
    }

    async fn create_role_binding(
        &self,
        namespace: &str,
        role_binding: &RoleBinding,
    ) -> Result<(), kube::Error> {
        let name = role_binding.name_any();
        self.enter(Verb::CreateRoleBinding, namespace, &name)?;
        self.insert(|s| &mut s.role_bindings, namespace, &name)
    }

    async fn delete_service_account(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        self.enter(Verb::DeleteServiceAccount, namespace, name)?;
        self.remove(|s| &mut s.service_accounts, namespace, name)
    }

    async fn delete_role(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        self.enter(Verb::DeleteRole, namespace, name)?;
        self.remove(|s| &mut s.roles, namespace, name)
    }

    async fn delete_role_binding(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        self.enter(Verb::DeleteRoleBinding, namespace, name)?;
        self.remove(|s| &mut s.role_bindings, namespace, name)
    }

    async fn service_account_exists(&self, namespace: &str, name: &str) -> Result<bool, kube::Error> {
        self.enter(Verb::CheckServiceAccount, namespace, name)?;
        let mut state = self.state.lock().unwrap();
        state.identity_checks += 1;
        let created = state
            .service_accounts
            .contains(&(namespace.to_string(), name.to_string()));
        let visible = match state.visibility {
            IdentityVisibility::Immediate => true,
            IdentityVisibility::AfterChecks(n) => state.identity_checks >= n,
            IdentityVisibility::Never => false,
        };
        Ok(created && visible)
    }

    async fn create_cluster(
        &self,
        namespace: &str,
        cluster: &DynamicObject,
    ) -> Result<(), kube::Error> {
        let name = cluster.name_any();
        self.enter(Verb::CreateCluster, namespace, &name)?;
        let object = serde_json::to_value(cluster).map_err(kube::Error::SerdeError)?;
        let mut state = self.state.lock().unwrap();
        let exists = state.clusters.iter().any(|(ns, obj)| {
            ns == namespace && obj.pointer("/metadata/name").and_then(Value::as_str) == Some(name.as_str())
        });
        if exists {
            return Err(api_error(409));
        }
        state.clusters.push((namespace.to_string(), object));
        Ok(())
    }

    async fn list_clusters(&self, namespace: &str) -> Result<Vec<Value>, kube::Error> {
        self.enter(Verb::ListClusters, namespace, "")?;
        Ok(self.clusters(namespace))
    }

    async fn delete_cluster(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        self.enter(Verb::DeleteCluster, namespace, name)?;
        let mut state = self.state.lock().unwrap();
        let before = state.clusters.len();
        state.clusters.retain(|(ns, obj)| {
            !(ns == namespace && obj.pointer("/metadata/name").and_then(Value::as_str) == Some(name))
        });
        if state.clusters.len() == before {
            return Err(api_error(404));
        }
        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error> {
        self.enter(Verb::GetSecret, namespace, name)?;
        let state = self.state.lock().unwrap();
        Ok(state
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}
