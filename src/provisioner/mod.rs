//! Database cluster provisioning
//!
//! A create runs as a fixed sequence: validate and default the request, build
//! the Cluster descriptor, create the ServiceAccount, Role, and RoleBinding,
//! wait for the ServiceAccount to be observable, then submit the Cluster.
//! Each object that lands is added to a `ProvisionRecord`. Nothing is rolled
//! back unless retraction is switched on.

pub mod access;
pub mod cleanup;
pub mod error;
pub mod readiness;
pub mod record;
pub mod validation;

pub use error::{BackoffConfig, Error, Operation, Result};
pub use readiness::IdentityPoll;
pub use record::{ProvisionFailure, ProvisionRecord, ProvisionStep};

use tracing::{error, info, instrument, warn};

use crate::catalog;
use crate::connection::{self, ConnectionInfo};
use crate::orchestrator::Orchestrator;
use crate::repository::{ClusterRepository, ClusterSummary};
use crate::request::{ClusterRequest, CreateClusterRequest};
use crate::resources::cluster::{ClusterDescriptor, build_descriptor};
use access::AccessBootstrapper;

/// Provisioner behaviour knobs
#[derive(Clone, Debug)]
pub struct ProvisionerSettings {
    /// Namespace used when a request leaves it blank
    pub default_namespace: String,
    pub identity_poll: IdentityPoll,
    /// Delete committed objects when a create fails part-way
    pub retract_on_failure: bool,
}

impl Default for ProvisionerSettings {
    fn default() -> Self {
        Self {
            default_namespace: "default".to_string(),
            identity_poll: IdentityPoll::default(),
            retract_on_failure: false,
        }
    }
}

/// Creates, lists, and deletes database clusters
pub struct Provisioner<O> {
    orchestrator: O,
    settings: ProvisionerSettings,
}

impl<O: Orchestrator> Provisioner<O> {
    pub fn new(orchestrator: O, settings: ProvisionerSettings) -> Self {
        Self {
            orchestrator,
            settings,
        }
    }

    pub fn orchestrator(&self) -> &O {
        &self.orchestrator
    }

    pub fn settings(&self) -> &ProvisionerSettings {
        &self.settings
    }

    /// Provision a database cluster
    ///
    /// Validation failures are returned before any API call, with an empty
    /// record. Later failures carry the objects committed so far.
    #[instrument(skip(self, request), fields(name = %request.name, db_type = %request.db_type))]
    pub async fn create(
        &self,
        request: &CreateClusterRequest,
    ) -> Result<ProvisionRecord, ProvisionFailure> {
        let (cluster_request, descriptor) = match self.prepare(request) {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(error = %e, "Rejected create request");
                let namespace = validation::resolve_namespace(
                    request.namespace.as_deref(),
                    &self.settings.default_namespace,
                )
                .unwrap_or_default();
                return Err(ProvisionFailure::new(
                    e,
                    ProvisionRecord::new(request.name.trim(), namespace),
                ));
            }
        };
        let name = cluster_request.name.as_str();
        let namespace = cluster_request.namespace.as_str();

        let mut record = ProvisionRecord::new(name, namespace);
        match self.provision(name, namespace, &descriptor, &mut record).await {
            Ok(()) => {
                info!(
                    %namespace,
                    definition = %cluster_request.db_type.definition,
                    version = %cluster_request.version,
                    "Provisioned database cluster"
                );
                Ok(record)
            }
            Err(e) => {
                error!(%namespace, error = %e, steps = ?record.steps(), "Provisioning failed");
                if self.settings.retract_on_failure
                    && !record.is_empty()
                    && let Err(retract_err) = cleanup::retract(&self.orchestrator, &mut record).await
                {
                    warn!(error = %retract_err, remaining = ?record.steps(), "Retraction incomplete");
                }
                Err(ProvisionFailure::new(e, record))
            }
        }
    }

    /// Validate the request and build its descriptor, without any API call
    fn prepare(&self, request: &CreateClusterRequest) -> Result<(ClusterRequest, ClusterDescriptor)> {
        let cluster_request =
            validation::validate_create(request, &self.settings.default_namespace)?;
        let descriptor = build_descriptor(&cluster_request)?;
        Ok((cluster_request, descriptor))
    }

    async fn provision(
        &self,
        name: &str,
        namespace: &str,
        descriptor: &ClusterDescriptor,
        record: &mut ProvisionRecord,
    ) -> Result<()> {
        AccessBootstrapper::new(&self.orchestrator)
            .bootstrap(name, namespace, record)
            .await?;

        self.settings
            .identity_poll
            .wait(&self.orchestrator, name, namespace)
            .await?;

        ClusterRepository::new(&self.orchestrator)
            .create(namespace, descriptor)
            .await?;
        record.commit(ProvisionStep::Cluster);

        Ok(())
    }

    /// List clusters in a namespace, optionally restricted to one type
    pub async fn list(
        &self,
        namespace: Option<&str>,
        type_filter: Option<&str>,
    ) -> Result<Vec<ClusterSummary>> {
        let namespace =
            validation::resolve_namespace(namespace, &self.settings.default_namespace)?;
        ClusterRepository::new(&self.orchestrator)
            .list(&namespace, type_filter)
            .await
    }

    /// Delete a cluster
    ///
    /// Only the Cluster object is deleted; the ServiceAccount, Role, and
    /// RoleBinding remain.
    pub async fn delete(&self, name: &str, namespace: Option<&str>) -> Result<()> {
        let name = name.trim();
        validation::validate_name(name)?;
        let namespace =
            validation::resolve_namespace(namespace, &self.settings.default_namespace)?;
        ClusterRepository::new(&self.orchestrator)
            .delete(name, &namespace)
            .await
    }

    /// Delete every object listed in a record, newest first
    pub async fn retract(&self, record: &mut ProvisionRecord) -> Result<()> {
        cleanup::retract(&self.orchestrator, record).await
    }

    /// Connection details for a cluster
    ///
    /// A blank type defaults the same way create does.
    pub async fn connection_info(
        &self,
        name: &str,
        namespace: Option<&str>,
        db_type: Option<&str>,
    ) -> Result<ConnectionInfo> {
        let name = name.trim();
        validation::validate_name(name)?;
        let namespace =
            validation::resolve_namespace(namespace, &self.settings.default_namespace)?;
        let db_type = db_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(catalog::DEFAULT_DATABASE_TYPE);
        let spec = catalog::lookup(db_type)?;
        connection::fetch_connection_info(&self.orchestrator, name, &namespace, spec).await
    }
}
