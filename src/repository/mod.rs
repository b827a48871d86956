//! Cluster object storage
//!
//! Create, list, and delete KubeBlocks Cluster objects through the
//! schema-less interface, projecting list results into `ClusterSummary`.

pub mod summary;

pub use summary::ClusterSummary;

use tracing::{debug, info, instrument};

use crate::orchestrator::Orchestrator;
use crate::provisioner::error::{Error, Operation, Result};
use crate::resources::cluster::ClusterDescriptor;

/// Create, list, and delete Cluster objects
pub struct ClusterRepository<'a, O> {
    orchestrator: &'a O,
}

impl<'a, O: Orchestrator> ClusterRepository<'a, O> {
    pub fn new(orchestrator: &'a O) -> Self {
        Self { orchestrator }
    }

    /// Submit a Cluster object
    ///
    /// No existence pre-check; a name collision surfaces as the API server's
    /// AlreadyExists error.
    #[instrument(skip(self, descriptor), fields(name = %descriptor.name()))]
    pub async fn create(&self, namespace: &str, descriptor: &ClusterDescriptor) -> Result<()> {
        self.orchestrator
            .create_cluster(namespace, descriptor.as_object())
            .await
            .map_err(Error::orchestration(Operation::CreateCluster))?;
        info!("Created database cluster");
        Ok(())
    }

    /// List every Cluster in the namespace, optionally keeping one logical type
    ///
    /// A blank filter keeps everything. Filtering happens after projection,
    /// so an object whose type label is missing never matches a filter.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        namespace: &str,
        type_filter: Option<&str>,
    ) -> Result<Vec<ClusterSummary>> {
        let objects = self
            .orchestrator
            .list_clusters(namespace)
            .await
            .map_err(Error::orchestration(Operation::ListClusters))?;

        let filter = type_filter.map(str::trim).filter(|f| !f.is_empty());
        let summaries: Vec<ClusterSummary> = objects
            .iter()
            .map(ClusterSummary::from_object)
            .filter(|summary| filter.is_none_or(|f| summary.db_type == f))
            .collect();

        debug!(
            total = objects.len(),
            matched = summaries.len(),
            "Listed database clusters"
        );
        Ok(summaries)
    }

    /// Delete a Cluster object
    ///
    /// Returns once the API server accepts the deletion; KubeBlocks tears
    /// the cluster down asynchronously behind its finalizer.
    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str, namespace: &str) -> Result<()> {
        self.orchestrator
            .delete_cluster(namespace, name)
            .await
            .map_err(Error::orchestration(Operation::DeleteCluster))?;
        info!("Deleted database cluster");
        Ok(())
    }
}
