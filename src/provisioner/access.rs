//! Per-cluster identity and permissions
//!
//! Every cluster runs as its own ServiceAccount, bound to a Role with full
//! access inside the namespace. The three objects are created in a fixed
//! order and an existing object fails the attempt.

use tracing::{info, instrument};

use crate::orchestrator::Orchestrator;
use crate::provisioner::error::{Error, Operation, Result};
use crate::provisioner::record::{ProvisionRecord, ProvisionStep};
use crate::resources::rbac::{generate_role, generate_role_binding, generate_service_account};

/// Creates the ServiceAccount, Role, and RoleBinding of a cluster
pub struct AccessBootstrapper<'a, O> {
    orchestrator: &'a O,
}

impl<'a, O: Orchestrator> AccessBootstrapper<'a, O> {
    pub fn new(orchestrator: &'a O) -> Self {
        Self { orchestrator }
    }

    /// Create all three objects, recording each one as it lands
    ///
    /// Stops at the first failure; earlier objects stay committed.
    pub async fn bootstrap(
        &self,
        name: &str,
        namespace: &str,
        record: &mut ProvisionRecord,
    ) -> Result<()> {
        self.create_identity(name, namespace).await?;
        record.commit(ProvisionStep::ServiceAccount);

        self.create_permission_set(name, namespace).await?;
        record.commit(ProvisionStep::Role);

        self.create_permission_binding(name, namespace).await?;
        record.commit(ProvisionStep::RoleBinding);

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create_identity(&self, name: &str, namespace: &str) -> Result<()> {
        let service_account = generate_service_account(name, namespace);
        self.orchestrator
            .create_service_account(namespace, &service_account)
            .await
            .map_err(Error::orchestration(Operation::CreateServiceAccount))?;
        info!("Created ServiceAccount");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create_permission_set(&self, name: &str, namespace: &str) -> Result<()> {
        let role = generate_role(name, namespace);
        self.orchestrator
            .create_role(namespace, &role)
            .await
            .map_err(Error::orchestration(Operation::CreateRole))?;
        info!("Created Role");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create_permission_binding(&self, name: &str, namespace: &str) -> Result<()> {
        let role_binding = generate_role_binding(name, namespace);
        self.orchestrator
            .create_role_binding(namespace, &role_binding)
            .await
            .map_err(Error::orchestration(Operation::CreateRoleBinding))?;
        info!("Created RoleBinding");
        Ok(())
    }
}
