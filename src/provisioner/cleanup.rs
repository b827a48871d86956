//! Retraction of objects left behind by a failed create
//!
//! Walks a `ProvisionRecord` newest-first and deletes each committed object.
//! An object that is already gone counts as retracted.

use tracing::{debug, info, warn};

use crate::orchestrator::Orchestrator;
use crate::provisioner::error::{Error, Operation, Result};
use crate::provisioner::record::{ProvisionRecord, ProvisionStep};

/// Check if a kube error means the object does not exist
pub fn is_not_found_error(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(resp) if resp.code == 404)
}

/// Delete every object in `record`, in reverse commit order
///
/// On failure the step that could not be deleted and everything older stays
/// in the record, so the call can be repeated.
pub async fn retract<O: Orchestrator>(orchestrator: &O, record: &mut ProvisionRecord) -> Result<()> {
    let name = record.name.clone();
    let namespace = record.namespace.clone();

    while let Some(step) = record.pop() {
        let (operation, outcome) = match step {
            ProvisionStep::Cluster => (
                Operation::DeleteCluster,
                orchestrator.delete_cluster(&namespace, &name).await,
            ),
            ProvisionStep::RoleBinding => (
                Operation::DeleteRoleBinding,
                orchestrator.delete_role_binding(&namespace, &name).await,
            ),
            ProvisionStep::Role => (
                Operation::DeleteRole,
                orchestrator.delete_role(&namespace, &name).await,
            ),
            ProvisionStep::ServiceAccount => (
                Operation::DeleteServiceAccount,
                orchestrator.delete_service_account(&namespace, &name).await,
            ),
        };

        match outcome {
            Ok(()) => {
                info!(%name, %namespace, %step, "Retracted");
            }
            Err(e) if is_not_found_error(&e) => {
                debug!(%name, %namespace, %step, "Already gone");
            }
            Err(e) => {
                warn!(%name, %namespace, %step, error = %e, "Failed to retract");
                record.restore(step);
                return Err(Error::orchestration(operation)(e));
            }
        }
    }

    Ok(())
}
