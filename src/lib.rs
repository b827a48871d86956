pub mod api;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod health;
pub mod orchestrator;
pub mod provisioner;
pub mod repository;
pub mod request;
pub mod resources;

pub use api::{ApiError, AppState, create_router, run_server};
pub use config::Config;
pub use connection::ConnectionInfo;
pub use health::{HealthState, Metrics};
pub use orchestrator::{KubeOrchestrator, Orchestrator};
pub use provisioner::{
    Error, ProvisionFailure, ProvisionRecord, ProvisionStep, Provisioner, ProvisionerSettings,
    Result,
};
pub use repository::{ClusterRepository, ClusterSummary};
pub use request::CreateClusterRequest;

use std::sync::Arc;

use axum::Router;
use kube::Client;

/// Build the full HTTP application for a Kubernetes client
pub fn build_app(client: Client, config: &Config, health: Arc<HealthState>) -> Router {
    let provisioner = Provisioner::new(
        KubeOrchestrator::new(client),
        config.provisioner_settings(),
    );
    create_router(Arc::new(AppState::new(provisioner, health)))
}
