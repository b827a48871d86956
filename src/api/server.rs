//! API router and handlers

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::{ApiError, ApiResponse};
use crate::health::{self, HealthState};
use crate::orchestrator::Orchestrator;
use crate::provisioner::{ProvisionRecord, Provisioner};
use crate::repository::ClusterSummary;
use crate::request::{ClusterRef, CreateClusterRequest, ListClustersRequest};

/// Shared state for API handlers
pub struct AppState<O> {
    pub provisioner: Provisioner<O>,
    pub health: Arc<HealthState>,
}

impl<O: Orchestrator> AppState<O> {
    pub fn new(provisioner: Provisioner<O>, health: Arc<HealthState>) -> Self {
        Self {
            provisioner,
            health,
        }
    }

    fn observe<T>(&self, operation: &str, started: Instant, result: &Result<T, ApiError>) {
        self.health.metrics.record_request(
            operation,
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );
        if let Err(e) = result {
            error!(operation, status = %e.status_code(), error = %e, "Request failed");
        }
    }
}

/// Create the API router, including probe and metrics routes
pub fn create_router<O: Orchestrator + 'static>(state: Arc<AppState<O>>) -> Router {
    let health_router = health::create_router(state.health.clone());

    Router::new()
        .route(
            "/api/databases",
            get(list_databases_query::<O>).post(list_databases_json::<O>),
        )
        .route("/api/databases/create", post(create_database::<O>))
        .route(
            "/api/databases/delete",
            post(delete_database_json::<O>).delete(delete_database_query::<O>),
        )
        .route("/api/databases/connection", get(connection_info::<O>))
        .route("/health", get(health_check))
        .with_state(state)
        .merge(health_router)
}

/// Serve the router until `shutdown` resolves
pub async fn run_server(
    port: u16,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "healthy": true })))
}

async fn create_database<O: Orchestrator + 'static>(
    State(state): State<Arc<AppState<O>>>,
    body: Result<Json<CreateClusterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();
    let result: Result<ProvisionRecord, ApiError> = async {
        let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let record = state.provisioner.create(&request).await?;
        Ok(record)
    }
    .await;
    state.observe("create", started, &result);

    let record = result?;
    let message = format!("Successfully created database cluster '{}'", record.name);
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(message, record))))
}

async fn list_databases_query<O: Orchestrator + 'static>(
    State(state): State<Arc<AppState<O>>>,
    Query(request): Query<ListClustersRequest>,
) -> Result<impl IntoResponse, ApiError> {
    list_databases(&state, request).await
}

async fn list_databases_json<O: Orchestrator + 'static>(
    State(state): State<Arc<AppState<O>>>,
    body: Result<Json<ListClustersRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    list_databases(&state, request).await
}

async fn list_databases<O: Orchestrator>(
    state: &AppState<O>,
    request: ListClustersRequest,
) -> Result<Json<ApiResponse<Vec<ClusterSummary>>>, ApiError> {
    let started = Instant::now();
    let result = state
        .provisioner
        .list(request.namespace.as_deref(), request.db_type.as_deref())
        .await
        .map_err(ApiError::from);
    state.observe("list", started, &result);

    let clusters = result?;
    state
        .health
        .metrics
        .set_clusters_by_phase(clusters.iter().map(|c| c.status.as_str()));

    let namespace = request
        .namespace
        .as_deref()
        .map(str::trim)
        .filter(|ns| !ns.is_empty())
        .unwrap_or(state.provisioner.settings().default_namespace.as_str());
    let message = format!(
        "Found {} database clusters in namespace '{}'",
        clusters.len(),
        namespace
    );
    Ok(Json(ApiResponse::ok(message, clusters)))
}

async fn delete_database_query<O: Orchestrator + 'static>(
    State(state): State<Arc<AppState<O>>>,
    Query(request): Query<ClusterRef>,
) -> Result<impl IntoResponse, ApiError> {
    delete_database(&state, request).await
}

async fn delete_database_json<O: Orchestrator + 'static>(
    State(state): State<Arc<AppState<O>>>,
    body: Result<Json<ClusterRef>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    delete_database(&state, request).await
}

async fn delete_database<O: Orchestrator>(
    state: &AppState<O>,
    request: ClusterRef,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let started = Instant::now();
    let result = state
        .provisioner
        .delete(&request.name, request.namespace.as_deref())
        .await
        .map_err(ApiError::from);
    state.observe("delete", started, &result);

    result?;
    Ok(Json(ApiResponse::message(format!(
        "Successfully deleted database cluster '{}'",
        request.name.trim()
    ))))
}

async fn connection_info<O: Orchestrator + 'static>(
    State(state): State<Arc<AppState<O>>>,
    Query(request): Query<ClusterRef>,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();
    let result = state
        .provisioner
        .connection_info(
            &request.name,
            request.namespace.as_deref(),
            request.db_type.as_deref(),
        )
        .await
        .map_err(ApiError::from);
    state.observe("connection", started, &result);

    let info = result?;
    let message = format!("Connection details for database cluster '{}'", info.name);
    Ok(Json(ApiResponse::ok(message, info)))
}
