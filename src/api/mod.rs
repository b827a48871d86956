//! HTTP API for provisioning database clusters
//!
//! JSON endpoints under `/api/databases`, a `/health` check, and the probe
//! and metrics routes from [`crate::health`], all on one listener.

pub mod server;

pub use server::{AppState, create_router, run_server};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::provisioner::{Error, ProvisionFailure};

/// Envelope of every API response
#[derive(Serialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Errors returned by API handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request format: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Provisioner(#[from] Error),

    #[error(transparent)]
    Provision(#[from] ProvisionFailure),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Provisioner(e) => status_for(e),
            ApiError::Provision(failure) => status_for(&failure.error),
        }
    }
}

fn status_for(error: &Error) -> StatusCode {
    if error.is_validation() {
        return StatusCode::BAD_REQUEST;
    }

    match error {
        Error::IdentityNotReady { .. } => StatusCode::GATEWAY_TIMEOUT,
        Error::SecretNotFound(_) => StatusCode::NOT_FOUND,
        Error::OrchestrationError {
            source: kube::Error::Api(resp),
            ..
        } if resp.code == 404 || resp.code == 409 => {
            StatusCode::from_u16(resp.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        // A failed create reports which objects it left behind
        let body = match self {
            ApiError::Provision(failure) if !failure.record.is_empty() => ApiResponse {
                success: false,
                message,
                data: serde_json::to_value(&failure.record).ok(),
            },
            _ => ApiResponse {
                success: false,
                message,
                data: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
