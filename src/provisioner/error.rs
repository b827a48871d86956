//! Error types for database cluster provisioning

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Orchestration call that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateServiceAccount,
    CreateRole,
    CreateRoleBinding,
    CheckServiceAccount,
    CreateCluster,
    ListClusters,
    DeleteCluster,
    DeleteServiceAccount,
    DeleteRole,
    DeleteRoleBinding,
    GetSecret,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Operation::CreateServiceAccount => "create ServiceAccount",
            Operation::CreateRole => "create Role",
            Operation::CreateRoleBinding => "create RoleBinding",
            Operation::CheckServiceAccount => "check ServiceAccount",
            Operation::CreateCluster => "create database cluster",
            Operation::ListClusters => "list database clusters",
            Operation::DeleteCluster => "delete database cluster",
            Operation::DeleteServiceAccount => "delete ServiceAccount",
            Operation::DeleteRole => "delete Role",
            Operation::DeleteRoleBinding => "delete RoleBinding",
            Operation::GetSecret => "get connection secret",
        };
        f.write_str(text)
    }
}

/// Error variants are named with the `Error` suffix where they wrap a cause.
#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported database type: {0}")]
    UnsupportedType(String),

    #[error("version not provided and no default available for {0}")]
    NoDefaultVersion(String),

    #[error("invalid version template {template:?}: expected exactly one %s slot")]
    InvalidVersionTemplate { template: &'static str },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("failed to {operation}: {source}")]
    OrchestrationError {
        operation: Operation,
        #[source]
        source: kube::Error,
    },

    #[error("ServiceAccount {namespace}/{name} not observable after {attempts} attempts")]
    IdentityNotReady {
        name: String,
        namespace: String,
        attempts: u32,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Credentials secret not found: {0}")]
    SecretNotFound(String),

    #[error("Secret missing required key: {0}")]
    SecretMissingKey(String),

    #[error("Invalid UTF-8 in secret data")]
    InvalidUtf8,
}

impl Error {
    /// Wrap a Kubernetes API error with the operation that produced it
    pub fn orchestration(operation: Operation) -> impl FnOnce(kube::Error) -> Error {
        move |source| Error::OrchestrationError { operation, source }
    }

    /// Check if this error was raised before any orchestration call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedType(_)
                | Error::NoDefaultVersion(_)
                | Error::InvalidVersionTemplate { .. }
                | Error::ValidationError(_)
        )
    }

    /// Check if this error indicates a resource was not found
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::SecretNotFound(_) => true,
            Error::OrchestrationError { source, .. } => {
                matches!(source, kube::Error::Api(api_err) if api_err.code == 404)
            }
            _ => false,
        }
    }

    /// Check if this error indicates the object already exists
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::OrchestrationError { source: kube::Error::Api(api_err), .. } if api_err.code == 409
        )
    }

    /// The underlying Kubernetes API error, if any
    pub fn kube_error(&self) -> Option<&kube::Error> {
        match self {
            Error::OrchestrationError { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Exponential backoff configuration
#[derive(Clone, Debug)]
pub struct BackoffConfig {
    /// Initial delay for first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for each subsequent retry
    pub multiplier: f64,
    /// Random jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

/// Growth stops here; every later attempt waits the capped delay
const MAX_BACKOFF_EXPONENT: u32 = 32;

impl BackoffConfig {
    /// Calculate the backoff delay for a given retry attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(MAX_BACKOFF_EXPONENT) as i32;
        let base_delay_secs = (self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent))
            .min(self.max_delay.as_secs_f64());

        let jitter_range = base_delay_secs * self.jitter;
        let jitter = rand::random::<f64>() * jitter_range * 2.0 - jitter_range;
        let delay_with_jitter = (base_delay_secs + jitter).max(0.0);

        let capped_delay = delay_with_jitter.min(self.max_delay.as_secs_f64());

        Duration::from_secs_f64(capped_delay)
    }
}
