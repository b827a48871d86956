//! Connection details for a provisioned cluster
//!
//! KubeBlocks publishes credentials for each cluster in a Secret named
//! `<cluster>-conn-credential`. This module reads it and renders a
//! connection string for the cluster's database type.

use std::fmt;

use k8s_openapi::api::core::v1::Secret;
use serde::Serialize;
use tracing::instrument;

use crate::catalog::DatabaseTypeSpec;
use crate::orchestrator::Orchestrator;
use crate::provisioner::error::{Error, Operation, Result};

/// Suffix of the credentials Secret name
pub const CREDENTIAL_SECRET_SUFFIX: &str = "-conn-credential";

/// Name of the credentials Secret for a cluster
pub fn credential_secret_name(cluster_name: &str) -> String {
    format!("{}{}", cluster_name, CREDENTIAL_SECRET_SUFFIX)
}

/// How to reach a database cluster
#[derive(Serialize, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub db_type: String,
    pub host: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub connection_string: String,
}

impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("db_type", &self.db_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ConnectionInfo {
    /// Build connection details from a credentials Secret
    ///
    /// `host` and `port` come from their own keys, falling back to
    /// `endpoint` (`host:port`). Username and password may be absent.
    pub fn from_secret(
        secret: &Secret,
        name: &str,
        namespace: &str,
        db_type: &DatabaseTypeSpec,
    ) -> Result<Self> {
        let data = secret
            .data
            .as_ref()
            .ok_or_else(|| Error::SecretMissingKey("no data in secret".into()))?;

        let read = |key: &str| -> Result<Option<String>> {
            data.get(key)
                .map(|bytes| String::from_utf8(bytes.0.clone()).map_err(|_| Error::InvalidUtf8))
                .transpose()
        };

        let endpoint = read("endpoint")?;
        let (endpoint_host, endpoint_port) = match endpoint.as_deref().and_then(split_endpoint) {
            Some((host, port)) => (Some(host.to_string()), Some(port.to_string())),
            None => (None, None),
        };

        let host = read("host")?
            .filter(|h| !h.is_empty())
            .or(endpoint_host)
            .ok_or_else(|| Error::SecretMissingKey("host".into()))?;
        let port = read("port")?
            .filter(|p| !p.is_empty())
            .or(endpoint_port)
            .ok_or_else(|| Error::SecretMissingKey("port".into()))?;
        let username = read("username")?.unwrap_or_default();
        let password = read("password")?.unwrap_or_default();

        let connection_string = connection_string(db_type.name, &host, &port, &username, &password);

        Ok(Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            db_type: db_type.name.to_string(),
            host,
            port,
            username,
            password,
            connection_string,
        })
    }
}

/// Read the credentials Secret and build connection details
#[instrument(skip(orchestrator, db_type), fields(db_type = %db_type.name))]
pub async fn fetch_connection_info<O: Orchestrator>(
    orchestrator: &O,
    name: &str,
    namespace: &str,
    db_type: &DatabaseTypeSpec,
) -> Result<ConnectionInfo> {
    let secret_name = credential_secret_name(name);
    let Some(secret) = orchestrator
        .get_secret(namespace, &secret_name)
        .await
        .map_err(Error::orchestration(Operation::GetSecret))?
    else {
        return Err(Error::SecretNotFound(secret_name));
    };

    ConnectionInfo::from_secret(&secret, name, namespace, db_type)
}

fn split_endpoint(endpoint: &str) -> Option<(&str, &str)> {
    endpoint
        .rsplit_once(':')
        .filter(|(host, port)| !host.is_empty() && !port.is_empty())
}

/// Render a connection string for a database type
///
/// Credentials are percent-encoded into the userinfo. Kafka and Milvus
/// clients take a bare `host:port` bootstrap address.
pub fn connection_string(
    db_type: &str,
    host: &str,
    port: &str,
    username: &str,
    password: &str,
) -> String {
    let scheme = match db_type {
        "postgresql" => "postgresql",
        "mysql" => "mysql",
        "redis" => "redis",
        "mongodb" => "mongodb",
        _ => return format!("{}:{}", host, port),
    };

    let username = urlencoding::encode(username);
    let password = urlencoding::encode(password);
    let userinfo = match (username.is_empty(), password.is_empty()) {
        (true, true) => String::new(),
        (true, false) => format!(":{}@", password),
        (false, true) => format!("{}@", username),
        (false, false) => format!("{}:{}@", username, password),
    };

    format!("{}://{}{}:{}", scheme, userinfo, host, port)
}
