//! Validation and defaulting of incoming requests
//!
//! Turns a loosely-filled `CreateClusterRequest` into a `ClusterRequest`
//! with every field concrete. Blank and whitespace-only fields count as
//! absent. Nothing here touches the API server.

use crate::catalog::{self, DEFAULT_DATABASE_TYPE};
use crate::provisioner::error::{Error, Result};
use crate::request::{
    ClusterRequest, CreateClusterRequest, DEFAULT_CPU_LIMIT, DEFAULT_CPU_REQUEST,
    DEFAULT_MEMORY_LIMIT, DEFAULT_MEMORY_REQUEST, DEFAULT_STORAGE, ResourceSettings,
};

/// Maximum length of an object name (RFC 1123 label)
pub const MAX_NAME_LENGTH: usize = 63;

/// Validate a create request and fill in defaults
pub fn validate_create(
    request: &CreateClusterRequest,
    default_namespace: &str,
) -> Result<ClusterRequest> {
    let name = request.name.trim();
    validate_name(name)?;
    let namespace = resolve_namespace(request.namespace.as_deref(), default_namespace)?;

    let db_type = non_blank(Some(request.db_type.as_str())).unwrap_or(DEFAULT_DATABASE_TYPE);
    let spec = catalog::lookup(db_type)?;
    let version = catalog::resolve_version(spec.name, request.version.as_deref())?;

    let resources = ResourceSettings {
        cpu_limit: or_default(request.cpu_limit.as_deref(), DEFAULT_CPU_LIMIT),
        memory_limit: or_default(request.memory_limit.as_deref(), DEFAULT_MEMORY_LIMIT),
        cpu_request: or_default(request.cpu_request.as_deref(), DEFAULT_CPU_REQUEST),
        memory_request: or_default(request.memory_request.as_deref(), DEFAULT_MEMORY_REQUEST),
        storage: or_default(request.storage.as_deref(), DEFAULT_STORAGE),
    };

    Ok(ClusterRequest {
        name: name.to_string(),
        namespace,
        db_type: spec,
        version,
        resources,
    })
}

/// Validate a cluster name as an RFC 1123 label
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::ValidationError(
            "database name is required".to_string(),
        ));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(Error::ValidationError(format!(
            "database name {:?} exceeds {} characters",
            name, MAX_NAME_LENGTH
        )));
    }

    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let alnum_ends = name.starts_with(|c: char| c.is_ascii_alphanumeric())
        && name.ends_with(|c: char| c.is_ascii_alphanumeric());

    if !valid_chars || !alnum_ends {
        return Err(Error::ValidationError(format!(
            "database name {:?} must consist of lowercase alphanumerics or '-', \
             and start and end with an alphanumeric",
            name
        )));
    }

    Ok(())
}

/// Namespace from the request, or the configured default when blank
pub fn resolve_namespace(requested: Option<&str>, default_namespace: &str) -> Result<String> {
    match non_blank(requested).or_else(|| non_blank(Some(default_namespace))) {
        Some(ns) => Ok(ns.to_string()),
        None => Err(Error::ValidationError(
            "namespace is empty and no default namespace is configured".to_string(),
        )),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn or_default(value: Option<&str>, default: &str) -> String {
    non_blank(value).unwrap_or(default).to_string()
}
