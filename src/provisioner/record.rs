//! Bookkeeping of what a create attempt has committed

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::provisioner::error::Error;

/// An object committed to the API server during provisioning
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisionStep {
    ServiceAccount,
    Role,
    RoleBinding,
    Cluster,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ProvisionStep::ServiceAccount => "ServiceAccount",
            ProvisionStep::Role => "Role",
            ProvisionStep::RoleBinding => "RoleBinding",
            ProvisionStep::Cluster => "Cluster",
        };
        f.write_str(text)
    }
}

/// Ordered list of steps committed for one cluster
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProvisionRecord {
    pub name: String,
    pub namespace: String,
    steps: Vec<ProvisionStep>,
}

impl ProvisionRecord {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            steps: Vec::new(),
        }
    }

    /// Record a step as committed
    pub fn commit(&mut self, step: ProvisionStep) {
        self.steps.push(step);
    }

    /// Committed steps, oldest first
    pub fn steps(&self) -> &[ProvisionStep] {
        &self.steps
    }

    pub fn contains(&self, step: ProvisionStep) -> bool {
        self.steps.contains(&step)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Remove and return the most recently committed step
    pub(crate) fn pop(&mut self) -> Option<ProvisionStep> {
        self.steps.pop()
    }

    /// Put a step back after a failed retraction
    pub(crate) fn restore(&mut self, step: ProvisionStep) {
        self.steps.push(step);
    }
}

/// A failed create attempt together with whatever it left behind
///
/// `record` lists the objects still present on the API server: empty for a
/// validation failure, and trimmed by any retraction that ran.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct ProvisionFailure {
    #[source]
    pub error: Error,
    pub record: ProvisionRecord,
}

impl ProvisionFailure {
    pub fn new(error: Error, record: ProvisionRecord) -> Self {
        Self { error, record }
    }
}
