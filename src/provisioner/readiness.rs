//! Wait for a freshly created ServiceAccount to become observable
//!
//! KubeBlocks resolves `serviceAccountName` when it reconciles the Cluster,
//! so the ServiceAccount must be readable before the Cluster is submitted.
//! A read through the API server succeeds as soon as the create returns,
//! while the token controller and informer caches lag behind it, so the
//! poll always waits a settling delay before its first read.

use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::orchestrator::Orchestrator;
use crate::provisioner::error::{BackoffConfig, Error, Operation, Result};

/// Default number of reads before giving up
pub const DEFAULT_POLL_ATTEMPTS: u32 = 10;

/// Default delay before the second read
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default pause between creating the ServiceAccount and the first read
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Bounded poll on ServiceAccount existence
#[derive(Clone, Debug)]
pub struct IdentityPoll {
    pub max_attempts: u32,
    /// Unconditional wait before the first read
    pub settle: Duration,
    pub backoff: BackoffConfig,
}

impl Default for IdentityPoll {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL)
    }
}

impl IdentityPoll {
    /// Exponential backoff starting at `interval`
    ///
    /// The backoff cap never drops below `interval` itself.
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        let defaults = BackoffConfig::default();
        Self {
            max_attempts,
            settle: DEFAULT_SETTLE_DELAY,
            backoff: BackoffConfig {
                initial_delay: interval,
                max_delay: defaults.max_delay.max(interval),
                ..defaults
            },
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Poll until the ServiceAccount is readable
    ///
    /// Returns the number of reads it took. A read that fails outright is not
    /// retried; only "not there yet" is.
    #[instrument(skip(self, orchestrator))]
    pub async fn wait<O: Orchestrator>(
        &self,
        orchestrator: &O,
        name: &str,
        namespace: &str,
    ) -> Result<u32> {
        let attempts = self.max_attempts.max(1);

        if !self.settle.is_zero() {
            debug!(
                settle_ms = self.settle.as_millis() as u64,
                "Waiting for ServiceAccount to settle"
            );
            tokio::time::sleep(self.settle).await;
        }

        for attempt in 0..attempts {
            let exists = orchestrator
                .service_account_exists(namespace, name)
                .await
                .map_err(Error::orchestration(Operation::CheckServiceAccount))?;

            if exists {
                debug!(attempt = attempt + 1, "ServiceAccount is observable");
                return Ok(attempt + 1);
            }

            if attempt + 1 < attempts {
                let delay = self.backoff.delay_for_attempt(attempt);
                debug!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "ServiceAccount not yet observable"
                );
                tokio::time::sleep(delay).await;
            }
        }

        warn!(attempts, "ServiceAccount never became observable");
        Err(Error::IdentityNotReady {
            name: name.to_string(),
            namespace: namespace.to_string(),
            attempts,
        })
    }
}
