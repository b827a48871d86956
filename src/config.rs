//! Process configuration from environment variables
//!
//! Every setting has a default; a missing variable is silent, an unparsable
//! one logs a warning and falls back.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::provisioner::readiness::{
    DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL, DEFAULT_SETTLE_DELAY,
};
use crate::provisioner::{IdentityPoll, ProvisionerSettings};

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default target namespace
pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// HTTP listen port (`PORT`)
    pub port: u16,
    /// Namespace used when a request names none (`DEFAULT_NAMESPACE`)
    pub default_namespace: String,
    /// ServiceAccount reads before giving up (`IDENTITY_POLL_ATTEMPTS`)
    pub identity_poll_attempts: u32,
    /// Delay before the second ServiceAccount read (`IDENTITY_POLL_INTERVAL_MS`)
    pub identity_poll_interval: Duration,
    /// Pause before the first ServiceAccount read (`IDENTITY_SETTLE_MS`)
    pub identity_settle: Duration,
    /// Delete committed objects after a failed create (`RETRACT_ON_FAILURE`)
    pub retract_on_failure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            identity_poll_attempts: DEFAULT_POLL_ATTEMPTS,
            identity_poll_interval: DEFAULT_POLL_INTERVAL,
            identity_settle: DEFAULT_SETTLE_DELAY,
            retract_on_failure: false,
        }
    }
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let default_namespace = lookup("DEFAULT_NAMESPACE")
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty())
            .unwrap_or(defaults.default_namespace);

        Self {
            port: parsed(&lookup, "PORT", defaults.port),
            default_namespace,
            identity_poll_attempts: parsed(
                &lookup,
                "IDENTITY_POLL_ATTEMPTS",
                defaults.identity_poll_attempts,
            ),
            identity_poll_interval: Duration::from_millis(parsed(
                &lookup,
                "IDENTITY_POLL_INTERVAL_MS",
                defaults.identity_poll_interval.as_millis() as u64,
            )),
            identity_settle: Duration::from_millis(parsed(
                &lookup,
                "IDENTITY_SETTLE_MS",
                defaults.identity_settle.as_millis() as u64,
            )),
            retract_on_failure: parsed(&lookup, "RETRACT_ON_FAILURE", defaults.retract_on_failure),
        }
    }

    /// Provisioner settings derived from this configuration
    pub fn provisioner_settings(&self) -> ProvisionerSettings {
        ProvisionerSettings {
            default_namespace: self.default_namespace.clone(),
            identity_poll: IdentityPoll::new(
                self.identity_poll_attempts,
                self.identity_poll_interval,
            )
            .with_settle(self.identity_settle),
            retract_on_failure: self.retract_on_failure,
        }
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, fallback = %default, "Invalid configuration value, using default");
            default
        }),
    }
}
