use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const MIN_WORKER_COUNT: usize = 1;
pub const MAX_WORKER_COUNT: usize = 5;
pub const DEFAULT_WORKER_COUNT: usize = 3;

pub const MIN_DELAY_SECONDS: f64 = 0.5;
pub const MAX_DELAY_SECONDS: f64 = 5.0;
pub const DEFAULT_DELAY_SECONDS: f64 = 2.0;

/// Length of the session cookie value handed out by the remote service.
pub const SESSION_CREDENTIAL_LEN: usize = 32;

pub const DEFAULT_IDENTIFICATION_NUMBER: &str = "2200000000";
pub const DEFAULT_CONTACT_NUMBER: &str = "0777777777";

/// What the job does once a fetch reports that the session was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionInvalidPolicy {
    /// Record the failure and keep going.
    #[default]
    Continue,
    /// Stop dispatching the remaining queue.
    CancelJob,
}

/// Per-job configuration. Immutable once the job starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    pub worker_count: usize,
    pub delay_seconds: f64,
    pub session_credential: String,
    pub fixed_identification_number: String,
    pub fixed_contact_number: String,
    #[serde(default)]
    pub session_invalid_policy: SessionInvalidPolicy,
}

impl LookupConfig {
    pub fn new(session_credential: impl Into<String>) -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            delay_seconds: DEFAULT_DELAY_SECONDS,
            session_credential: session_credential.into(),
            fixed_identification_number: DEFAULT_IDENTIFICATION_NUMBER.to_string(),
            fixed_contact_number: DEFAULT_CONTACT_NUMBER.to_string(),
            session_invalid_policy: SessionInvalidPolicy::default(),
        }
    }

    /// Returns the first violated bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_WORKER_COUNT..=MAX_WORKER_COUNT).contains(&self.worker_count) {
            return Err(ConfigError::WorkerCount(self.worker_count));
        }
        // NaN fails the range check as well.
        if !(MIN_DELAY_SECONDS..=MAX_DELAY_SECONDS).contains(&self.delay_seconds) {
            return Err(ConfigError::Delay(self.delay_seconds));
        }
        if !is_session_credential(&self.session_credential) {
            return Err(ConfigError::SessionCredential);
        }
        if self.fixed_identification_number.trim().is_empty() {
            return Err(ConfigError::IdentificationNumber);
        }
        if self.fixed_contact_number.trim().is_empty() {
            return Err(ConfigError::ContactNumber);
        }
        Ok(())
    }

    /// Minimum spacing between request start times.
    ///
    /// Only meaningful for a validated config.
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_seconds.max(0.0))
    }
}

fn is_session_credential(value: &str) -> bool {
    value.len() == SESSION_CREDENTIAL_LEN && value.chars().all(|c| c.is_ascii_hexdigit())
}
