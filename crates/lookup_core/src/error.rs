use thiserror::Error;

use crate::config::{
    MAX_DELAY_SECONDS, MAX_WORKER_COUNT, MIN_DELAY_SECONDS, MIN_WORKER_COUNT,
    SESSION_CREDENTIAL_LEN,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("worker count {} outside {}..={}", .0, MIN_WORKER_COUNT, MAX_WORKER_COUNT)]
    WorkerCount(usize),
    #[error("delay {}s outside {}..={} seconds", .0, MIN_DELAY_SECONDS, MAX_DELAY_SECONDS)]
    Delay(f64),
    #[error("session credential must be {} hexadecimal characters", SESSION_CREDENTIAL_LEN)]
    SessionCredential,
    #[error("identification number must not be empty")]
    IdentificationNumber,
    #[error("contact number must not be empty")]
    ContactNumber,
}

/// Job-level rejections. None of these ever start a job.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("a job is already running")]
    JobAlreadyRunning,
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("no vehicle identifiers remain after normalization")]
    EmptyBatch,
    #[error("malformed vehicle identifier {identifier:?}")]
    MalformedIdentifier { identifier: String },
}
