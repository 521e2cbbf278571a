//! Lookup core: pure domain types, validation and the job lifecycle state machine.
mod config;
mod effect;
mod error;
mod identifier;
mod msg;
mod outcome;
mod progress;
mod state;
mod update;

pub use config::{
    LookupConfig, SessionInvalidPolicy, DEFAULT_CONTACT_NUMBER, DEFAULT_DELAY_SECONDS,
    DEFAULT_IDENTIFICATION_NUMBER, DEFAULT_WORKER_COUNT, MAX_DELAY_SECONDS, MAX_WORKER_COUNT,
    MIN_DELAY_SECONDS, MIN_WORKER_COUNT, SESSION_CREDENTIAL_LEN,
};
pub use effect::Effect;
pub use error::{ConfigError, SubmitError};
pub use identifier::{is_valid_identifier, normalize_identifier, prepare_batch};
pub use msg::Msg;
pub use outcome::{FailureReason, ItemOutcome, ItemResult, VehicleRecord};
pub use progress::{estimate_remaining, format_duration, ProgressSnapshot};
pub use state::{JobId, JobState, Lifecycle, WorkStatus};
pub use update::update;
