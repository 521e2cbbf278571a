use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured data returned by a successful lookup.
///
/// Field values are passed through as the remote service renders them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub vehicle_number: String,
    pub report_date: String,
    pub name_of_ownership: String,
    pub engine_number: String,
    pub vehicle_class: String,
    pub conditions_and_notes: String,
    pub make: String,
    pub model: String,
    pub year_of_manufacture: String,
    pub retrieved_at: DateTime<Utc>,
}

impl VehicleRecord {
    pub fn empty(vehicle_number: impl Into<String>, retrieved_at: DateTime<Utc>) -> Self {
        Self {
            vehicle_number: vehicle_number.into(),
            report_date: String::new(),
            name_of_ownership: String::new(),
            engine_number: String::new(),
            vehicle_class: String::new(),
            conditions_and_notes: String::new(),
            make: String::new(),
            model: String::new(),
            year_of_manufacture: String::new(),
            retrieved_at,
        }
    }
}

/// Terminal, non-crashing outcome for an item that did not yield a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    NetworkError {
        message: String,
    },
    SessionInvalid,
    NotFound,
    ParseError {
        message: String,
    },
    /// Anything caught at the worker boundary that is none of the above.
    #[serde(rename = "internal_error")]
    Internal {
        message: String,
    },
}

impl FailureReason {
    pub fn network(message: impl Into<String>) -> Self {
        FailureReason::NetworkError {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        FailureReason::ParseError {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        FailureReason::Internal {
            message: message.into(),
        }
    }

    /// Stable textual tag used by exports.
    pub fn tag(&self) -> &'static str {
        match self {
            FailureReason::NetworkError { .. } => "network_error",
            FailureReason::SessionInvalid => "session_invalid",
            FailureReason::NotFound => "not_found",
            FailureReason::ParseError { .. } => "parse_error",
            FailureReason::Internal { .. } => "internal_error",
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            FailureReason::NetworkError { message }
            | FailureReason::ParseError { message }
            | FailureReason::Internal { message } => Some(message),
            FailureReason::SessionInvalid | FailureReason::NotFound => None,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NetworkError { message } => write!(f, "network error: {message}"),
            FailureReason::SessionInvalid => write!(f, "session credential rejected"),
            FailureReason::NotFound => write!(f, "no matching vehicle record"),
            FailureReason::ParseError { message } => write!(f, "parse error: {message}"),
            FailureReason::Internal { message } => write!(f, "internal error: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Success { record: VehicleRecord },
    Failed { reason: FailureReason },
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Success { .. })
    }

    pub fn record(&self) -> Option<&VehicleRecord> {
        match self {
            ItemOutcome::Success { record } => Some(record),
            ItemOutcome::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            ItemOutcome::Success { .. } => None,
            ItemOutcome::Failed { reason } => Some(reason),
        }
    }

    pub fn status_tag(&self) -> &'static str {
        match self {
            ItemOutcome::Success { .. } => "success",
            ItemOutcome::Failed { reason } => reason.tag(),
        }
    }
}

impl From<Result<VehicleRecord, FailureReason>> for ItemOutcome {
    fn from(result: Result<VehicleRecord, FailureReason>) -> Self {
        match result {
            Ok(record) => ItemOutcome::Success { record },
            Err(reason) => ItemOutcome::Failed { reason },
        }
    }
}

/// One terminal entry of the result store.
///
/// `position` is the identifier's index in the submitted batch and is what
/// export uses to restore submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub position: usize,
    pub identifier: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
    pub finished_at: DateTime<Utc>,
}
