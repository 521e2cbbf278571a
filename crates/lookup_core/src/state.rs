use std::fmt;

use serde::{Deserialize, Serialize};

pub type JobId = u64;

/// Lifecycle of one batch run.
///
/// `Pending -> Running -> {Completed, Cancelled}`, with `Failed` reachable
/// only from `Pending`. Nothing leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Cancelled | JobState::Failed
        )
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Running)
                | (JobState::Pending, JobState::Failed)
                | (JobState::Running, JobState::Completed)
                | (JobState::Running, JobState::Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Cancelled => "cancelled",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-identifier status: `Pending -> InProgress -> (Success | Failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    #[default]
    Pending,
    InProgress,
    Success,
    Failed,
}

impl WorkStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkStatus::Success | WorkStatus::Failed)
    }

    /// Transitions are monotonic; nothing regresses or skips `InProgress`.
    pub fn can_advance_to(self, next: WorkStatus) -> bool {
        matches!(
            (self, next),
            (WorkStatus::Pending, WorkStatus::InProgress)
                | (WorkStatus::InProgress, WorkStatus::Success)
                | (WorkStatus::InProgress, WorkStatus::Failed)
        )
    }
}

/// Job state plus the sticky cancellation flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lifecycle {
    state: JobState,
    cancel_requested: bool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    pub(crate) fn set_state(&mut self, next: JobState) {
        debug_assert!(self.state.can_transition_to(next));
        self.state = next;
    }

    pub(crate) fn request_cancel(&mut self) {
        self.cancel_requested = true;
    }
}
