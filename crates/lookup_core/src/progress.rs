use std::time::Duration;

use serde::Serialize;

use crate::{JobId, JobState};

/// Point-in-time copy of a job's counters.
///
/// `completed` counts items in a terminal status, so
/// `completed == succeeded + failed` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub job_id: JobId,
    pub state: JobState,
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Failures caused by a rejected session credential. When this is
    /// non-zero the remaining fetches are likely to fail the same way.
    pub session_invalid: usize,
    /// Identifiers currently being fetched.
    pub in_flight: Vec<String>,
    pub elapsed: Duration,
    pub estimated_remaining: Option<Duration>,
}

impl ProgressSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn fraction_done(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64
    }
}

/// Average time per completed item times the items still left.
pub fn estimate_remaining(elapsed: Duration, completed: usize, total: usize) -> Option<Duration> {
    if completed == 0 || completed > total {
        return None;
    }
    let per_item = elapsed.as_secs_f64() / completed as f64;
    Some(Duration::from_secs_f64(per_item * (total - completed) as f64))
}

/// Human readable duration: `1h 2m 3s`, `4m 5s` or `6s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
