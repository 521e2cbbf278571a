use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lookup_core::{
    estimate_remaining, FailureReason, ItemOutcome, JobId, JobState, ProgressSnapshot, WorkStatus,
};

#[derive(Debug, Default)]
struct Counters {
    in_progress: usize,
    succeeded: usize,
    failed: usize,
    session_invalid: usize,
}

#[derive(Debug)]
struct TrackerState {
    statuses: Vec<WorkStatus>,
    counters: Counters,
    finished: Option<Instant>,
}

impl TrackerState {
    fn elapsed_since(&self, started: Instant) -> Duration {
        match self.finished {
            Some(finished) => finished.duration_since(started),
            None => started.elapsed(),
        }
    }
}

/// Per-identifier status table plus the counters derived from it.
///
/// Status and counters live behind one lock, so a snapshot never mixes
/// counts from before and after an update.
#[derive(Debug)]
pub struct ProgressTracker {
    identifiers: Vec<String>,
    started: Instant,
    state: Mutex<TrackerState>,
}

impl ProgressTracker {
    pub fn new(identifiers: Vec<String>) -> Self {
        let statuses = vec![WorkStatus::Pending; identifiers.len()];
        Self {
            identifiers,
            started: Instant::now(),
            state: Mutex::new(TrackerState {
                statuses,
                counters: Counters::default(),
                finished: None,
            }),
        }
    }

    pub fn total(&self) -> usize {
        self.identifiers.len()
    }

    pub fn identifier(&self, position: usize) -> Option<&str> {
        self.identifiers.get(position).map(String::as_str)
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Run time so far, or the total run time once the job has finished.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed_since(self.started)
    }

    /// Stops the clock. Later calls keep the first finish time.
    pub fn mark_done(&self) {
        let mut state = self.lock();
        if state.finished.is_none() {
            state.finished = Some(Instant::now());
        }
    }

    /// `Pending -> InProgress`. Returns false if the item was already taken.
    pub fn mark_in_progress(&self, position: usize) -> bool {
        let mut state = self.lock();
        if !advance(&mut state.statuses, position, WorkStatus::InProgress) {
            return false;
        }
        state.counters.in_progress += 1;
        true
    }

    /// `InProgress -> Success | Failed`. Returns false on an invalid transition.
    pub fn mark_finished(&self, position: usize, outcome: &ItemOutcome) -> bool {
        let next = if outcome.is_success() {
            WorkStatus::Success
        } else {
            WorkStatus::Failed
        };
        let mut state = self.lock();
        if !advance(&mut state.statuses, position, next) {
            return false;
        }
        let counters = &mut state.counters;
        counters.in_progress -= 1;
        match outcome.failure() {
            None => counters.succeeded += 1,
            Some(reason) => {
                counters.failed += 1;
                if *reason == FailureReason::SessionInvalid {
                    counters.session_invalid += 1;
                }
            }
        }
        true
    }

    pub fn status(&self, position: usize) -> Option<WorkStatus> {
        self.lock().statuses.get(position).copied()
    }

    /// Identifier and status for every item, in submission order.
    pub fn statuses(&self) -> Vec<(String, WorkStatus)> {
        let state = self.lock();
        self.identifiers
            .iter()
            .cloned()
            .zip(state.statuses.iter().copied())
            .collect()
    }

    /// Positions still `InProgress`.
    pub fn in_progress_positions(&self) -> Vec<usize> {
        let state = self.lock();
        state
            .statuses
            .iter()
            .enumerate()
            .filter(|(_, status)| **status == WorkStatus::InProgress)
            .map(|(position, _)| position)
            .collect()
    }

    pub fn snapshot(&self, job_id: JobId, job_state: JobState) -> ProgressSnapshot {
        let state = self.lock();
        let elapsed = state.elapsed_since(self.started);
        let counters = &state.counters;
        let total = self.total();
        let completed = counters.succeeded + counters.failed;
        let in_flight = state
            .statuses
            .iter()
            .zip(&self.identifiers)
            .filter(|(status, _)| **status == WorkStatus::InProgress)
            .map(|(_, identifier)| identifier.clone())
            .collect();
        ProgressSnapshot {
            job_id,
            state: job_state,
            total,
            pending: total - completed - counters.in_progress,
            in_progress: counters.in_progress,
            completed,
            succeeded: counters.succeeded,
            failed: counters.failed,
            session_invalid: counters.session_invalid,
            in_flight,
            elapsed,
            estimated_remaining: if job_state.is_terminal() {
                None
            } else {
                estimate_remaining(elapsed, completed, total)
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn advance(statuses: &mut [WorkStatus], position: usize, next: WorkStatus) -> bool {
    match statuses.get_mut(position) {
        Some(status) if status.can_advance_to(next) => {
            *status = next;
            true
        }
        _ => false,
    }
}
