use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use lookup_core::{
    update, Effect, ItemOutcome, ItemResult, JobId, JobState, Lifecycle, Msg, ProgressSnapshot,
};
use lookup_logging::{lookup_info, lookup_warn};
use tokio_util::sync::CancellationToken;

use crate::store::ResultStore;
use crate::tracker::ProgressTracker;

/// Everything a running job shares between the controller and its workers.
///
/// Created per submission, handed to the pool explicitly, and dropped once
/// the final results have been released.
#[derive(Debug)]
pub struct JobContext {
    job_id: JobId,
    lifecycle: Mutex<Lifecycle>,
    cancel: CancellationToken,
    tracker: ProgressTracker,
    store: ResultStore,
}

impl JobContext {
    pub fn new(job_id: JobId, identifiers: Vec<String>) -> Self {
        Self {
            job_id,
            lifecycle: Mutex::new(Lifecycle::new()),
            cancel: CancellationToken::new(),
            tracker: ProgressTracker::new(identifiers),
            store: ResultStore::new(),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn state(&self) -> JobState {
        self.lock_lifecycle().state()
    }

    pub fn cancel_requested(&self) -> bool {
        self.lock_lifecycle().cancel_requested()
    }

    /// Token workers check before dequeuing and while waiting to dispatch.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Feeds a lifecycle event through the state machine and carries out
    /// the resulting effects. Returns the state after the event.
    pub fn apply(&self, msg: Msg) -> JobState {
        let (state, effects) = {
            let mut lifecycle = self.lock_lifecycle();
            let (next, effects) = update(*lifecycle, msg);
            // Stop the clock before anyone can observe the terminal state.
            if next.state().is_terminal() {
                self.tracker.mark_done();
            }
            *lifecycle = next;
            (next.state(), effects)
        };

        for effect in effects {
            match effect {
                Effect::StopDispatch => {
                    lookup_info!("Job {} stopping dispatch", self.job_id);
                    self.cancel.cancel();
                }
                Effect::Finished(terminal) => {
                    let snapshot = self.tracker.snapshot(self.job_id, terminal);
                    lookup_info!(
                        "Job {} {}: {} succeeded, {} failed, {} not started",
                        self.job_id,
                        terminal,
                        snapshot.succeeded,
                        snapshot.failed,
                        snapshot.pending
                    );
                }
            }
        }
        state
    }

    /// Records a terminal outcome: result store first, then the status table,
    /// so a terminal status always has a stored result behind it.
    pub fn finish_item(&self, position: usize, outcome: ItemOutcome) {
        let Some(identifier) = self.tracker.identifier(position) else {
            lookup_warn!("Job {} has no item at position {}", self.job_id, position);
            return;
        };
        let result = ItemResult {
            position,
            identifier: identifier.to_string(),
            outcome,
            finished_at: Utc::now(),
        };
        let recorded = result.outcome.clone();
        if !self.store.append(result) {
            lookup_warn!("Job {} ignored duplicate result for {}", self.job_id, identifier);
            return;
        }
        self.tracker.mark_finished(position, &recorded);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.tracker.snapshot(self.job_id, self.state())
    }

    pub fn results(&self) -> Vec<ItemResult> {
        self.store.ordered()
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
