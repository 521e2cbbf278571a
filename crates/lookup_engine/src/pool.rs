use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use lookup_core::{
    FailureReason, ItemOutcome, LookupConfig, Msg, SessionInvalidPolicy, VehicleRecord,
};
use lookup_logging::{lookup_debug, lookup_error, lookup_warn};
use tokio::task::JoinSet;

use crate::context::JobContext;
use crate::fetch::Fetcher;
use crate::rate_limit::RateLimiter;

#[derive(Debug, Clone, PartialEq)]
pub struct PoolSettings {
    pub workers: usize,
    pub spacing: Duration,
    /// Hard bound around every fetch, whatever the fetcher does internally.
    pub request_timeout: Duration,
    pub session_policy: SessionInvalidPolicy,
}

impl PoolSettings {
    pub fn from_config(config: &LookupConfig, request_timeout: Duration) -> Self {
        Self {
            workers: config.worker_count,
            spacing: config.delay(),
            request_timeout,
            session_policy: config.session_invalid_policy,
        }
    }
}

/// FIFO of item positions, seeded in submission order.
#[derive(Debug)]
struct WorkQueue {
    positions: Mutex<VecDeque<usize>>,
}

impl WorkQueue {
    fn seeded(len: usize) -> Self {
        Self {
            positions: Mutex::new((0..len).collect()),
        }
    }

    fn pop(&self) -> Option<usize> {
        self.positions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

struct Worker {
    id: usize,
    ctx: Arc<JobContext>,
    queue: Arc<WorkQueue>,
    limiter: Arc<RateLimiter>,
    fetcher: Arc<dyn Fetcher>,
    config: Arc<LookupConfig>,
    settings: PoolSettings,
}

/// Fixed-size set of workers sharing one queue and one rate limiter.
pub struct WorkerPool {
    settings: PoolSettings,
    fetcher: Arc<dyn Fetcher>,
    config: Arc<LookupConfig>,
}

impl WorkerPool {
    pub fn new(settings: PoolSettings, fetcher: Arc<dyn Fetcher>, config: LookupConfig) -> Self {
        Self {
            settings,
            fetcher,
            config: Arc::new(config),
        }
    }

    /// Runs every worker to exhaustion or cancellation.
    ///
    /// Returns once no item is `InProgress` any more. Items never dequeued
    /// because cancellation was set stay `Pending`.
    pub async fn run(self, ctx: Arc<JobContext>) {
        let queue = Arc::new(WorkQueue::seeded(ctx.tracker().total()));
        let limiter = Arc::new(RateLimiter::new(self.settings.spacing));

        let mut workers = JoinSet::new();
        for id in 0..self.settings.workers.max(1) {
            let worker = Worker {
                id,
                ctx: ctx.clone(),
                queue: queue.clone(),
                limiter: limiter.clone(),
                fetcher: self.fetcher.clone(),
                config: self.config.clone(),
                settings: self.settings.clone(),
            };
            workers.spawn(worker.run());
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                lookup_error!("Job {} worker task ended abnormally: {}", ctx.job_id(), err);
            }
        }

        // A worker that died mid-item must not leave it in flight forever.
        for position in ctx.tracker().in_progress_positions() {
            ctx.finish_item(
                position,
                ItemOutcome::Failed {
                    reason: FailureReason::internal("worker terminated before finishing"),
                },
            );
        }
    }
}

impl Worker {
    async fn run(self) {
        let job_id = self.ctx.job_id();
        loop {
            let cancel = self.ctx.cancellation();
            if cancel.is_cancelled() {
                break;
            }

            // Dequeue happens under the limiter lock, so issue order follows
            // submission order and an empty queue releases the worker without
            // spending a slot. A position taken but cancelled during the wait
            // is never marked and stays pending.
            let position = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    lookup_debug!("Job {} worker {} cancelled before dispatch", job_id, self.id);
                    break;
                }
                claimed = self.limiter.acquire_for(|| self.queue.pop()) => match claimed {
                    Some((position, _)) => position,
                    None => break,
                },
            };

            if !self.ctx.tracker().mark_in_progress(position) {
                continue;
            }
            let Some(identifier) = self.ctx.tracker().identifier(position).map(str::to_owned) else {
                continue;
            };

            let outcome = ItemOutcome::from(self.attempt(&identifier).await);
            match outcome.failure() {
                None => lookup_debug!("Job {} fetched {}", job_id, identifier),
                Some(reason) => lookup_warn!("Job {} lookup {} failed: {}", job_id, identifier, reason),
            }

            let session_rejected = outcome.failure() == Some(&FailureReason::SessionInvalid);
            self.ctx.finish_item(position, outcome);

            if session_rejected && self.settings.session_policy == SessionInvalidPolicy::CancelJob {
                lookup_warn!("Job {} session rejected, cancelling remaining lookups", job_id);
                self.ctx.apply(Msg::CancelRequested);
            }
        }
    }

    /// One fetch, bounded by the request timeout, with panics caught.
    async fn attempt(&self, identifier: &str) -> Result<VehicleRecord, FailureReason> {
        let fetch = AssertUnwindSafe(self.fetcher.fetch(identifier, &self.config)).catch_unwind();
        match tokio::time::timeout(self.settings.request_timeout, fetch).await {
            Err(_) => Err(FailureReason::network(format!(
                "request timed out after {:?}",
                self.settings.request_timeout
            ))),
            Ok(Err(panic)) => Err(FailureReason::internal(format!(
                "fetch panicked: {}",
                panic_message(panic.as_ref())
            ))),
            Ok(Ok(result)) => result,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
