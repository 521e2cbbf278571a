use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lookup_core::{
    prepare_batch, ItemResult, JobId, JobState, LookupConfig, Msg, ProgressSnapshot, SubmitError,
};
use lookup_logging::{lookup_error, lookup_info, lookup_warn, mask_secret};

use crate::context::JobContext;
use crate::fetch::{reqwest_factory, FetchSettings, FetcherFactory};
use crate::pool::{PoolSettings, WorkerPool};

/// Default hard bound for one lookup when the fetcher sets none itself.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelAck {
    /// Dispatch of new items has been stopped. Repeated requests against the
    /// same running job get the same answer.
    Requested,
    /// There is no running job; nothing changed.
    NotRunning,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReleaseError {
    #[error("no job has been submitted")]
    NoJob,
    #[error("job {0} is still running")]
    JobStillRunning(JobId),
}

/// Final state of a released job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub job_id: JobId,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub snapshot: ProgressSnapshot,
    pub results: Vec<ItemResult>,
}

struct ActiveJob {
    ctx: Arc<JobContext>,
    created_at: DateTime<Utc>,
}

/// Owns at most one job at a time and exposes the non-blocking control
/// surface: submit, progress, cancel, results, release.
///
/// Each job runs on its own supervisor thread with a tokio runtime sized to
/// the worker count; none of the methods here wait on in-flight work.
pub struct JobController {
    factory: FetcherFactory,
    request_timeout: Duration,
    next_job_id: AtomicU64,
    active: Mutex<Option<ActiveJob>>,
}

impl JobController {
    pub fn new(factory: FetcherFactory) -> Self {
        Self {
            factory,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            next_job_id: AtomicU64::new(1),
            active: Mutex::new(None),
        }
    }

    /// Controller backed by the real HTTP fetcher.
    pub fn with_settings(settings: FetchSettings) -> Self {
        let request_timeout = settings.request_timeout;
        Self::new(reqwest_factory(settings)).with_request_timeout(request_timeout)
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Validates and starts a job, returning as soon as the pool is spawned.
    ///
    /// Checks run in order: running job, configuration, identifiers. A job
    /// whose pool cannot be brought up is still created and ends `Failed`.
    pub fn submit<I, S>(&self, identifiers: I, config: LookupConfig) -> Result<JobId, SubmitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut active = self.lock_active();
        if let Some(job) = active.as_ref() {
            if !job.ctx.state().is_terminal() {
                lookup_warn!("Rejected submission: job {} is still running", job.ctx.job_id());
                return Err(SubmitError::JobAlreadyRunning);
            }
        }
        config.validate().inspect_err(|err| {
            lookup_warn!("Rejected submission: {}", err);
        })?;
        let batch = prepare_batch(identifiers).inspect_err(|err| {
            lookup_warn!("Rejected submission: {}", err);
        })?;

        let job_id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        let ctx = Arc::new(JobContext::new(job_id, batch));
        lookup_info!(
            "Job {} submitted: {} identifiers, {} workers, {}s delay, session {}",
            job_id,
            ctx.tracker().total(),
            config.worker_count,
            config.delay_seconds,
            mask_secret(&config.session_credential)
        );

        // The previous terminal job, if any, is discarded here.
        *active = Some(ActiveJob {
            ctx: ctx.clone(),
            created_at: Utc::now(),
        });

        if let Err(message) = self.start_pool(ctx.clone(), config) {
            lookup_error!("Job {} could not start: {}", job_id, message);
            ctx.apply(Msg::PoolStartFailed);
        }
        Ok(job_id)
    }

    /// `None` until a job has been submitted.
    pub fn progress(&self) -> Option<ProgressSnapshot> {
        self.current().map(|ctx| ctx.snapshot())
    }

    pub fn state(&self) -> Option<JobState> {
        self.current().map(|ctx| ctx.state())
    }

    /// Stops dispatch of new items; in-flight lookups finish on their own.
    pub fn cancel(&self) -> CancelAck {
        let Some(ctx) = self.current() else {
            return CancelAck::NotRunning;
        };
        if ctx.state().is_terminal() {
            return CancelAck::NotRunning;
        }
        if !ctx.cancel_requested() {
            lookup_info!("Job {} cancellation requested", ctx.job_id());
            ctx.apply(Msg::CancelRequested);
        }
        CancelAck::Requested
    }

    /// Terminal results so far, in submission order. Safe while running.
    pub fn results(&self) -> Vec<ItemResult> {
        self.current().map(|ctx| ctx.results()).unwrap_or_default()
    }

    /// Hands over the final results of a terminal job and forgets it.
    pub fn release(&self) -> Result<JobReport, ReleaseError> {
        let mut active = self.lock_active();
        let job = active.as_ref().ok_or(ReleaseError::NoJob)?;
        let state = job.ctx.state();
        if !state.is_terminal() {
            return Err(ReleaseError::JobStillRunning(job.ctx.job_id()));
        }
        let report = JobReport {
            job_id: job.ctx.job_id(),
            state,
            created_at: job.created_at,
            snapshot: job.ctx.snapshot(),
            results: job.ctx.results(),
        };
        *active = None;
        Ok(report)
    }

    fn current(&self) -> Option<Arc<JobContext>> {
        self.lock_active().as_ref().map(|job| job.ctx.clone())
    }

    fn start_pool(&self, ctx: Arc<JobContext>, config: LookupConfig) -> Result<(), String> {
        let fetcher = (self.factory)().map_err(|err| err.to_string())?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_count.max(1))
            .thread_name(format!("lookup-job-{}", ctx.job_id()))
            .enable_all()
            .build()
            .map_err(|err| format!("tokio runtime: {err}"))?;
        let pool = WorkerPool::new(
            PoolSettings::from_config(&config, self.request_timeout),
            fetcher,
            config,
        );

        // The supervisor holds off until the job is marked running, so a fast
        // pool cannot drain ahead of the transition.
        let (go_tx, go_rx) = mpsc::channel::<()>();
        let supervisor_ctx = ctx.clone();
        thread::Builder::new()
            .name(format!("lookup-supervisor-{}", ctx.job_id()))
            .spawn(move || {
                if go_rx.recv().is_err() {
                    return;
                }
                runtime.block_on(pool.run(supervisor_ctx.clone()));
                supervisor_ctx.apply(Msg::PoolDrained);
            })
            .map_err(|err| format!("supervisor thread: {err}"))?;

        ctx.apply(Msg::PoolStarted);
        let _ = go_tx.send(());
        Ok(())
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveJob>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
