//! Lookup engine: batch fetch pipeline, worker pool and job control.
mod context;
mod controller;
mod decode;
mod export;
mod fetch;
mod parse;
mod persist;
mod pool;
mod rate_limit;
mod store;
mod tracker;

pub use context::JobContext;
pub use controller::{CancelAck, JobController, JobReport, ReleaseError, DEFAULT_REQUEST_TIMEOUT};
pub use decode::{decode_page, DecodeError, DecodedPage};
pub use export::{
    build_archive, default_file_stem, render_csv, render_json, write_exports, ExportError,
    ExportOptions, ExportSummary, CSV_COLUMNS,
};
pub use fetch::{
    reqwest_factory, validate_session, FetchError, FetchSettings, Fetcher, FetcherFactory,
    ReqwestFetcher, SessionCheck, DEFAULT_ENDPOINT, SESSION_PROBE_IDENTIFIER,
};
pub use parse::parse_vehicle_page;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pool::{PoolSettings, WorkerPool};
pub use rate_limit::RateLimiter;
pub use store::ResultStore;
pub use tracker::ProgressTracker;
