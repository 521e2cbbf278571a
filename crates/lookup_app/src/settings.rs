use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use lookup_core::{
    LookupConfig, SessionInvalidPolicy, DEFAULT_CONTACT_NUMBER, DEFAULT_DELAY_SECONDS,
    DEFAULT_IDENTIFICATION_NUMBER, DEFAULT_WORKER_COUNT,
};
use lookup_engine::{FetchSettings, DEFAULT_ENDPOINT};
use lookup_logging::{LogDestination, DEFAULT_LOG_FILE};
use serde::{Deserialize, Serialize};

use crate::cli::{RunArgs, SessionArgs};

pub const DEFAULT_SETTINGS_FILE: &str = "lookup.ron";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

/// Defaults for the command line, read from a RON file.
///
/// Every field is optional in the file; flags given on the command line win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub worker_count: usize,
    pub delay_seconds: f64,
    pub session_credential: Option<String>,
    pub identification_number: String,
    pub contact_number: String,
    pub session_invalid_policy: SessionInvalidPolicy,
    pub endpoint: String,
    pub request_timeout_secs: u64,
    pub output_dir: PathBuf,
    pub log_target: LogTarget,
    pub log_file: PathBuf,
    pub poll_interval_ms: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            delay_seconds: DEFAULT_DELAY_SECONDS,
            session_credential: None,
            identification_number: DEFAULT_IDENTIFICATION_NUMBER.to_string(),
            contact_number: DEFAULT_CONTACT_NUMBER.to_string(),
            session_invalid_policy: SessionInvalidPolicy::Continue,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 30,
            output_dir: PathBuf::from("results"),
            log_target: LogTarget::Both,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            poll_interval_ms: 500,
        }
    }
}

impl AppSettings {
    /// Reads `path`, or `./lookup.ron` when no path is given. Only an
    /// explicitly named file has to exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_SETTINGS_FILE), false),
        };
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound && !required => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading settings {}", path.display()))
            }
        };
        ron::from_str(&content).with_context(|| format!("parsing settings {}", path.display()))
    }

    pub fn apply_session(&mut self, args: &SessionArgs) {
        if let Some(session) = &args.session {
            self.session_credential = Some(session.trim().to_string());
        }
        if let Some(endpoint) = &args.endpoint {
            self.endpoint = endpoint.clone();
        }
    }

    pub fn apply_run(&mut self, args: &RunArgs) {
        self.apply_session(&args.session);
        if let Some(workers) = args.workers {
            self.worker_count = workers;
        }
        if let Some(delay) = args.delay {
            self.delay_seconds = delay;
        }
        if let Some(nic) = &args.nic {
            self.identification_number = nic.clone();
        }
        if let Some(contact) = &args.contact {
            self.contact_number = contact.clone();
        }
        if args.stop_on_session_error {
            self.session_invalid_policy = SessionInvalidPolicy::CancelJob;
        }
        if let Some(dir) = &args.output_dir {
            self.output_dir = dir.clone();
        }
    }

    /// Job configuration; bounds are checked later by the controller.
    pub fn lookup_config(&self) -> anyhow::Result<LookupConfig> {
        let Some(credential) = self.session_credential.as_deref() else {
            bail!("no session credential: pass --session or set LOOKUP_SESSION");
        };
        Ok(LookupConfig {
            worker_count: self.worker_count,
            delay_seconds: self.delay_seconds,
            fixed_identification_number: self.identification_number.clone(),
            fixed_contact_number: self.contact_number.clone(),
            session_invalid_policy: self.session_invalid_policy,
            ..LookupConfig::new(credential)
        })
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            ..FetchSettings::with_endpoint(self.endpoint.clone())
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match self.log_target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File(self.log_file.clone()),
            LogTarget::Both => LogDestination::Both(self.log_file.clone()),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(50))
    }
}
