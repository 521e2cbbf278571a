#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use lookup_core::{FailureReason, LookupConfig, ProgressSnapshot, VehicleRecord};
use lookup_engine::{Fetcher, FetcherFactory, JobController};
use tokio::time::Instant;

pub const CREDENTIAL: &str = "F750F4D0BE39C97D2AB19DF9148798B8";

pub const RECORD_PAGE: &str = r#"<html><body>
<div class="row"><label>Report Date :</label> 2024-05-01 10:22</div>
<div class="row"><label>Vehicle Registration Number :</label> ABC-1234</div>
<table class="table table-striped table-condensed">
  <tr><td>Name of the Absolute Ownership / Mortgage if any</td><td>:</td><td>JOHN DOE</td></tr>
  <tr><td>Engine Number</td><td>:</td><td>2NZ-1234567</td></tr>
  <tr><td>Vehicle Class</td><td>:</td><td>MOTOR CAR</td></tr>
  <tr><td>Conditions and Notes</td><td>:</td><td>LEASED, ABSOLUTE OWNER BANK</td></tr>
  <tr><td>Make</td><td>:</td><td>TOYOTA</td></tr>
  <tr><td>Model</td><td>:</td><td>AXIO</td></tr>
  <tr><td>Year of Manufacture</td><td>:</td><td>2012</td></tr>
</table>
</body></html>"#;

pub const NOT_FOUND_PAGE: &str = r#"<html><body>
<form action="retrieveLimitedVehicleInformation.action" method="post">
  <input type="text" name="vehicleRegistrationNumber" value="">
</form>
<p class="error">No records found for the given vehicle number.</p>
</body></html>"#;

pub const LOGIN_PAGE: &str = r#"<html><body>
<form action="j_security_check" method="post">
  <input type="text" name="j_username"><input type="password" name="j_password">
</form>
</body></html>"#;

pub fn init_logging() {
    lookup_logging::initialize_for_tests();
}

pub fn config(worker_count: usize, delay_seconds: f64) -> LookupConfig {
    LookupConfig {
        worker_count,
        delay_seconds,
        ..LookupConfig::new(CREDENTIAL)
    }
}

pub fn record(identifier: &str) -> VehicleRecord {
    let mut record = VehicleRecord::empty(identifier, Utc::now());
    record.make = "TOYOTA".to_string();
    record.model = "AXIO".to_string();
    record
}

/// Fetcher with per-identifier outcomes and delays that records when each
/// call was issued.
#[derive(Default)]
pub struct StubFetcher {
    outcomes: HashMap<String, Result<VehicleRecord, FailureReason>>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    default_failure: Option<FailureReason>,
    panic_on: Option<String>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn with_delay_for(mut self, identifier: &str, delay: Duration) -> Self {
        self.delays.insert(identifier.to_string(), delay);
        self
    }

    pub fn with_outcome(
        mut self,
        identifier: &str,
        outcome: Result<VehicleRecord, FailureReason>,
    ) -> Self {
        self.outcomes.insert(identifier.to_string(), outcome);
        self
    }

    pub fn failing_all(mut self, reason: FailureReason) -> Self {
        self.default_failure = Some(reason);
        self
    }

    pub fn panicking_on(mut self, identifier: &str) -> Self {
        self.panic_on = Some(identifier.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(
        &self,
        identifier: &str,
        _config: &LookupConfig,
    ) -> Result<VehicleRecord, FailureReason> {
        self.calls
            .lock()
            .unwrap()
            .push((identifier.to_string(), Instant::now()));
        if self.panic_on.as_deref() == Some(identifier) {
            panic!("boom");
        }
        let delay = self
            .delays
            .get(identifier)
            .copied()
            .unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(outcome) = self.outcomes.get(identifier) {
            return outcome.clone();
        }
        match &self.default_failure {
            Some(reason) => Err(reason.clone()),
            None => Ok(record(identifier)),
        }
    }
}

pub fn factory(fetcher: Arc<StubFetcher>) -> FetcherFactory {
    Arc::new(move || {
        let fetcher: Arc<dyn Fetcher> = fetcher.clone();
        Ok(fetcher)
    })
}

pub fn controller(fetcher: Arc<StubFetcher>) -> JobController {
    JobController::new(factory(fetcher))
}

/// Polls progress until the job is terminal.
pub fn wait_for_terminal(controller: &JobController, timeout: Duration) -> ProgressSnapshot {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        let snapshot = controller.progress().expect("job exists");
        if snapshot.is_terminal() {
            return snapshot;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "job did not finish in time: {snapshot:?}"
        );
        thread::sleep(Duration::from_millis(20));
    }
}

/// Polls progress until `predicate` holds.
pub fn wait_until(
    controller: &JobController,
    timeout: Duration,
    predicate: impl Fn(&ProgressSnapshot) -> bool,
) -> ProgressSnapshot {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        let snapshot = controller.progress().expect("job exists");
        if predicate(&snapshot) {
            return snapshot;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "condition not reached in time: {snapshot:?}"
        );
        thread::sleep(Duration::from_millis(5));
    }
}
