use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context};
use lookup_core::{format_duration, JobState, ProgressSnapshot};
use lookup_engine::{
    validate_session, write_exports, CancelAck, ExportOptions, FetchError, JobController,
    JobReport, ReqwestFetcher, SessionCheck,
};
use lookup_logging::{lookup_info, lookup_warn, mask_secret};

use crate::cli::RunArgs;
use crate::input::{load_identifiers, parse_list};
use crate::settings::AppSettings;

/// Submits one batch, reports progress until it is terminal and exports
/// whatever finished.
pub fn run(settings: &AppSettings, args: &RunArgs) -> anyhow::Result<()> {
    let identifiers = collect_identifiers(args)?;
    let config = settings.lookup_config()?;
    let controller = JobController::with_settings(settings.fetch_settings());
    let interrupted = watch_interrupts()?;

    let job_id = controller.submit(&identifiers, config)?;
    println!("Job {job_id} started, press Ctrl-C to stop early");

    let mut last_line = String::new();
    loop {
        let Some(snapshot) = controller.progress() else {
            bail!("job {job_id} is no longer tracked");
        };
        if interrupted.swap(false, Ordering::SeqCst)
            && controller.cancel() == CancelAck::Requested
        {
            println!("Cancelling, waiting for lookups already in flight");
        }
        let line = progress_line(&snapshot);
        if line != last_line {
            println!("{line}");
            last_line = line;
        }
        if snapshot.is_terminal() {
            break;
        }
        thread::sleep(settings.poll_interval());
    }

    let report = controller.release()?;
    if report.state == JobState::Failed {
        bail!("job {} could not start, see the log for details", report.job_id);
    }
    print_summary(&report);

    let options = ExportOptions {
        csv: !args.no_csv,
        json: !args.no_json,
        archive: !args.no_archive,
        ..ExportOptions::at(report.created_at)
    };
    if !(options.csv || options.json || options.archive) {
        return Ok(());
    }
    let summary = write_exports(&settings.output_dir, &report.results, &options)
        .with_context(|| format!("exporting to {}", settings.output_dir.display()))?;
    let written: Vec<PathBuf> = [summary.csv_path, summary.json_path, summary.archive_path]
        .into_iter()
        .flatten()
        .collect();
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

/// Probes the service once with the configured credential.
pub fn validate(settings: &AppSettings) -> anyhow::Result<()> {
    let config = settings.lookup_config()?;
    config.validate()?;
    lookup_info!(
        "Validating session {} against {}",
        mask_secret(&config.session_credential),
        settings.endpoint
    );

    let fetch_settings = settings.fetch_settings();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let check = runtime.block_on(async move {
        let fetcher = ReqwestFetcher::new(fetch_settings)?;
        Ok::<_, FetchError>(validate_session(&fetcher, &config).await)
    })?;

    match check {
        SessionCheck::Accepted => {
            println!("Session accepted");
            Ok(())
        }
        SessionCheck::Rejected => bail!("session rejected, sign in again and copy a fresh JSESSIONID"),
        SessionCheck::Unreachable(message) => bail!("service unreachable: {message}"),
    }
}

fn collect_identifiers(args: &RunArgs) -> anyhow::Result<Vec<String>> {
    let identifiers = match (&args.input, &args.vehicles) {
        (Some(path), _) => load_identifiers(path)?,
        (None, Some(list)) => parse_list(list),
        (None, None) => bail!("nothing to look up: pass --input or --vehicles"),
    };
    lookup_info!("Loaded {} vehicle numbers", identifiers.len());
    Ok(identifiers)
}

/// Ctrl-C only raises a flag; the polling loop turns it into a cancel.
fn watch_interrupts() -> anyhow::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;
    let raised = flag.clone();
    thread::Builder::new()
        .name("lookup-interrupt".to_string())
        .spawn(move || {
            runtime.block_on(async {
                while tokio::signal::ctrl_c().await.is_ok() {
                    raised.store(true, Ordering::SeqCst);
                }
            });
        })?;
    Ok(flag)
}

fn progress_line(snapshot: &ProgressSnapshot) -> String {
    let eta = snapshot
        .estimated_remaining
        .filter(|_| !snapshot.is_terminal())
        .map(|eta| format!(", about {} left", format_duration(eta)))
        .unwrap_or_default();
    format!(
        "[{}] {}/{} done ({} ok, {} failed), {} in flight, {} elapsed{}",
        snapshot.state,
        snapshot.completed,
        snapshot.total,
        snapshot.succeeded,
        snapshot.failed,
        snapshot.in_progress,
        format_duration(snapshot.elapsed),
        eta
    )
}

fn print_summary(report: &JobReport) {
    let snapshot = &report.snapshot;
    println!(
        "Job {} {}: {} succeeded, {} failed, {} not started",
        report.job_id, report.state, snapshot.succeeded, snapshot.failed, snapshot.pending
    );
    if snapshot.session_invalid > 0 {
        lookup_warn!(
            "{} lookups were rejected for an invalid session",
            snapshot.session_invalid
        );
        println!("The session cookie was rejected; refresh it before the next run");
    }
}
