use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

/// Batch lookups of vehicle registration records.
#[derive(Parser, Debug)]
#[command(name = "vehicle-lookup", version, about)]
pub struct Cli {
    /// RON settings file. `./lookup.ron` is used when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log verbosity (off, error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up a batch of vehicle numbers and export the results.
    Run(RunArgs),
    /// Check whether a session cookie is accepted by the service.
    ValidateSession(SessionArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// JSESSIONID cookie value copied from an authenticated browser session.
    ///
    /// Environment variable: `LOOKUP_SESSION`
    #[arg(long, env = "LOOKUP_SESSION", hide_env_values = true)]
    pub session: Option<String>,

    /// Lookup endpoint URL.
    #[arg(long)]
    pub endpoint: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Identifier file: `.txt` with one per line or `.csv` with a
    /// `vehicle_number` column.
    #[arg(short, long, conflicts_with = "vehicles")]
    pub input: Option<PathBuf>,

    /// Comma or newline separated vehicle numbers.
    #[arg(long)]
    pub vehicles: Option<String>,

    /// Concurrent lookups (1-5).
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Seconds between request starts (0.5-5.0).
    #[arg(short, long)]
    pub delay: Option<f64>,

    /// Identification number sent with every lookup.
    #[arg(long)]
    pub nic: Option<String>,

    /// Contact number sent with every lookup.
    #[arg(long)]
    pub contact: Option<String>,

    /// Stop dispatching once the service rejects the session.
    #[arg(long)]
    pub stop_on_session_error: bool,

    /// Directory for the exported files.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub no_csv: bool,

    #[arg(long)]
    pub no_json: bool,

    #[arg(long)]
    pub no_archive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "vehicle-lookup",
            "--log-level",
            "debug",
            "run",
            "--vehicles",
            "ABC-1234,DEF-5678",
            "--workers",
            "2",
            "--delay",
            "1.5",
            "--session",
            "F750F4D0BE39C97D2AB19DF9148798B8",
            "--no-archive",
        ])
        .unwrap();

        assert_eq!(cli.log_level, LevelFilter::Debug);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.vehicles.as_deref(), Some("ABC-1234,DEF-5678"));
        assert_eq!(args.workers, Some(2));
        assert_eq!(args.delay, Some(1.5));
        assert!(args.no_archive);
        assert!(!args.no_csv);
    }

    #[test]
    fn input_file_and_list_are_exclusive() {
        let err = Cli::try_parse_from([
            "vehicle-lookup",
            "run",
            "--input",
            "plates.txt",
            "--vehicles",
            "ABC-1234",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
