//! `vehicle-lookup`: command-line front end for the batch lookup engine.
//!
//! ```bash
//! LOOKUP_SESSION=<JSESSIONID> vehicle-lookup run --input plates.txt --workers 3 --delay 2
//! vehicle-lookup validate-session --session <JSESSIONID>
//! ```

mod cli;
mod input;
mod run;
mod settings;

use clap::Parser;
use lookup_logging::{lookup_error, lookup_info};

use crate::cli::{Cli, Command};
use crate::settings::AppSettings;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = AppSettings::load(cli.config.as_deref())?;
    match &cli.command {
        Command::Run(args) => settings.apply_run(args),
        Command::ValidateSession(args) => settings.apply_session(args),
    }

    lookup_logging::initialize(&settings.log_destination(), cli.log_level);
    lookup_info!("vehicle-lookup {} starting", env!("CARGO_PKG_VERSION"));

    let outcome = match &cli.command {
        Command::Run(args) => run::run(&settings, args),
        Command::ValidateSession(_) => run::validate(&settings),
    };
    outcome.inspect_err(|err| lookup_error!("{:#}", err))
}
