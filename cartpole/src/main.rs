//! # Cart-Pole Binary
//!
//! Parses the command line, loads the configuration, installs logging and
//! hands over to [`cartpole::app`].

use anyhow::Result;
use cartpole::app;
use cartpole::cli::{Cli, Command};
use cartpole::config::AppConfig;
use clap::Parser;

fn main() -> Result<()> {
    let cli = Cli::parse();
    app::init_logging(cli.log_level.as_deref())?;
    let config = AppConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Command::Simulate(args) => {
            app::run_simulation(&config, args, cli.config.as_deref())?;
        }
        Command::Session(args) => {
            app::run_session(&config, args)?;
        }
    }
    Ok(())
}
