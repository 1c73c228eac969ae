use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cartpole", version, about = "Cart-pole simulation and remote session client")]
pub struct Cli {
    /// JSON configuration file; defaults apply to anything it leaves out.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter such as `info` or `runtime=debug`. Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the local engine with the PID controller.
    Simulate(SimulateArgs),
    /// Drive a remote simulation server from stdin commands.
    Session(SessionArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SimulateArgs {
    /// Ticks to run. Headless runs default to 600; realtime runs go on until
    /// interrupted.
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Pace ticks to the configured tick rate instead of running flat out.
    #[arg(long)]
    pub realtime: bool,

    /// Pole angle (rad) at the start of the run.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub initial_angle: f64,

    /// Constant manual force added to the controller output.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub force: f64,

    /// Arrow keys held for the whole run (`ArrowLeft`, `ArrowRight`, `a`, `d`).
    #[arg(long = "hold")]
    pub hold: Vec<String>,

    /// Tick at which the pole is knocked to `--disturbance-angle`.
    #[arg(long, requires = "disturbance_angle")]
    pub disturbance_at: Option<u64>,

    #[arg(long, allow_hyphen_values = true)]
    pub disturbance_angle: Option<f64>,

    /// Leave the PID controller disabled.
    #[arg(long)]
    pub no_pid: bool,

    /// Reload PID gains whenever the config file changes. Needs `--config`.
    #[arg(long)]
    pub watch: bool,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct SessionArgs {
    /// Server base url; overrides the config file.
    #[arg(long)]
    pub url: Option<String>,

    /// Controller to request at start-up. Repeatable; overrides the config
    /// file.
    #[arg(long = "controller")]
    pub controllers: Vec<String>,

    /// End the session after this many seconds instead of at end of input.
    #[arg(long)]
    pub duration: Option<f64>,
}
