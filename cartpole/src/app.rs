//! # Cart-Pole Application Logic
//!
//! The two front-ends behind the CLI.
//!
//! [`run_simulation`] builds the local engine, registers the PID law and
//! drives the [`Scheduler`] either flat out (headless) or paced to the
//! configured tick rate. With `--watch` the config file is watched and PID
//! gains are reloaded into the running scheduler.
//!
//! [`run_session`] connects to a remote simulation server over Socket.IO and
//! relays commands typed on stdin; see [`crate::console`].

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use control::{ControllerRegistry, PidController};
use physics::{BodyState, CartPoleEngine};
use runtime::{InputRouter, Key, Scheduler, SchedulerError, TickFrame};
use session::{drive, SessionClient, SessionCommand, SessionState, SessionUpdate, Severity, WebSocketTransport};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{SessionArgs, SimulateArgs};
use crate::config::AppConfig;
use crate::{console, watcher};

/// Ticks of a headless run when `--ticks` is not given.
pub const DEFAULT_HEADLESS_TICKS: u64 = 600;

/// Install the global `fmt` subscriber. `level` wins over `RUST_LOG`; with
/// neither, `info` is used.
///
/// # Errors
///
/// Fails for an unparsable filter or when a subscriber is already set.
pub fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).with_context(|| format!("Invalid log filter `{level}`"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {e}"))
}

/// Engine plus a registry holding the PID law under
/// [`watcher::PID_CONTROLLER`].
///
/// # Errors
///
/// Only if the registry rejects the registration.
pub fn build_scheduler(config: &AppConfig, pid_enabled: bool) -> Result<Scheduler> {
    info!("Initializing cart-pole engine...");
    let engine = CartPoleEngine::new(config.physics.clone());

    let mut registry = ControllerRegistry::new();
    registry.add_controller(
        watcher::PID_CONTROLLER,
        Box::new(PidController::new(config.pid)),
        pid_enabled,
    )?;
    Ok(Scheduler::new(engine, registry, config.scheduler))
}

/// Summary of a local run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimulationReport {
    pub ticks: u64,
    pub final_state: BodyState,
    /// Largest `|pole_angle|` after any step.
    pub max_abs_angle: f64,
    /// Largest `|applied_force|` of any tick.
    pub peak_force: f64,
    /// Ticks on which the controller chose zero force although enabled
    /// (the pole was outside the guard band).
    pub guarded_ticks: u64,
}

impl SimulationReport {
    #[allow(clippy::float_cmp)]
    fn record(&mut self, frame: &TickFrame) {
        self.ticks += 1;
        self.final_state = frame.state;
        self.max_abs_angle = self.max_abs_angle.max(frame.state.pole_angle.abs());
        self.peak_force = self.peak_force.max(frame.applied_force.abs());
        if frame.command.source_id.is_some() && frame.command.force == 0.0 {
            self.guarded_ticks += 1;
        }
    }
}

/// Manual force from `--force` and the held keys.
fn manual_force(config: &AppConfig, args: &SimulateArgs) -> Result<f64> {
    let mut router = InputRouter::new(config.input);
    for name in &args.hold {
        let key: Key = name.parse()?;
        router.key_down(key);
    }
    Ok(args.force + router.force())
}

/// Run the local simulation described by `args`.
///
/// # Errors
///
/// Bad arguments, a watcher that cannot start, or a physics failure during
/// the run.
pub fn run_simulation(config: &AppConfig, args: &SimulateArgs, config_path: Option<&Path>) -> Result<SimulationReport> {
    let mut scheduler = build_scheduler(config, !args.no_pid)?;

    if args.initial_angle != 0.0 {
        scheduler.apply_disturbance(args.initial_angle)?;
    }
    scheduler.apply_manual_force(manual_force(config, args)?)?;

    let _config_watcher = if args.watch {
        let path = config_path.context("--watch needs --config")?;
        Some(watcher::start(path, scheduler.handle())?)
    } else {
        None
    };

    let ticks = match (args.ticks, args.realtime) {
        (Some(ticks), _) => Some(ticks),
        (None, false) => Some(DEFAULT_HEADLESS_TICKS),
        (None, true) => None,
    };
    // (ticks before the disturbance, angle)
    let disturbance = args.disturbance_at.zip(args.disturbance_angle);

    info!(?ticks, realtime = args.realtime, pid = !args.no_pid, "Starting simulation");
    scheduler.start();

    let report = if args.realtime {
        run_paced(&mut scheduler, ticks, disturbance)
    } else {
        run_headless(&mut scheduler, ticks.unwrap_or(DEFAULT_HEADLESS_TICKS), disturbance)
    };

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            error!("Simulation aborted: {e:#}");
            scheduler.shutdown();
            return Err(e);
        }
    };
    info!(
        ticks = report.ticks,
        cart_position = report.final_state.cart_position,
        pole_angle = report.final_state.pole_angle,
        max_abs_angle = report.max_abs_angle,
        peak_force = report.peak_force,
        "Simulation finished"
    );
    scheduler.shutdown();
    Ok(report)
}

fn run_headless(scheduler: &mut Scheduler, ticks: u64, disturbance: Option<(u64, f64)>) -> Result<SimulationReport> {
    let mut report = SimulationReport::default();
    for i in 0..ticks {
        if let Some((at, angle)) = disturbance {
            if i == at {
                scheduler.apply_disturbance(angle)?;
            }
        }
        match scheduler.tick()? {
            Some(frame) => report.record(&frame),
            None => break,
        }
    }
    Ok(report)
}

fn run_paced(
    scheduler: &mut Scheduler,
    ticks: Option<u64>,
    disturbance: Option<(u64, f64)>,
) -> Result<SimulationReport> {
    // Realtime is slow enough for a small buffer to never fill.
    let frames = scheduler.subscribe(64);
    let reporter = std::thread::spawn(move || {
        let mut report = SimulationReport::default();
        for frame in frames {
            report.record(&frame);
        }
        report
    });

    let shutdown = AtomicBool::new(false);
    let result = run_realtime_disturbed(scheduler, ticks, disturbance, &shutdown);
    // Dropping the subscriber side ends the reporter.
    scheduler.unsubscribe_all();
    let report = reporter.join().map_err(|_| anyhow!("Frame reporter panicked"))?;
    result?;
    Ok(report)
}

fn run_realtime_disturbed(
    scheduler: &mut Scheduler,
    ticks: Option<u64>,
    disturbance: Option<(u64, f64)>,
    shutdown: &AtomicBool,
) -> Result<u64, SchedulerError> {
    let Some((at, angle)) = disturbance.filter(|(at, _)| ticks.map_or(true, |t| *at < t)) else {
        return scheduler.run_realtime(ticks, shutdown);
    };
    let before = scheduler.run_realtime(Some(at), shutdown)?;
    scheduler.apply_disturbance(angle)?;
    let after = scheduler.run_realtime(ticks.map(|t| t - before), shutdown)?;
    Ok(before + after)
}

/// Connect to the configured server and relay stdin commands until end of
/// input, `quit`, or `--duration` elapses.
///
/// # Errors
///
/// Invalid url, runtime construction failure, or a driver task that
/// panicked.
pub fn run_session(config: &AppConfig, args: &SessionArgs) -> Result<SessionState> {
    let mut session = config.session.clone();
    if let Some(url) = &args.url {
        session.url.clone_from(url);
    }
    if !args.controllers.is_empty() {
        session.initial_controllers.clone_from(&args.controllers);
    }
    let duration = args
        .duration
        .map(Duration::try_from_secs_f64)
        .transpose()
        .context("Invalid --duration")?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let transport = WebSocketTransport::new(&session.url, rt.handle().clone(), event_tx)?;
    info!(endpoint = %transport.endpoint(), "Starting session");
    let client = SessionClient::new(session, transport);

    let state = rt.block_on(async move {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();
        let driver = tokio::spawn(drive(client, event_rx, command_rx, update_tx));
        let printer = tokio::spawn(async move {
            while let Some(update) = update_rx.recv().await {
                report_update(&update);
            }
        });

        command_tx.send(SessionCommand::Connect).await.ok();
        let stdin_tx = command_tx.clone();
        std::thread::spawn(move || console::forward_commands(std::io::stdin().lock(), &stdin_tx));

        match duration {
            Some(duration) => {
                tokio::time::sleep(duration).await;
                command_tx.send(SessionCommand::Shutdown).await.ok();
            }
            // The driver stops once stdin closes its sender.
            None => drop(command_tx),
        }

        let client = driver.await.context("Session driver panicked")?;
        printer.await.ok();
        Ok::<_, anyhow::Error>(client.state().clone())
    })?;

    info!(status = %state.status.text, "Session ended");
    Ok(state)
}

fn report_update(update: &SessionUpdate) {
    match update {
        SessionUpdate::Status(status) => match status.severity {
            Severity::Error => warn!("{}", status.text),
            Severity::Info | Severity::Success => info!("{}", status.text),
        },
        SessionUpdate::VisualizationUrl(Some(url)) => info!("Visualization available at {url}"),
        SessionUpdate::ActiveControllers(active) => info!(?active, "Active controllers"),
        SessionUpdate::SimData(data) => info!(%data, "Simulation data"),
        SessionUpdate::Phase(_) | SessionUpdate::VisualizationUrl(None) => {}
    }
}
