//! # Gain Hot-Reloading
//!
//! Watches the configuration file while a simulation runs. When the file is
//! written, its `pid` section is re-read and queued on the scheduler as a
//! `set_parameters("pid", ..)` command, so new gains apply from the next
//! tick on. Other sections are ignored until restart.
//!
//! The parent directory is watched rather than the file itself: editors
//! often save by replacing the file, which would end a watch on the old
//! inode.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use runtime::SchedulerHandle;
use tracing::{error, info, warn};

use crate::config::AppConfig;

/// Controller id the reloaded section is sent to.
pub const PID_CONTROLLER: &str = "pid";

/// Forwards the `pid` section of a changed config file to the scheduler.
struct PidReloader {
    path: PathBuf,
    scheduler: SchedulerHandle,
}

impl PidReloader {
    fn is_config_file(&self, path: &Path) -> bool {
        path.file_name().is_some() && path.file_name() == self.path.file_name()
    }

    fn handle_event(&self, result: notify::Result<Event>) {
        match result {
            Ok(event) => {
                if !event.kind.is_modify() && !event.kind.is_create() {
                    return;
                }
                if event.paths.iter().any(|p| self.is_config_file(p)) {
                    if let Err(e) = reload_pid(&self.path, &self.scheduler) {
                        warn!("Config reload skipped: {e:#}");
                    }
                }
            }
            Err(e) => error!("Config watcher error: {e:?}"),
        }
    }
}

/// Read the `pid` section of `path` and queue it for the PID controller.
///
/// # Errors
///
/// Unreadable or invalid file, or a scheduler that no longer exists.
pub fn reload_pid(path: &Path, scheduler: &SchedulerHandle) -> Result<()> {
    let config = AppConfig::load(Some(path))?;
    let params = serde_json::to_value(config.pid).context("Failed to encode pid section")?;
    scheduler
        .set_parameters(PID_CONTROLLER, params)
        .context("Scheduler is gone")?;
    info!(
        kp = config.pid.pole.kp,
        ki = config.pid.pole.ki,
        kd = config.pid.pole.kd,
        "PID gains reloaded from {}",
        path.display()
    );
    Ok(())
}

/// Start watching `path`. Keep the returned watcher alive for as long as
/// reloads should happen.
///
/// # Errors
///
/// Fails if the watcher cannot be created or the file's directory cannot be
/// watched.
pub fn start(path: &Path, scheduler: SchedulerHandle) -> Result<RecommendedWatcher> {
    info!("Initializing config watcher for {}", path.display());

    let directory = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let reloader = PidReloader {
        path: path.to_path_buf(),
        scheduler,
    };

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| reloader.handle_event(res))
        .context("Failed to create file watcher")?;
    watcher
        .watch(&directory, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", directory.display()))?;

    info!("Config watcher active - monitoring '{}'", path.display());
    Ok(watcher)
}
