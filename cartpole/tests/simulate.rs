use std::time::{Duration, Instant};

use cartpole::app::{build_scheduler, run_simulation, DEFAULT_HEADLESS_TICKS};
use cartpole::cli::SimulateArgs;
use cartpole::config::AppConfig;
use cartpole::watcher;

fn args() -> SimulateArgs {
    SimulateArgs {
        ticks: Some(100),
        realtime: false,
        initial_angle: 0.0,
        force: 0.0,
        hold: Vec::new(),
        disturbance_at: None,
        disturbance_angle: None,
        no_pid: false,
        watch: false,
    }
}

fn quiet_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.scheduler.log_every = 0;
    config
}

#[test]
fn pid_recovers_a_small_tilt() -> anyhow::Result<()> {
    let report = run_simulation(
        &quiet_config(),
        &SimulateArgs {
            initial_angle: 0.05,
            ..args()
        },
        None,
    )?;
    assert_eq!(report.ticks, 100);
    assert!(report.final_state.pole_angle.abs() < 0.05, "{report:?}");
    assert_eq!(report.guarded_ticks, 0);
    Ok(())
}

#[test]
fn headless_default_length() -> anyhow::Result<()> {
    let report = run_simulation(&quiet_config(), &SimulateArgs { ticks: None, ..args() }, None)?;
    assert_eq!(report.ticks, DEFAULT_HEADLESS_TICKS);
    Ok(())
}

#[test]
fn large_disturbance_disengages_the_controller() -> anyhow::Result<()> {
    let report = run_simulation(
        &quiet_config(),
        &SimulateArgs {
            ticks: Some(40),
            disturbance_at: Some(20),
            disturbance_angle: Some(0.6),
            ..args()
        },
        None,
    )?;
    assert!(report.guarded_ticks >= 1);
    assert!(report.max_abs_angle > 0.5);
    Ok(())
}

#[test]
fn held_key_pushes_the_cart() -> anyhow::Result<()> {
    let report = run_simulation(
        &quiet_config(),
        &SimulateArgs {
            ticks: Some(60),
            hold: vec!["ArrowRight".into()],
            no_pid: true,
            ..args()
        },
        None,
    )?;
    assert!(report.final_state.cart_position > 600.0, "{report:?}");
    assert!((report.peak_force - 0.01).abs() < 1e-12);
    Ok(())
}

#[test]
fn bad_arguments_are_reported() {
    let config = quiet_config();
    let unknown_key = SimulateArgs {
        hold: vec!["up".into()],
        ..args()
    };
    assert!(run_simulation(&config, &unknown_key, None).is_err());

    let watch_without_file = SimulateArgs { watch: true, ..args() };
    assert!(run_simulation(&config, &watch_without_file, None).is_err());
}

#[test]
fn cart_term_centres_on_a_narrower_track() -> anyhow::Result<()> {
    let config = AppConfig::parse(
        r#"{ "physics": { "width": 800.0 }, "pid": { "cart": { "kp": 0.001 } }, "scheduler": { "log_every": 0 } }"#,
    )?;
    let mut scheduler = build_scheduler(&config, true)?;
    scheduler.start();
    let frame = scheduler.tick()?.expect("running");
    assert_eq!(frame.observed.cart_position, 400.0);
    assert_eq!(frame.command.force, 0.0);
    Ok(())
}

const DISENGAGED_PID: &str = r#"{ "pid": { "pole": { "kp": 0.05, "kd": 0.3 }, "guard_band": 0.0 } }"#;

#[test]
fn reloaded_gains_apply_at_the_next_tick() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cartpole.json");
    std::fs::write(&path, DISENGAGED_PID)?;

    let mut scheduler = build_scheduler(&quiet_config(), true)?;
    scheduler.apply_disturbance(0.1)?;
    scheduler.start();
    let before = scheduler.tick()?.expect("running");
    assert!(before.command.force > 0.0);

    watcher::reload_pid(&path, &scheduler.handle())?;
    let after = scheduler.tick()?.expect("running");
    assert_eq!(after.command.source_id.as_deref(), Some("pid"));
    assert_eq!(after.command.force, 0.0);
    Ok(())
}

#[test]
fn watcher_picks_up_file_changes() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cartpole.json");
    std::fs::write(&path, "{}")?;

    let mut scheduler = build_scheduler(&quiet_config(), true)?;
    scheduler.apply_disturbance(0.1)?;
    scheduler.start();
    let _watcher = watcher::start(&path, scheduler.handle())?;
    std::fs::write(&path, DISENGAGED_PID)?;

    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let frame = scheduler.tick()?.expect("running");
        if frame.command.force == 0.0 {
            break;
        }
        assert!(Instant::now() < deadline, "config change never applied");
        std::thread::sleep(Duration::from_millis(20));
    }
    Ok(())
}
