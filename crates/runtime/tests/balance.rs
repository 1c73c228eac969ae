use control::{ControllerRegistry, PidController};
use physics::CartPoleEngine;
use runtime::{InputRouter, Key, Scheduler, SchedulerConfig, SchedulerError};
use serde_json::json;

fn pid_scheduler() -> Scheduler {
    let mut registry = ControllerRegistry::new();
    registry
        .add_controller("pid", Box::new(PidController::default()), true)
        .unwrap();
    Scheduler::new(CartPoleEngine::default(), registry, SchedulerConfig::default())
}

#[test]
fn pid_keeps_pole_upright() -> anyhow::Result<()> {
    let mut scheduler = pid_scheduler();
    scheduler.apply_disturbance(0.05)?;
    scheduler.apply_manual_force(0.0)?;
    scheduler.start();

    assert_eq!(scheduler.run_ticks(100)?, 100);
    let state = scheduler.state();
    println!("after 100 ticks: {state:?}");
    assert!(state.pole_angle.abs() < 0.05, "pole drifted to {}", state.pole_angle);
    Ok(())
}

#[test]
fn disturbance_beyond_guard_band_yields_zero_force() -> anyhow::Result<()> {
    let mut scheduler = pid_scheduler();
    scheduler.start();
    scheduler.run_ticks(10)?;

    scheduler.handle().apply_disturbance(0.6)?;
    let frame = scheduler.tick()?.expect("running");
    assert!(frame.observed.pole_angle > 0.5);
    assert_eq!(frame.command.source_id.as_deref(), Some("pid"));
    assert_eq!(frame.command.force, 0.0);
    assert_eq!(frame.applied_force, 0.0);

    // Every later tick with the pole past the band stays at zero.
    for _ in 0..20 {
        let frame = scheduler.tick()?.expect("running");
        if frame.observed.pole_angle.abs() > 0.5 {
            assert_eq!(frame.command.force, 0.0);
        }
    }
    Ok(())
}

#[test]
fn manual_force_from_input_router_moves_cart() -> anyhow::Result<()> {
    let mut scheduler = pid_scheduler();
    scheduler.enable_controller("pid", false)?;
    let mut input = InputRouter::default();
    input.key_down(Key::ArrowRight);
    scheduler.apply_manual_force(input.force())?;
    scheduler.start();
    scheduler.run_ticks(10)?;

    let frame = scheduler.last_frame().expect("ticked");
    assert_eq!(frame.command.source_id, None);
    assert!((frame.applied_force - 0.01).abs() < 1e-15);
    assert!(frame.state.cart_position > 600.0);
    Ok(())
}

#[test]
fn unknown_controller_is_an_error() {
    let mut scheduler = pid_scheduler();
    assert!(matches!(
        scheduler.enable_controller("lqr", true),
        Err(SchedulerError::Control(_))
    ));
    assert!(matches!(
        scheduler.set_parameters("pid", &json!({"pole": {"kp": -1.0}})),
        Err(SchedulerError::Control(_))
    ));
}

#[test]
fn handle_works_across_threads() -> anyhow::Result<()> {
    let mut scheduler = pid_scheduler();
    let handle = scheduler.handle();
    std::thread::spawn(move || {
        handle.start().unwrap();
        handle.set_parameters("pid", json!({"guard_band": 0.3})).unwrap();
    })
    .join()
    .expect("sender thread");

    assert!(scheduler.tick()?.is_some());
    scheduler.shutdown();
    Ok(())
}
