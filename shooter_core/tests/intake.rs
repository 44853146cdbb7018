mod common;

use std::time::Duration;

use common::{Call, Rig, TICK};
use shooter_core::{
    Command, IntakeCfg, IntakeOutcome, IntakePhase, Outcome, SequenceStatus,
};

#[test]
fn roller_stops_on_the_tick_the_sensor_trips() {
    let rig = Rig::new();
    let mut robot = rig.robot();
    let mut intake = robot.intake_sequence();

    assert_eq!(intake.step(&mut robot), SequenceStatus::Running);
    assert_eq!(intake.phase(), IntakePhase::Loading);
    assert_eq!(rig.log.calls("intake"), vec![Call::Output(0.25)]);

    for _ in 0..5 {
        rig.clock.advance(TICK);
        assert_eq!(intake.step(&mut robot), SequenceStatus::Running);
        assert_eq!(intake.phase(), IntakePhase::Loading);
    }

    rig.piece.set(Some(true));
    rig.clock.advance(TICK);
    assert_eq!(intake.step(&mut robot), SequenceStatus::Running);
    assert_eq!(intake.phase(), IntakePhase::Loaded);
    assert_eq!(rig.log.last("intake"), Some(Call::Stop));
    assert_eq!(intake.report().load_time, Some(Duration::from_millis(120)));

    rig.clock.advance(TICK);
    match intake.step(&mut robot) {
        SequenceStatus::Complete(Outcome::Intake(report)) => {
            assert_eq!(report.outcome, Some(IntakeOutcome::Loaded));
            assert!(!report.cancelled);
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert_eq!(rig.log.stops("intake"), 1);
    assert_eq!(rig.lights(), vec!["intake_running", "intake_loaded"]);
}

#[test]
fn sensor_errors_keep_loading() {
    let rig = Rig::new();
    rig.piece.set(None);
    let mut robot = rig.robot();
    let mut intake = robot.intake_sequence();
    for _ in 0..20 {
        intake.step(&mut robot);
        rig.clock.advance(TICK);
    }
    assert_eq!(intake.phase(), IntakePhase::Loading);
    assert_eq!(rig.log.stops("intake"), 0);
}

#[test]
fn load_timeout_stops_roller() {
    let rig = Rig::new();
    let mut robot = rig
        .builder()
        .with_intake_cfg(IntakeCfg {
            load_timeout: Some(Duration::from_millis(100)),
            ..IntakeCfg::default()
        })
        .build()
        .unwrap();
    let mut intake = robot.intake_sequence();

    let mut finished_at = None;
    for _ in 0..50 {
        if let SequenceStatus::Complete(_) = intake.step(&mut robot) {
            finished_at = Some(rig.now_ms());
            break;
        }
        rig.clock.advance(TICK);
    }
    assert_eq!(finished_at, Some(100));
    assert_eq!(intake.report().outcome, Some(IntakeOutcome::TimedOut));
    assert_eq!(rig.log.last("intake"), Some(Call::Stop));
}

#[test]
fn waits_for_unload_when_configured() {
    let rig = Rig::new();
    let mut robot = rig
        .builder()
        .with_intake_cfg(IntakeCfg {
            wait_for_unload: true,
            ..IntakeCfg::default()
        })
        .build()
        .unwrap();
    let mut intake = robot.intake_sequence();
    rig.piece.set(Some(true));

    intake.step(&mut robot);
    intake.step(&mut robot);
    assert_eq!(intake.phase(), IntakePhase::Loaded);
    intake.step(&mut robot);
    assert_eq!(intake.phase(), IntakePhase::WaitingForUnload);

    for _ in 0..10 {
        assert_eq!(intake.step(&mut robot), SequenceStatus::Running);
    }
    rig.piece.set(Some(false));
    assert!(matches!(intake.step(&mut robot), SequenceStatus::Complete(_)));
    let report = intake.report();
    assert_eq!(report.outcome, Some(IntakeOutcome::Loaded));
    assert!(report.unloaded);
    // Roller was stopped once, at load.
    assert_eq!(rig.log.stops("intake"), 1);
}

#[test]
fn cancel_while_loading_stops_roller() {
    let rig = Rig::new();
    let mut robot = rig.robot();
    let mut intake = robot.intake_sequence();
    intake.step(&mut robot);

    intake.cancel();
    assert!(matches!(intake.step(&mut robot), SequenceStatus::Complete(_)));
    let report = intake.report();
    assert_eq!(report.outcome, Some(IntakeOutcome::Cancelled));
    assert!(report.cancelled);
    assert_eq!(rig.log.last("intake"), Some(Call::Stop));
    assert!(intake.outcome().is_some_and(|o| o.was_cancelled()));
}

#[test]
fn cancel_after_finish_is_a_no_op() {
    let rig = Rig::new();
    rig.piece.set(Some(true));
    let mut robot = rig.robot();
    let mut intake = robot.intake_sequence();
    while !intake.is_finished() {
        intake.step(&mut robot);
    }
    intake.cancel();
    intake.step(&mut robot);
    assert!(!intake.report().cancelled);
    assert_eq!(intake.report().outcome, Some(IntakeOutcome::Loaded));
}
