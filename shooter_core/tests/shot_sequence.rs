mod common;

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{Call, Reading, Rig, TICK};
use rstest::rstest;
use shooter_core::{
    Command, FeedExit, Outcome, RangeBinding, Robot, SequenceStatus, ShotCfg, ShotPhase,
    ShotSequencer, Stabilization,
};

/// Step once per tick until done; returns the time (ms) each phase was first seen.
fn run_shot(rig: &Rig, robot: &mut Robot, shot: &mut ShotSequencer) -> BTreeMap<ShotPhase, u128> {
    let mut seen = BTreeMap::new();
    for _ in 0..1000 {
        let status = shot.step(robot);
        seen.entry(shot.phase()).or_insert_with(|| rig.now_ms());
        if matches!(status, SequenceStatus::Complete(_)) {
            return seen;
        }
        rig.clock.advance(TICK);
    }
    panic!("shot never finished: {seen:?}");
}

#[test]
fn never_converging_shot_fires_on_timeout() {
    let rig = Rig::new();
    rig.flywheel.set(Reading::Fixed(0.0));
    let mut robot = rig.robot();
    let mut shot = robot.shot_sequence(RangeBinding::Live);

    let seen = run_shot(&rig, &mut robot, &mut shot);

    assert_eq!(seen[&ShotPhase::Stabilizing], 0);
    assert_eq!(seen[&ShotPhase::Feeding], 3000);
    assert_eq!(seen[&ShotPhase::ShuttingDown], 5000);
    assert_eq!(seen[&ShotPhase::Done], 5020);

    let r = shot.report();
    assert_eq!(r.range_m, Some(10.0));
    assert_eq!(r.speed_target, Some(2000.0));
    assert_eq!(r.angle_target, Some(31.0));
    assert_eq!(r.stabilization, Some(Stabilization::TimedOut));
    assert_eq!(r.stabilize_time, Some(Duration::from_secs(3)));
    assert_eq!(r.feed_time, Some(Duration::from_secs(2)));
    assert!(!r.cancelled);
    assert!(!r.outside_limits);
}

#[test]
fn converged_shot_fires_on_next_tick() {
    let rig = Rig::new();
    let mut robot = rig.robot();
    let mut shot = robot.shot_sequence(RangeBinding::Live);

    let seen = run_shot(&rig, &mut robot, &mut shot);

    // Targets are set on the first tick and checked from the second.
    assert_eq!(seen[&ShotPhase::Feeding], 20);
    assert_eq!(seen[&ShotPhase::ShuttingDown], 2020);
    assert_eq!(shot.report().stabilization, Some(Stabilization::Reached));
}

#[test]
fn first_tick_sets_targets_and_indicator() {
    let rig = Rig::new();
    let mut robot = rig.robot();
    let mut shot = robot.shot_sequence(RangeBinding::Live);

    assert_eq!(shot.step(&mut robot), SequenceStatus::Running);
    assert_eq!(shot.phase(), ShotPhase::Stabilizing);
    assert_eq!(rig.log.calls("flywheel"), vec![Call::Setpoint(2000.0)]);
    assert_eq!(rig.log.calls("angle"), vec![Call::Setpoint(31.0)]);
    assert!(rig.log.calls("feed").is_empty());
    assert_eq!(rig.lights(), vec!["pre_shoot"]);
}

#[test]
fn shutdown_stops_flywheel_and_feed_but_not_angle() {
    let rig = Rig::new();
    let mut robot = rig.robot();
    let mut shot = robot.shot_sequence(RangeBinding::Live);
    run_shot(&rig, &mut robot, &mut shot);

    assert_eq!(rig.log.calls("feed"), vec![Call::Output(0.25), Call::Stop]);
    assert_eq!(rig.log.last("flywheel"), Some(Call::Stop));
    assert_eq!(rig.log.stops("angle"), 0);
    assert_eq!(robot.shooter.speed.target(), Some(0.0));
    assert_eq!(robot.shooter.angle.target(), Some(31.0));
    assert_eq!(
        rig.lights(),
        vec!["pre_shoot", "shot_fired", "post_shoot_cleanup"]
    );
}

#[test]
fn live_range_is_read_once_per_shot() {
    let rig = Rig::new();
    let mut robot = rig.robot();
    let mut shot = robot.shot_sequence(RangeBinding::Live);
    shot.step(&mut robot);
    rig.set_range(Some(5.0));
    run_shot(&rig, &mut robot, &mut shot);

    assert_eq!(rig.range_reads.load(Ordering::SeqCst), 1);
    assert_eq!(shot.report().speed_target, Some(2000.0));
}

#[test]
fn fixed_binding_never_reads_vision() {
    let rig = Rig::new();
    rig.set_range(None);
    let mut robot = rig.robot();
    let mut shot = robot.shot_sequence(RangeBinding::Fixed(7.5));
    run_shot(&rig, &mut robot, &mut shot);

    assert_eq!(rig.range_reads.load(Ordering::SeqCst), 0);
    assert_eq!(shot.report().speed_target, Some(1500.0));
    assert_eq!(shot.report().angle_target, Some(40.0));
}

#[test]
fn missing_range_holds_in_ranging_without_actuation() {
    let rig = Rig::new();
    rig.set_range(None);
    let mut robot = rig.robot();
    let mut shot = robot.shot_sequence(RangeBinding::Live);
    for _ in 0..10 {
        assert_eq!(shot.step(&mut robot), SequenceStatus::Running);
        assert_eq!(shot.phase(), ShotPhase::RangingAndSettingTargets);
        rig.clock.advance(TICK);
    }
    assert!(rig.log.calls("flywheel").is_empty());
    assert!(rig.lights().is_empty());

    rig.set_range(Some(7.5));
    shot.step(&mut robot);
    assert_eq!(shot.phase(), ShotPhase::Stabilizing);
    assert_eq!(rig.log.calls("flywheel"), vec![Call::Setpoint(1500.0)]);
}

#[test]
fn range_outside_window_is_flagged_but_fired() {
    let rig = Rig::new();
    let mut robot = rig.robot();
    let mut shot = robot.shot_sequence(RangeBinding::Fixed(20.0));
    run_shot(&rig, &mut robot, &mut shot);

    let r = shot.report();
    assert!(r.outside_limits);
    assert_eq!(r.speed_target, Some(2500.0));
    assert_eq!(r.angle_target, Some(25.0));
    assert!(rig.log.calls("feed").contains(&Call::Output(0.25)));
}

#[test]
fn measurement_failures_fall_back_to_timeout() {
    let rig = Rig::new();
    rig.angle.set(Reading::Fail);
    let mut robot = rig.robot();
    let mut shot = robot.shot_sequence(RangeBinding::Live);
    let seen = run_shot(&rig, &mut robot, &mut shot);
    assert_eq!(seen[&ShotPhase::Feeding], 3000);
    assert_eq!(shot.report().stabilization, Some(Stabilization::TimedOut));
}

#[test]
fn piece_cleared_ends_feed_after_guard() {
    let rig = Rig::new();
    rig.piece.set(Some(true));
    let mut robot = rig
        .builder()
        .with_shot_cfg(ShotCfg {
            feed_exit: FeedExit::PieceCleared {
                guard: Duration::from_millis(100),
            },
            ..ShotCfg::default()
        })
        .build()
        .unwrap();
    let mut shot = robot.shot_sequence(RangeBinding::Live);
    shot.step(&mut robot);
    rig.clock.advance(TICK);
    shot.step(&mut robot);
    assert_eq!(shot.phase(), ShotPhase::Feeding);

    // Piece leaves almost at once; the guard still holds the feed.
    rig.piece.set(Some(false));
    let seen = run_shot(&rig, &mut robot, &mut shot);
    assert_eq!(seen[&ShotPhase::ShuttingDown], 120);
    assert_eq!(shot.report().feed_time, Some(Duration::from_millis(100)));
}

#[derive(Debug, Clone, Copy)]
enum CancelAt {
    BeforeFirstStep,
    Ranging,
    Stabilizing,
    Feeding,
}

#[rstest]
#[case(CancelAt::BeforeFirstStep)]
#[case(CancelAt::Ranging)]
#[case(CancelAt::Stabilizing)]
#[case(CancelAt::Feeding)]
fn cancel_stops_flywheel_and_feed_on_next_step(#[case] at: CancelAt) {
    let rig = Rig::new();
    rig.flywheel.set(Reading::Fixed(0.0));
    if matches!(at, CancelAt::Ranging) {
        rig.set_range(None);
    }
    let mut robot = rig.robot();
    let mut shot = robot.shot_sequence(RangeBinding::Live);

    let expected_phase = match at {
        CancelAt::BeforeFirstStep => ShotPhase::Idle,
        CancelAt::Ranging => {
            shot.step(&mut robot);
            ShotPhase::RangingAndSettingTargets
        }
        CancelAt::Stabilizing => {
            shot.step(&mut robot);
            ShotPhase::Stabilizing
        }
        CancelAt::Feeding => {
            shot.step(&mut robot);
            rig.clock.advance(Duration::from_secs(3));
            shot.step(&mut robot);
            ShotPhase::Feeding
        }
    };
    assert_eq!(shot.phase(), expected_phase);

    shot.cancel();
    rig.log.clear();
    rig.clock.advance(TICK);
    assert_eq!(shot.step(&mut robot), SequenceStatus::Running);
    assert_eq!(shot.phase(), ShotPhase::ShuttingDown);
    assert_eq!(rig.log.stops("flywheel"), 1);
    assert_eq!(rig.log.stops("feed"), 1);
    assert_eq!(rig.log.stops("angle"), 0);

    rig.clock.advance(TICK);
    match shot.step(&mut robot) {
        SequenceStatus::Complete(Outcome::Shot(report)) => assert!(report.cancelled),
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(shot.is_finished());
}

#[test]
fn cancel_during_shutdown_is_ignored() {
    let rig = Rig::new();
    let mut robot = rig.robot();
    let mut shot = robot.shot_sequence(RangeBinding::Live);
    shot.step(&mut robot);
    rig.clock.advance(TICK);
    shot.step(&mut robot);
    rig.clock.advance(Duration::from_secs(2));
    shot.step(&mut robot);
    assert_eq!(shot.phase(), ShotPhase::ShuttingDown);

    shot.cancel();
    rig.clock.advance(TICK);
    shot.step(&mut robot);
    assert_eq!(shot.phase(), ShotPhase::Done);
    assert!(!shot.report().cancelled);
    assert_eq!(rig.log.stops("feed"), 1);
}

#[test]
fn stepping_after_done_keeps_reporting_completion() {
    let rig = Rig::new();
    let mut robot = rig.robot();
    let mut shot = robot.shot_sequence(RangeBinding::Live);
    run_shot(&rig, &mut robot, &mut shot);
    let calls = rig.log.calls("flywheel").len();

    assert!(matches!(shot.step(&mut robot), SequenceStatus::Complete(_)));
    assert_eq!(rig.log.calls("flywheel").len(), calls);
    assert!(shot.outcome().is_some());
}
