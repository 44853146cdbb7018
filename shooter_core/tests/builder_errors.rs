mod common;

use common::{Rig, angle_points, speed_points};
use rstest::rstest;
use shooter_core::{
    BuildError, FeedExit, IntakeCfg, RangeLimits, Robot, ShotCfg, TableCalibration, TableError,
    ToleranceCfg,
};
use std::time::Duration;

fn build_error(r: shooter_core::Result<Robot>) -> BuildError {
    let err = r.expect_err("build should fail");
    err.downcast_ref::<BuildError>()
        .cloned()
        .unwrap_or_else(|| panic!("unexpected error: {err}"))
}

#[test]
fn missing_collaborators_are_reported() {
    assert!(matches!(
        build_error(Robot::builder().try_build()),
        BuildError::MissingShooter
    ));
}

#[test]
fn empty_table_is_reported() {
    let rig = Rig::new();
    let err = build_error(
        rig.builder()
            .with_calibration(&TableCalibration::new(speed_points(), vec![]))
            .try_build(),
    );
    assert!(
        matches!(
            err,
            BuildError::InvalidTable {
                table: "angle",
                source: TableError::Empty
            }
        ),
        "{err}"
    );
}

#[test]
fn unsorted_table_is_rejected_at_build() {
    let rig = Rig::new();
    let mut speed = speed_points();
    speed.swap(1, 2);
    let err = build_error(
        rig.builder()
            .with_calibration(&TableCalibration::new(speed, angle_points()))
            .try_build(),
    );
    assert!(matches!(
        err,
        BuildError::InvalidTable {
            table: "speed",
            source: TableError::NotIncreasing { index: 2 }
        }
    ));
}

#[rstest]
#[case::zero_kicker(
    ShotCfg { kicker_output: 0.0, ..ShotCfg::default() },
    "kicker_output"
)]
#[case::zero_timeout(
    ShotCfg { stabilize_timeout: Duration::ZERO, ..ShotCfg::default() },
    "stabilize_timeout"
)]
#[case::guard_too_long(
    ShotCfg {
        feed_exit: FeedExit::PieceCleared { guard: Duration::from_secs(2) },
        ..ShotCfg::default()
    },
    "feed guard"
)]
fn invalid_shot_cfg_is_rejected(#[case] shot: ShotCfg, #[case] needle: &str) {
    let rig = Rig::new();
    let err = build_error(rig.builder().with_shot_cfg(shot).try_build());
    assert!(err.to_string().contains(needle), "{err}");
}

#[test]
fn invalid_intake_tolerance_and_limits_are_rejected() {
    let rig = Rig::new();
    let err = build_error(
        rig.builder()
            .with_intake_cfg(IntakeCfg {
                output: 1.5,
                ..IntakeCfg::default()
            })
            .try_build(),
    );
    assert!(err.to_string().contains("intake output"));

    let err = build_error(
        rig.builder()
            .with_tolerances(ToleranceCfg {
                speed_rpm: -1.0,
                angle_deg: 2.0,
            })
            .try_build(),
    );
    assert!(err.to_string().contains("tolerances"));

    let err = build_error(
        rig.builder()
            .with_range_limits(RangeLimits {
                min_m: 10.0,
                max_m: 1.0,
            })
            .try_build(),
    );
    assert!(err.to_string().contains("range limits"));
}

#[test]
fn defaults_are_applied() {
    let rig = Rig::new();
    let robot = rig.robot();
    let s = robot.settings();
    assert_eq!(s.shot.stabilize_timeout, Duration::from_secs(3));
    assert_eq!(s.shot.feed_run, Duration::from_secs(2));
    assert_eq!(s.shot.kicker_output, 0.25);
    assert_eq!(s.intake.output, 0.25);
    assert_eq!(s.intake.load_timeout, None);
    assert_eq!(s.limits, RangeLimits::default());
    assert_eq!(robot.shooter.speed.tolerance(), 25.0);
    assert_eq!(robot.shooter.angle.tolerance(), 2.0);
}
