#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Range-based targeting and shot sequencing (hardware-agnostic).
//!
//! All hardware interactions go through the traits in `shooter_traits`.
//!
//! ## Architecture
//!
//! - **Range tables**: floor lookup from range to setpoint (`range_table`)
//! - **Actuators**: setpoint, tolerance and at-target check (`actuator`)
//! - **Sequences**: shot and intake state machines stepped once per tick
//!   (`shot`, `intake`, `sequence`)
//! - **Scheduling**: tick loop with exclusive actuator ownership (`scheduler`,
//!   `runner`)
//! - **Assembly**: type-state `RobotBuilder` and config conversions
//!
//! Time comes from an injected `Clock`, so every sequence runs the same under
//! `ManualClock` in tests as on a real robot.

pub mod actuator;
pub mod builder;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod intake;
pub mod mocks;
pub mod range_table;
pub mod robot;
pub mod runner;
pub mod sampler;
pub mod scheduler;
pub mod sequence;
pub mod shot;
pub mod status;
pub mod util;

pub use actuator::{ActuatorController, AngleController, SetpointDrive, SpeedController};
pub use builder::RobotBuilder;
pub use calibration::{CalibrationSource, TableCalibration};
pub use config::{
    BindingMode, ConflictPolicy, FeedExit, IntakeCfg, RangeBinding, RangeLimits, SamplingCfg,
    SchedulerCfg, ShotCfg, ToleranceCfg,
};
pub use error::{BuildError, Result, ScheduleError, ShooterError, TableError};
pub use intake::{IntakeOutcome, IntakePhase, IntakeReport, IntakeSequencer};
pub use range_table::RangeTable;
pub use robot::Robot;
pub use runner::{RunLimits, RunSummary, run_until_idle};
pub use scheduler::{CommandId, Completed, Scheduler};
pub use sequence::{Command, Requirements, Step};
pub use shot::{ShotPhase, ShotReport, ShotSequencer, Stabilization};
pub use status::{Outcome, SequenceStatus};
