//! Type-state builder for `Robot`.
//!
//! The builder enforces at compile time that the shooter, intake and vision
//! collaborators are provided before `build()` is available. `try_build()` is
//! always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use shooter_traits::clock::{Clock, MonotonicClock};
use shooter_traits::{AngleDrive, BinarySensor, Indicator, Motor, RangeSensor};

use crate::actuator::{ActuatorController, FlywheelDrive, PositionDrive};
use crate::calibration::CalibrationSource;
use crate::config::{FeedExit, IntakeCfg, RangeLimits, SamplingCfg, ShotCfg, ToleranceCfg};
use crate::error::{BuildError, Result};
use crate::mocks::NoopIndicator;
use crate::range_table::RangeTable;
use crate::robot::{Intake, RangeSource, Robot, RobotSettings, Shooter};
use crate::sampler::RangeSampler;
use crate::util::as_millis_u64;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

struct ShooterParts {
    flywheel: Box<dyn Motor>,
    angle: Box<dyn AngleDrive>,
    feed: Box<dyn Motor>,
}

struct IntakeParts {
    motor: Box<dyn Motor>,
    sensor: Box<dyn BinarySensor>,
}

/// Builder for `Robot`. All settings are validated on `build()`.
pub struct RobotBuilder<S, I, V> {
    shooter: Option<ShooterParts>,
    intake: Option<IntakeParts>,
    vision: Option<Box<dyn RangeSensor + Send>>,
    indicator: Option<Box<dyn Indicator>>,
    speed_points: Option<Vec<(f64, f64)>>,
    angle_points: Option<Vec<(f64, f64)>>,
    shot: Option<ShotCfg>,
    intake_cfg: Option<IntakeCfg>,
    tolerances: Option<ToleranceCfg>,
    limits: Option<RangeLimits>,
    sampling: Option<SamplingCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    _s: PhantomData<S>,
    _i: PhantomData<I>,
    _v: PhantomData<V>,
}

impl Default for RobotBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            shooter: None,
            intake: None,
            vision: None,
            indicator: None,
            speed_points: None,
            angle_points: None,
            shot: None,
            intake_cfg: None,
            tolerances: None,
            limits: None,
            sampling: None,
            clock: None,
            _s: PhantomData,
            _i: PhantomData,
            _v: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn table(name: &'static str, points: Option<Vec<(f64, f64)>>) -> Result<RangeTable> {
    let points = points.ok_or_else(|| eyre::Report::new(BuildError::MissingTable(name)))?;
    RangeTable::new(points)
        .map_err(|source| eyre::Report::new(BuildError::InvalidTable { table: name, source }))
}

fn check_output(v: f64) -> bool {
    v > 0.0 && v <= 1.0
}

fn check_tolerance(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

impl<S, I, V> RobotBuilder<S, I, V> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Robot> {
        let shooter = self
            .shooter
            .ok_or_else(|| eyre::Report::new(BuildError::MissingShooter))?;
        let intake = self
            .intake
            .ok_or_else(|| eyre::Report::new(BuildError::MissingIntake))?;
        let vision = self
            .vision
            .ok_or_else(|| eyre::Report::new(BuildError::MissingVision))?;

        // ── Validation ───────────────────────────────────────────────────────
        let shot = self.shot.unwrap_or_default();
        if shot.stabilize_timeout.is_zero() {
            return Err(invalid("stabilize_timeout must be > 0"));
        }
        if shot.feed_run.is_zero() {
            return Err(invalid("feed_run must be > 0"));
        }
        if !check_output(shot.kicker_output) {
            return Err(invalid("kicker_output must be in (0, 1]"));
        }
        if let FeedExit::PieceCleared { guard } = shot.feed_exit {
            if guard >= shot.feed_run {
                return Err(invalid("feed guard must be shorter than feed_run"));
            }
        }
        let intake_cfg = self.intake_cfg.unwrap_or_default();
        if !check_output(intake_cfg.output) {
            return Err(invalid("intake output must be in (0, 1]"));
        }
        let tolerances = self.tolerances.unwrap_or_default();
        if !check_tolerance(tolerances.speed_rpm) || !check_tolerance(tolerances.angle_deg) {
            return Err(invalid("tolerances must be finite and >= 0"));
        }
        let limits = self.limits.unwrap_or_default();
        if !limits.min_m.is_finite() || !limits.max_m.is_finite() || limits.min_m >= limits.max_m {
            return Err(invalid("range limits must be finite with min < max"));
        }
        let sampling = self.sampling.unwrap_or_default();
        if sampling.hz > 0 && sampling.stale.is_zero() {
            return Err(invalid("stale window must be > 0 when sampling"));
        }
        let speed_table = table("speed", self.speed_points)?;
        let angle_table = table("angle", self.angle_points)?;

        // ── Assemble ─────────────────────────────────────────────────────────
        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };

        // The sampler thread paces itself in real time regardless of the
        // robot clock, so a virtual clock is never advanced from two threads.
        let vision = if sampling.hz > 0 {
            tracing::debug!(hz = sampling.hz, "spawning range sampler");
            RangeSource::Sampled {
                sampler: RangeSampler::spawn(vision, sampling.hz, Arc::new(MonotonicClock::new())),
                last: None,
                stale_ms: as_millis_u64(sampling.stale),
            }
        } else {
            RangeSource::Direct(vision)
        };

        tracing::debug!(
            speed_entries = speed_table.len(),
            angle_entries = angle_table.len(),
            "robot built"
        );

        Ok(Robot {
            shooter: Shooter {
                speed: ActuatorController::new(
                    "flywheel",
                    FlywheelDrive(shooter.flywheel),
                    speed_table,
                    tolerances.speed_rpm,
                ),
                angle: ActuatorController::new(
                    "angle",
                    PositionDrive(shooter.angle),
                    angle_table,
                    tolerances.angle_deg,
                ),
                feed: shooter.feed,
            },
            intake: Intake {
                motor: intake.motor,
            },
            piece_sensor: intake.sensor,
            indicator: self.indicator.unwrap_or_else(|| Box::new(NoopIndicator)),
            vision,
            clock,
            settings: RobotSettings {
                shot,
                intake: intake_cfg,
                limits,
            },
        })
    }

    fn retype<S2, I2, V2>(self) -> RobotBuilder<S2, I2, V2> {
        RobotBuilder {
            shooter: self.shooter,
            intake: self.intake,
            vision: self.vision,
            indicator: self.indicator,
            speed_points: self.speed_points,
            angle_points: self.angle_points,
            shot: self.shot,
            intake_cfg: self.intake_cfg,
            tolerances: self.tolerances,
            limits: self.limits,
            sampling: self.sampling,
            clock: self.clock,
            _s: PhantomData,
            _i: PhantomData,
            _v: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state.
impl<S, I, V> RobotBuilder<S, I, V> {
    pub fn with_indicator(mut self, indicator: impl Indicator + 'static) -> Self {
        self.indicator = Some(Box::new(indicator));
        self
    }
    pub fn with_speed_table(mut self, table: &RangeTable) -> Self {
        self.speed_points = Some(table.entries().collect());
        self
    }
    pub fn with_angle_table(mut self, table: &RangeTable) -> Self {
        self.angle_points = Some(table.entries().collect());
        self
    }
    /// Take both tables from a calibration source; validated on build.
    pub fn with_calibration(mut self, source: &dyn CalibrationSource) -> Self {
        self.speed_points = Some(source.speed_points());
        self.angle_points = Some(source.angle_points());
        self
    }
    pub fn with_shot_cfg(mut self, shot: ShotCfg) -> Self {
        self.shot = Some(shot);
        self
    }
    pub fn with_intake_cfg(mut self, intake: IntakeCfg) -> Self {
        self.intake_cfg = Some(intake);
        self
    }
    pub fn with_tolerances(mut self, tolerances: ToleranceCfg) -> Self {
        self.tolerances = Some(tolerances);
        self
    }
    pub fn with_range_limits(mut self, limits: RangeLimits) -> Self {
        self.limits = Some(limits);
        self
    }
    /// Poll the range feed on a background thread.
    pub fn with_sampling(mut self, sampling: SamplingCfg) -> Self {
        self.sampling = Some(sampling);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<I, V> RobotBuilder<Missing, I, V> {
    pub fn with_shooter(
        mut self,
        flywheel: impl Motor + 'static,
        angle: impl AngleDrive + 'static,
        feed: impl Motor + 'static,
    ) -> RobotBuilder<Set, I, V> {
        self.shooter = Some(ShooterParts {
            flywheel: Box::new(flywheel),
            angle: Box::new(angle),
            feed: Box::new(feed),
        });
        self.retype()
    }
}

impl<S, V> RobotBuilder<S, Missing, V> {
    pub fn with_intake(
        mut self,
        motor: impl Motor + 'static,
        piece_sensor: impl BinarySensor + 'static,
    ) -> RobotBuilder<S, Set, V> {
        self.intake = Some(IntakeParts {
            motor: Box::new(motor),
            sensor: Box::new(piece_sensor),
        });
        self.retype()
    }
}

impl<S, I> RobotBuilder<S, I, Missing> {
    pub fn with_vision(mut self, vision: impl RangeSensor + Send + 'static) -> RobotBuilder<S, I, Set> {
        self.vision = Some(Box::new(vision));
        self.retype()
    }
}

impl RobotBuilder<Set, Set, Set> {
    /// Validate and build the Robot. Only available when all collaborators are set.
    pub fn build(self) -> Result<Robot> {
        self.try_build()
    }
}
