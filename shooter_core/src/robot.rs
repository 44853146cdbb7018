//! The subsystems a scheduler drives, assembled by `RobotBuilder`.

use std::sync::Arc;

use shooter_traits::{BinarySensor, Clock, Indicator, Motor, RangeSensor};

use crate::actuator::{AngleController, SpeedController};
use crate::builder::{Missing, RobotBuilder};
use crate::config::{BindingMode, IntakeCfg, RangeBinding, RangeLimits, ShotCfg};
use crate::hw_error::map_hw_error;
use crate::intake::IntakeSequencer;
use crate::sampler::RangeSampler;
use crate::shot::ShotSequencer;

/// Flywheel, angle mechanism and kicker.
pub struct Shooter {
    pub speed: SpeedController,
    pub angle: AngleController,
    pub feed: Box<dyn Motor>,
}

impl Shooter {
    pub fn run_feed(&mut self, output: f64) {
        run_open_loop(self.feed.as_mut(), "feed", output);
    }

    pub fn stop_feed(&mut self) {
        halt(self.feed.as_mut(), "feed");
    }
}

pub struct Intake {
    pub motor: Box<dyn Motor>,
}

impl Intake {
    pub fn run(&mut self, output: f64) {
        run_open_loop(self.motor.as_mut(), "intake", output);
    }

    pub fn stop(&mut self) {
        halt(self.motor.as_mut(), "intake");
    }
}

fn run_open_loop(motor: &mut dyn Motor, name: &'static str, output: f64) {
    if let Err(e) = motor.set_output(output) {
        tracing::warn!(motor = name, output, error = %map_hw_error(&*e), "set_output failed");
    }
}

fn halt(motor: &mut dyn Motor, name: &'static str) {
    if let Err(e) = motor.stop() {
        tracing::warn!(motor = name, error = %map_hw_error(&*e), "stop failed");
    }
}

/// Where range readings come from.
pub enum RangeSource {
    /// Read the sensor on the control thread.
    Direct(Box<dyn RangeSensor + Send>),
    /// Take the newest reading from a background sampler.
    Sampled {
        sampler: RangeSampler,
        last: Option<f64>,
        stale_ms: u64,
    },
}

impl RangeSource {
    pub fn read(&mut self) -> Option<f64> {
        match self {
            RangeSource::Direct(sensor) => match sensor.current_range_m() {
                Ok(r) if r.is_finite() => Some(r),
                Ok(r) => {
                    tracing::warn!(range_m = r, "non-finite range reading");
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %map_hw_error(&*e), "range unavailable");
                    None
                }
            },
            RangeSource::Sampled {
                sampler,
                last,
                stale_ms,
            } => {
                if let Some(r) = sampler.latest() {
                    *last = Some(r);
                }
                let stalled = sampler.stalled_for_now();
                if stalled > *stale_ms {
                    tracing::warn!(stalled_ms = stalled, stale_ms = *stale_ms, "range reading stale");
                    return None;
                }
                *last
            }
        }
    }
}

/// Settings captured at build time and handed to new sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotSettings {
    pub shot: ShotCfg,
    pub intake: IntakeCfg,
    pub limits: RangeLimits,
}

pub struct Robot {
    pub shooter: Shooter,
    pub intake: Intake,
    /// "Piece loaded" sensor, shared read-only by intake and shot.
    pub piece_sensor: Box<dyn BinarySensor>,
    /// Not an exclusive resource: any sequence may write.
    pub indicator: Box<dyn Indicator>,
    pub(crate) vision: RangeSource,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) settings: RobotSettings,
}

impl core::fmt::Debug for Robot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Robot")
            .field("speed", &self.shooter.speed)
            .field("angle", &self.shooter.angle)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Robot {
    /// Start building a Robot.
    pub fn builder() -> RobotBuilder<Missing, Missing, Missing> {
        RobotBuilder::default()
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn settings(&self) -> &RobotSettings {
        &self.settings
    }

    /// Current range to target, `None` when the feed is unavailable or stale.
    pub fn read_range(&mut self) -> Option<f64> {
        self.vision.read()
    }

    /// Whether a piece is loaded; `None` when the sensor read fails.
    pub fn piece_present(&mut self) -> Option<bool> {
        match self.piece_sensor.is_tripped() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %map_hw_error(&*e), "piece sensor unavailable");
                None
            }
        }
    }

    /// Resolve a binding mode at trigger time. `Snapshot` reads the range feed
    /// now and fails (`None`) if it has no reading.
    pub fn bind_range(&mut self, mode: BindingMode) -> Option<RangeBinding> {
        match mode {
            BindingMode::Live => Some(RangeBinding::Live),
            BindingMode::Snapshot => self.read_range().map(RangeBinding::Fixed),
        }
    }

    /// A shot using this robot's shot settings.
    pub fn shot_sequence(&self, binding: RangeBinding) -> ShotSequencer {
        ShotSequencer::new(self.settings.shot.clone(), self.settings.limits, binding)
    }

    /// An intake run using this robot's intake settings.
    pub fn intake_sequence(&self) -> IntakeSequencer {
        IntakeSequencer::new(self.settings.intake.clone())
    }
}
