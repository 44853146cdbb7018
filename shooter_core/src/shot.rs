//! The shot protocol: set targets from range, wait for speed and angle,
//! run the kicker, shut down.
//!
//! Phases only move forward. `ShotPhase::transition` is the whole rule and
//! is a pure function of the tick's inputs; `ShotSequencer` gathers those
//! inputs from the robot and performs the entry action of each new phase.

use std::time::{Duration, Instant};

use crate::config::{FeedExit, RangeBinding, RangeLimits, ShotCfg};
use crate::robot::Robot;
use crate::sequence::{Command, Requirements, Step};
use crate::status::{Outcome, SequenceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShotPhase {
    Idle,
    RangingAndSettingTargets,
    Stabilizing,
    Feeding,
    ShuttingDown,
    /// Terminal.
    Done,
}

/// What the sequencer observed this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShotInputs {
    pub cancelled: bool,
    /// Time since the current phase was entered.
    pub in_phase: Duration,
    pub range_resolved: bool,
    pub speed_at_target: bool,
    pub angle_at_target: bool,
    /// Piece sensor, read only while feeding with `FeedExit::PieceCleared`.
    pub piece_present: Option<bool>,
}

impl ShotPhase {
    /// Phases that hand over to the next one within the same tick.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Idle | Self::RangingAndSettingTargets)
    }

    pub fn transition(self, inputs: &ShotInputs, cfg: &ShotCfg) -> Step<Self> {
        match self {
            Self::Done => Step::Complete,
            Self::ShuttingDown => Step::Advance(Self::Done),
            _ if inputs.cancelled => Step::Advance(Self::ShuttingDown),
            Self::Idle => Step::Advance(Self::RangingAndSettingTargets),
            Self::RangingAndSettingTargets => {
                if inputs.range_resolved {
                    Step::Advance(Self::Stabilizing)
                } else {
                    Step::Continue
                }
            }
            Self::Stabilizing => {
                let settled = inputs.speed_at_target && inputs.angle_at_target;
                if settled || inputs.in_phase >= cfg.stabilize_timeout {
                    Step::Advance(Self::Feeding)
                } else {
                    Step::Continue
                }
            }
            Self::Feeding => {
                let cleared = match cfg.feed_exit {
                    FeedExit::Timed => false,
                    FeedExit::PieceCleared { guard } => {
                        inputs.in_phase >= guard && inputs.piece_present == Some(false)
                    }
                };
                if cleared || inputs.in_phase >= cfg.feed_run {
                    Step::Advance(Self::ShuttingDown)
                } else {
                    Step::Continue
                }
            }
        }
    }
}

/// How the wait for speed and angle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stabilization {
    Reached,
    /// Fired anyway after `stabilize_timeout`.
    TimedOut,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShotReport {
    pub range_m: Option<f64>,
    pub speed_target: Option<f64>,
    pub angle_target: Option<f64>,
    pub stabilization: Option<Stabilization>,
    pub stabilize_time: Option<Duration>,
    pub feed_time: Option<Duration>,
    /// Range was outside the configured shooting window.
    pub outside_limits: bool,
    pub cancelled: bool,
}

#[derive(Debug)]
pub struct ShotSequencer {
    cfg: ShotCfg,
    limits: RangeLimits,
    binding: RangeBinding,
    phase: ShotPhase,
    entered_at: Option<Instant>,
    cancel_requested: bool,
    report: ShotReport,
}

impl ShotSequencer {
    pub fn new(cfg: ShotCfg, limits: RangeLimits, binding: RangeBinding) -> Self {
        Self {
            cfg,
            limits,
            binding,
            phase: ShotPhase::Idle,
            entered_at: None,
            cancel_requested: false,
            report: ShotReport::default(),
        }
    }

    pub fn phase(&self) -> ShotPhase {
        self.phase
    }

    pub fn report(&self) -> &ShotReport {
        &self.report
    }

    fn resolve_range(&self, robot: &mut Robot) -> Option<f64> {
        match self.binding {
            RangeBinding::Fixed(r) => Some(r),
            RangeBinding::Live => robot.read_range(),
        }
    }

    fn gather(&mut self, robot: &mut Robot, now: Instant) -> ShotInputs {
        let in_phase = self
            .entered_at
            .map_or(Duration::ZERO, |t| now.saturating_duration_since(t));
        let mut inputs = ShotInputs {
            cancelled: self.cancel_requested,
            in_phase,
            ..ShotInputs::default()
        };
        if inputs.cancelled {
            return inputs;
        }
        match self.phase {
            ShotPhase::RangingAndSettingTargets => {
                // Resolved once per shot, never re-sampled.
                if self.report.range_m.is_none() {
                    self.report.range_m = self.resolve_range(robot);
                }
                inputs.range_resolved = self.report.range_m.is_some();
                if !inputs.range_resolved {
                    tracing::debug!("waiting for range");
                }
            }
            ShotPhase::Stabilizing => {
                robot.shooter.speed.refresh();
                robot.shooter.angle.refresh();
                inputs.speed_at_target = robot.shooter.speed.at_target();
                inputs.angle_at_target = robot.shooter.angle.at_target();
            }
            ShotPhase::Feeding => {
                if matches!(self.cfg.feed_exit, FeedExit::PieceCleared { .. }) {
                    inputs.piece_present = robot.piece_present();
                }
            }
            ShotPhase::Idle | ShotPhase::ShuttingDown | ShotPhase::Done => {}
        }
        inputs
    }

    fn enter(&mut self, next: ShotPhase, robot: &mut Robot, now: Instant, inputs: &ShotInputs) {
        tracing::debug!(from = ?self.phase, to = ?next, "shot phase");
        match next {
            ShotPhase::Idle => {}
            ShotPhase::RangingAndSettingTargets => {
                tracing::info!(binding = ?self.binding, "shot triggered");
            }
            ShotPhase::Stabilizing => {
                if let Some(range) = self.report.range_m {
                    if !self.limits.contains(range) {
                        self.report.outside_limits = true;
                        tracing::warn!(
                            range_m = range,
                            min_m = self.limits.min_m,
                            max_m = self.limits.max_m,
                            "range outside shooting window; firing with clamped setpoints"
                        );
                    }
                    self.report.speed_target = Some(robot.shooter.speed.set_target_by_range(range));
                    self.report.angle_target = Some(robot.shooter.angle.set_target_by_range(range));
                }
                robot.indicator.show_pre_shoot();
            }
            ShotPhase::Feeding => {
                self.report.stabilize_time = Some(inputs.in_phase);
                if inputs.speed_at_target && inputs.angle_at_target {
                    self.report.stabilization = Some(Stabilization::Reached);
                } else {
                    self.report.stabilization = Some(Stabilization::TimedOut);
                    tracing::warn!(
                        waited_ms = crate::util::as_millis_u64(inputs.in_phase),
                        speed_ok = inputs.speed_at_target,
                        angle_ok = inputs.angle_at_target,
                        "stabilize timeout; firing anyway"
                    );
                }
                robot.shooter.run_feed(self.cfg.kicker_output);
                robot.indicator.show_shot_fired();
            }
            ShotPhase::ShuttingDown => {
                if self.phase == ShotPhase::Feeding {
                    self.report.feed_time = Some(inputs.in_phase);
                }
                if inputs.cancelled {
                    self.report.cancelled = true;
                    tracing::info!(phase = ?self.phase, "shot cancelled");
                }
                robot.shooter.speed.stop();
                robot.shooter.stop_feed();
                robot.indicator.show_post_shoot_cleanup();
            }
            ShotPhase::Done => {
                tracing::info!(
                    range_m = ?self.report.range_m,
                    speed_target = ?self.report.speed_target,
                    angle_target = ?self.report.angle_target,
                    stabilization = ?self.report.stabilization,
                    cancelled = self.report.cancelled,
                    "shot complete"
                );
            }
        }
        self.phase = next;
        self.entered_at = Some(now);
    }

    fn complete(&self) -> SequenceStatus {
        SequenceStatus::Complete(Outcome::Shot(self.report.clone()))
    }
}

impl Command for ShotSequencer {
    fn name(&self) -> &'static str {
        "shoot"
    }

    fn requirements(&self) -> Requirements {
        Requirements::SHOOTER
    }

    fn step(&mut self, robot: &mut Robot) -> SequenceStatus {
        let now = robot.clock.now();
        loop {
            let inputs = self.gather(robot, now);
            match self.phase.transition(&inputs, &self.cfg) {
                Step::Continue => return SequenceStatus::Running,
                Step::Complete => return self.complete(),
                Step::Advance(next) => {
                    self.enter(next, robot, now, &inputs);
                    if next == ShotPhase::Done {
                        return self.complete();
                    }
                    if !next.is_transient() {
                        return SequenceStatus::Running;
                    }
                }
            }
        }
    }

    fn cancel(&mut self) {
        if self.phase < ShotPhase::ShuttingDown {
            self.cancel_requested = true;
        }
    }

    fn is_finished(&self) -> bool {
        self.phase == ShotPhase::Done
    }

    fn outcome(&self) -> Option<Outcome> {
        self.is_finished()
            .then(|| Outcome::Shot(self.report.clone()))
    }
}
