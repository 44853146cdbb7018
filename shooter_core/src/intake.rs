//! The intake protocol: run the roller until the piece sensor trips.

use std::time::{Duration, Instant};

use crate::config::IntakeCfg;
use crate::robot::Robot;
use crate::sequence::{Command, Requirements, Step};
use crate::status::{Outcome, SequenceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntakePhase {
    Idle,
    Loading,
    Loaded,
    WaitingForUnload,
    /// Terminal.
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntakeInputs {
    pub cancelled: bool,
    pub in_phase: Duration,
    /// `None` when the sensor read failed; treated as "no change".
    pub piece_present: Option<bool>,
}

impl IntakePhase {
    pub fn transition(self, inputs: &IntakeInputs, cfg: &IntakeCfg) -> Step<Self> {
        match self {
            Self::Done => Step::Complete,
            _ if inputs.cancelled => Step::Advance(Self::Done),
            Self::Idle => Step::Advance(Self::Loading),
            Self::Loading => {
                if inputs.piece_present == Some(true) {
                    Step::Advance(Self::Loaded)
                } else if cfg.load_timeout.is_some_and(|t| inputs.in_phase >= t) {
                    Step::Advance(Self::Done)
                } else {
                    Step::Continue
                }
            }
            Self::Loaded if cfg.wait_for_unload => Step::Advance(Self::WaitingForUnload),
            Self::Loaded => Step::Advance(Self::Done),
            Self::WaitingForUnload => {
                if inputs.piece_present == Some(false) {
                    Step::Advance(Self::Done)
                } else {
                    Step::Continue
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeOutcome {
    Loaded,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntakeReport {
    pub outcome: Option<IntakeOutcome>,
    /// Time from starting the roller to the sensor tripping.
    pub load_time: Option<Duration>,
    /// The piece left again while waiting for unload.
    pub unloaded: bool,
    pub cancelled: bool,
}

#[derive(Debug)]
pub struct IntakeSequencer {
    cfg: IntakeCfg,
    phase: IntakePhase,
    entered_at: Option<Instant>,
    cancel_requested: bool,
    report: IntakeReport,
}

impl IntakeSequencer {
    pub fn new(cfg: IntakeCfg) -> Self {
        Self {
            cfg,
            phase: IntakePhase::Idle,
            entered_at: None,
            cancel_requested: false,
            report: IntakeReport::default(),
        }
    }

    pub fn phase(&self) -> IntakePhase {
        self.phase
    }

    pub fn report(&self) -> &IntakeReport {
        &self.report
    }

    fn gather(&self, robot: &mut Robot, now: Instant) -> IntakeInputs {
        let in_phase = self
            .entered_at
            .map_or(Duration::ZERO, |t| now.saturating_duration_since(t));
        let mut inputs = IntakeInputs {
            cancelled: self.cancel_requested,
            in_phase,
            piece_present: None,
        };
        if !inputs.cancelled
            && matches!(self.phase, IntakePhase::Loading | IntakePhase::WaitingForUnload)
        {
            inputs.piece_present = robot.piece_present();
        }
        inputs
    }

    fn enter(&mut self, next: IntakePhase, robot: &mut Robot, now: Instant, inputs: &IntakeInputs) {
        tracing::debug!(from = ?self.phase, to = ?next, "intake phase");
        match next {
            IntakePhase::Idle => {}
            IntakePhase::Loading => {
                tracing::info!(output = self.cfg.output, "intake started");
                robot.intake.run(self.cfg.output);
                robot.indicator.show_intake_running();
            }
            IntakePhase::Loaded => {
                robot.intake.stop();
                robot.indicator.show_intake_loaded();
                self.report.outcome = Some(IntakeOutcome::Loaded);
                self.report.load_time = Some(inputs.in_phase);
                tracing::info!(
                    load_ms = crate::util::as_millis_u64(inputs.in_phase),
                    "piece loaded"
                );
            }
            IntakePhase::WaitingForUnload => {}
            IntakePhase::Done => {
                if inputs.cancelled {
                    self.report.cancelled = true;
                }
                match self.phase {
                    IntakePhase::Idle | IntakePhase::Loading => {
                        robot.intake.stop();
                        if inputs.cancelled {
                            self.report.outcome = Some(IntakeOutcome::Cancelled);
                            tracing::info!("intake cancelled");
                        } else {
                            self.report.outcome = Some(IntakeOutcome::TimedOut);
                            tracing::warn!(
                                waited_ms = crate::util::as_millis_u64(inputs.in_phase),
                                "intake gave up waiting for a piece"
                            );
                        }
                    }
                    IntakePhase::WaitingForUnload if !inputs.cancelled => {
                        self.report.unloaded = true;
                    }
                    _ => {}
                }
                tracing::info!(outcome = ?self.report.outcome, "intake complete");
            }
        }
        self.phase = next;
        self.entered_at = Some(now);
    }

    fn complete(&self) -> SequenceStatus {
        SequenceStatus::Complete(Outcome::Intake(self.report.clone()))
    }
}

impl Command for IntakeSequencer {
    fn name(&self) -> &'static str {
        "intake"
    }

    fn requirements(&self) -> Requirements {
        Requirements::INTAKE
    }

    /// At most one phase change per tick, so the sensor is first polled on
    /// the tick after the roller starts.
    fn step(&mut self, robot: &mut Robot) -> SequenceStatus {
        let now = robot.clock.now();
        let inputs = self.gather(robot, now);
        match self.phase.transition(&inputs, &self.cfg) {
            Step::Continue => SequenceStatus::Running,
            Step::Complete => self.complete(),
            Step::Advance(next) => {
                self.enter(next, robot, now, &inputs);
                if next == IntakePhase::Done {
                    self.complete()
                } else {
                    SequenceStatus::Running
                }
            }
        }
    }

    fn cancel(&mut self) {
        if self.phase != IntakePhase::Done {
            self.cancel_requested = true;
        }
    }

    fn is_finished(&self) -> bool {
        self.phase == IntakePhase::Done
    }

    fn outcome(&self) -> Option<Outcome> {
        self.is_finished()
            .then(|| Outcome::Intake(self.report.clone()))
    }
}
