//! Status returned from each step of a sequence.

use crate::intake::IntakeReport;
use crate::shot::ShotReport;

/// Public status of a single step of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceStatus {
    /// Keep stepping.
    Running,
    /// Terminal phase reached; all owned actuators have been released.
    Complete(Outcome),
}

/// What a finished sequence did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Shot(ShotReport),
    Intake(IntakeReport),
}

impl Outcome {
    pub fn was_cancelled(&self) -> bool {
        match self {
            Outcome::Shot(r) => r.cancelled,
            Outcome::Intake(r) => r.cancelled,
        }
    }
}
