//! The resumable-step model shared by every sequence.

use bitflags::bitflags;

use crate::robot::Robot;
use crate::status::{Outcome, SequenceStatus};

bitflags! {
    /// Actuators a sequence needs exclusive use of while active.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Requirements: u8 {
        const FLYWHEEL = 1;
        const FEED = 1 << 1;
        const ANGLE = 1 << 2;
        const INTAKE = 1 << 3;
        /// Everything the shot protocol drives.
        const SHOOTER = Self::FLYWHEEL.bits() | Self::FEED.bits() | Self::ANGLE.bits();
    }
}

/// Result of a pure phase-transition rule for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<P> {
    /// Stay in the current phase.
    Continue,
    /// Enter the given phase now.
    Advance(P),
    /// Already terminal.
    Complete,
}

/// A cooperatively scheduled sequence.
///
/// `step` must never block; anything that waits does so by returning
/// `Running` and being stepped again next tick.
pub trait Command {
    fn name(&self) -> &'static str;
    fn requirements(&self) -> Requirements;
    fn step(&mut self, robot: &mut Robot) -> SequenceStatus;
    /// Ask the sequence to run its shutdown path on the next step.
    fn cancel(&mut self);
    fn is_finished(&self) -> bool;
    /// Report for a finished sequence.
    fn outcome(&self) -> Option<Outcome>;
}
