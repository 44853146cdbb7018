//! Cooperative tick scheduler with exclusive actuator ownership.
//!
//! Every active command is stepped once per `run_tick`, in the order it was
//! scheduled. Ownership is checked once, when a command is scheduled; a
//! command keeps its actuators until it reports `Complete`.

use std::time::Duration;

use crate::config::{ConflictPolicy, RangeBinding, SchedulerCfg};
use crate::error::ScheduleError;
use crate::robot::Robot;
use crate::sequence::{Command, Requirements};
use crate::status::{Outcome, SequenceStatus};

/// Steps a preempted command gets to reach its terminal phase.
const SHUTDOWN_STEP_LIMIT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl CommandId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for CommandId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A command that has left the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct Completed {
    pub id: CommandId,
    pub name: &'static str,
    pub outcome: Outcome,
}

struct Active {
    id: CommandId,
    requirements: Requirements,
    command: Box<dyn Command>,
}

pub struct Scheduler {
    robot: Robot,
    cfg: SchedulerCfg,
    active: Vec<Active>,
    completed: Vec<Completed>,
    next_id: u64,
    ticks: u64,
}

impl core::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scheduler")
            .field("cfg", &self.cfg)
            .field("active", &self.active_names())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(robot: Robot, cfg: SchedulerCfg) -> Self {
        Self {
            robot,
            cfg,
            active: Vec::new(),
            completed: Vec::new(),
            next_id: 1,
            ticks: 0,
        }
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn robot_mut(&mut self) -> &mut Robot {
        &mut self.robot
    }

    pub fn into_robot(self) -> Robot {
        self.robot
    }

    pub fn tick_period(&self) -> Duration {
        self.cfg.tick
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_active(&self, id: CommandId) -> bool {
        self.active.iter().any(|a| a.id == id)
    }

    pub fn active_names(&self) -> Vec<&'static str> {
        self.active.iter().map(|a| a.command.name()).collect()
    }

    /// Union of the actuators currently owned.
    pub fn in_use(&self) -> Requirements {
        self.active
            .iter()
            .fold(Requirements::empty(), |acc, a| acc | a.requirements)
    }

    /// Admit a command, claiming its actuators.
    ///
    /// On a conflict, `Reject` refuses the newcomer and leaves the owner
    /// running; `Preempt` cancels every conflicting owner, runs its shutdown
    /// now, then admits the newcomer.
    pub fn schedule(&mut self, command: Box<dyn Command>) -> Result<CommandId, ScheduleError> {
        let wanted = command.requirements();
        let name = command.name();
        let conflicting: Vec<usize> = self
            .active
            .iter()
            .enumerate()
            .filter(|(_, a)| a.requirements.intersects(wanted))
            .map(|(i, _)| i)
            .collect();

        if let Some(&first) = conflicting.first() {
            match self.cfg.conflict {
                ConflictPolicy::Reject => {
                    let owner = &self.active[first];
                    tracing::warn!(
                        command = name,
                        owner = owner.command.name(),
                        owner_id = owner.id.get(),
                        "schedule rejected: resource conflict"
                    );
                    return Err(ScheduleError::ResourceConflict {
                        command: name,
                        owner: owner.command.name(),
                        wanted,
                        held: owner.requirements,
                    });
                }
                ConflictPolicy::Preempt => {
                    for idx in conflicting.into_iter().rev() {
                        let owner = self.active.remove(idx);
                        tracing::info!(
                            command = name,
                            owner = owner.command.name(),
                            owner_id = owner.id.get(),
                            "preempting owner"
                        );
                        self.finish_now(owner);
                    }
                }
            }
        }

        let id = CommandId(self.next_id);
        self.next_id += 1;
        tracing::info!(command = name, id = id.get(), requirements = ?wanted, "scheduled");
        self.active.push(Active {
            id,
            requirements: wanted,
            command,
        });
        Ok(id)
    }

    pub fn schedule_shot(&mut self, binding: RangeBinding) -> Result<CommandId, ScheduleError> {
        let shot = self.robot.shot_sequence(binding);
        self.schedule(Box::new(shot))
    }

    pub fn schedule_intake(&mut self) -> Result<CommandId, ScheduleError> {
        let intake = self.robot.intake_sequence();
        self.schedule(Box::new(intake))
    }

    /// Request cancellation; the command runs its shutdown on the next tick.
    pub fn cancel(&mut self, id: CommandId) -> Result<(), ScheduleError> {
        let active = self
            .active
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ScheduleError::UnknownCommand(id.get()))?;
        tracing::debug!(command = active.command.name(), id = id.get(), "cancel requested");
        active.command.cancel();
        Ok(())
    }

    pub fn cancel_all(&mut self) {
        for a in &mut self.active {
            a.command.cancel();
        }
    }

    /// Step every active command once. Returns how many remain active.
    pub fn run_tick(&mut self) -> usize {
        self.ticks += 1;
        let was_busy = !self.active.is_empty();
        let mut i = 0;
        while i < self.active.len() {
            match self.active[i].command.step(&mut self.robot) {
                SequenceStatus::Running => i += 1,
                SequenceStatus::Complete(outcome) => {
                    let done = self.active.remove(i);
                    tracing::debug!(command = done.command.name(), id = done.id.get(), "command finished");
                    self.completed.push(Completed {
                        id: done.id,
                        name: done.command.name(),
                        outcome,
                    });
                }
            }
        }
        if was_busy && self.active.is_empty() {
            tracing::debug!(tick = self.ticks, "scheduler idle");
            self.robot.indicator.show_idle();
        }
        self.active.len()
    }

    /// Finished commands since the last call, oldest first.
    pub fn drain_completed(&mut self) -> Vec<Completed> {
        std::mem::take(&mut self.completed)
    }

    fn finish_now(&mut self, mut owner: Active) {
        owner.command.cancel();
        for _ in 0..SHUTDOWN_STEP_LIMIT {
            if let SequenceStatus::Complete(outcome) = owner.command.step(&mut self.robot) {
                self.completed.push(Completed {
                    id: owner.id,
                    name: owner.command.name(),
                    outcome,
                });
                return;
            }
        }
        tracing::warn!(
            command = owner.command.name(),
            id = owner.id.get(),
            "preempted command did not finish its shutdown"
        );
    }
}
