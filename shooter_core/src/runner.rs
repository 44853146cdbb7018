//! Drives a scheduler tick by tick until every command has finished.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::{Report, Result as CoreResult, ShooterError};
use crate::scheduler::{Completed, Scheduler};

/// Ticks allowed for cancelled commands to finish their shutdown.
const DRAIN_TICK_LIMIT: u64 = 16;

/// When `run_until_idle` gives up.
#[derive(Debug, Clone)]
pub struct RunLimits {
    /// Hard cap on ticks for one run.
    pub max_ticks: u64,
    /// Set from another thread (e.g. a Ctrl-C handler) to cancel everything.
    pub shutdown: Option<Arc<AtomicBool>>,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            // 20 minutes at the default 20 ms tick
            max_ticks: 60_000,
            shutdown: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub elapsed: Duration,
    pub completed: Vec<Completed>,
}

/// Tick the scheduler until no command is active.
///
/// Each tick is paced to the scheduler's period on the robot clock. A
/// shutdown request or the tick cap cancels every active command, lets the
/// shutdowns run, and returns an error.
pub fn run_until_idle(sched: &mut Scheduler, limits: &RunLimits) -> CoreResult<RunSummary> {
    let clock = sched.robot().clock().clone();
    let period = sched.tick_period();
    let start = clock.now();
    let start_ticks = sched.ticks();
    tracing::debug!(period_ms = crate::util::as_millis_u64(period), active = ?sched.active_names(), "run start");

    loop {
        if limits
            .shutdown
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
        {
            tracing::warn!(active = ?sched.active_names(), "shutdown requested; cancelling");
            drain(sched, period);
            return Err(Report::new(ShooterError::Interrupted));
        }

        let tick_start = clock.now();
        sched.run_tick();
        if sched.is_idle() {
            break;
        }

        let ran = sched.ticks() - start_ticks;
        if ran >= limits.max_ticks {
            tracing::error!(ticks = ran, active = ?sched.active_names(), "tick limit reached");
            drain(sched, period);
            return Err(Report::new(ShooterError::State(format!(
                "run did not finish within {ran} ticks"
            ))));
        }

        let spent = clock.now().saturating_duration_since(tick_start);
        clock.sleep(period.saturating_sub(spent));
    }

    let summary = RunSummary {
        ticks: sched.ticks() - start_ticks,
        elapsed: clock.now().saturating_duration_since(start),
        completed: sched.drain_completed(),
    };
    tracing::info!(
        ticks = summary.ticks,
        elapsed_ms = crate::util::as_millis_u64(summary.elapsed),
        completed = summary.completed.len(),
        "run complete"
    );
    Ok(summary)
}

fn drain(sched: &mut Scheduler, period: Duration) {
    sched.cancel_all();
    let clock = sched.robot().clock().clone();
    for _ in 0..DRAIN_TICK_LIMIT {
        sched.run_tick();
        if sched.is_idle() {
            return;
        }
        clock.sleep(period);
    }
    tracing::warn!(active = ?sched.active_names(), "commands still active after drain");
}
