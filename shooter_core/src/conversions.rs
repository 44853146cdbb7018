//! `From` implementations bridging `shooter_config` types to `shooter_core` types.

use std::time::Duration;

use crate::calibration::TableCalibration;
use crate::config::{
    BindingMode, ConflictPolicy, FeedExit, IntakeCfg, RangeLimits, SamplingCfg, SchedulerCfg,
    ShotCfg, ToleranceCfg,
};
use crate::util::nonzero_ms;

// ── ShotCfg ──────────────────────────────────────────────────────────────────

impl From<&shooter_config::ShooterCfg> for ShotCfg {
    fn from(c: &shooter_config::ShooterCfg) -> Self {
        Self {
            stabilize_timeout: Duration::from_millis(c.stabilize_timeout_ms),
            feed_run: Duration::from_millis(c.feed_run_ms),
            kicker_output: c.kicker_output,
            feed_exit: match c.feed_exit {
                shooter_config::FeedExitMode::Timed => FeedExit::Timed,
                shooter_config::FeedExitMode::PieceCleared => FeedExit::PieceCleared {
                    guard: Duration::from_millis(c.feed_guard_ms),
                },
            },
        }
    }
}

// ── IntakeCfg ────────────────────────────────────────────────────────────────

impl From<&shooter_config::IntakeCfg> for IntakeCfg {
    fn from(c: &shooter_config::IntakeCfg) -> Self {
        Self {
            output: c.output,
            load_timeout: nonzero_ms(c.load_timeout_ms),
            wait_for_unload: c.wait_for_unload,
        }
    }
}

// ── Tolerances ───────────────────────────────────────────────────────────────

impl From<&shooter_config::Config> for ToleranceCfg {
    fn from(c: &shooter_config::Config) -> Self {
        Self {
            speed_rpm: c.shooter.speed_tolerance_rpm,
            angle_deg: c.angle.tolerance_deg,
        }
    }
}

// ── SchedulerCfg ─────────────────────────────────────────────────────────────

impl From<&shooter_config::SchedulerCfg> for SchedulerCfg {
    fn from(c: &shooter_config::SchedulerCfg) -> Self {
        Self {
            tick: Duration::from_millis(c.tick_ms),
            conflict: match c.conflict {
                shooter_config::ConflictMode::Reject => ConflictPolicy::Reject,
                shooter_config::ConflictMode::Preempt => ConflictPolicy::Preempt,
            },
        }
    }
}

// ── Range ────────────────────────────────────────────────────────────────────

impl From<&shooter_config::RangeCfg> for RangeLimits {
    fn from(c: &shooter_config::RangeCfg) -> Self {
        Self {
            min_m: c.min_m,
            max_m: c.max_m,
        }
    }
}

impl From<&shooter_config::RangeCfg> for SamplingCfg {
    fn from(c: &shooter_config::RangeCfg) -> Self {
        Self {
            hz: c.sample_hz,
            stale: Duration::from_millis(c.stale_ms),
        }
    }
}

impl From<&shooter_config::RangeCfg> for BindingMode {
    fn from(c: &shooter_config::RangeCfg) -> Self {
        match c.binding {
            shooter_config::RangeBindingMode::Live => BindingMode::Live,
            shooter_config::RangeBindingMode::Fixed => BindingMode::Snapshot,
        }
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl From<&shooter_config::Tables> for TableCalibration {
    fn from(t: &shooter_config::Tables) -> Self {
        let pairs = |rows: &[shooter_config::TableRow]| -> Vec<(f64, f64)> {
            rows.iter().map(|r| (r.range_m, r.value)).collect()
        };
        Self {
            speed: pairs(&t.speed),
            angle: pairs(&t.angle),
        }
    }
}
