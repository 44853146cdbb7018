//! Runtime configuration for the sequencers and scheduler.
//!
//! These are the types the core works with. They are separate from the
//! TOML-deserialized config in `shooter_config`; see `conversions`.

use std::time::Duration;

/// How the feed phase decides it is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedExit {
    /// Run the kicker for the full `feed_run`.
    #[default]
    Timed,
    /// Stop early once the piece sensor reads clear, but not before `guard`.
    /// `feed_run` still bounds the phase.
    PieceCleared { guard: Duration },
}

/// Shot sequence timing and feed settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotCfg {
    /// Give up waiting for speed and angle after this long and fire anyway.
    pub stabilize_timeout: Duration,
    /// How long the kicker runs.
    pub feed_run: Duration,
    /// Kicker open-loop output, `(0.0, 1.0]`.
    pub kicker_output: f64,
    pub feed_exit: FeedExit,
}

impl Default for ShotCfg {
    fn default() -> Self {
        Self {
            stabilize_timeout: Duration::from_secs(3),
            feed_run: Duration::from_secs(2),
            kicker_output: 0.25,
            feed_exit: FeedExit::Timed,
        }
    }
}

/// Where a shot gets its range from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RangeBinding {
    /// Read the range feed when the shot sets its targets.
    #[default]
    Live,
    /// Use a range captured when the shot was triggered.
    Fixed(f64),
}

/// How the CLI/config asks for a binding; resolved into a `RangeBinding`
/// by `Robot::bind_range`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindingMode {
    #[default]
    Live,
    Snapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntakeCfg {
    /// Intake roller open-loop output, `(0.0, 1.0]`.
    pub output: f64,
    /// Give up waiting for a piece after this long. `None` waits forever.
    pub load_timeout: Option<Duration>,
    /// After loading, wait until the piece leaves before finishing.
    pub wait_for_unload: bool,
}

impl Default for IntakeCfg {
    fn default() -> Self {
        Self {
            output: 0.25,
            load_timeout: None,
            wait_for_unload: false,
        }
    }
}

/// At-target bands for the two closed-loop actuators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceCfg {
    pub speed_rpm: f64,
    pub angle_deg: f64,
}

impl Default for ToleranceCfg {
    fn default() -> Self {
        Self {
            speed_rpm: 25.0,
            angle_deg: 2.0,
        }
    }
}

/// What to do when a new sequence needs an actuator that is already owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    #[default]
    Reject,
    /// Cancel the owner, run its shutdown, then admit the newcomer.
    Preempt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerCfg {
    pub tick: Duration,
    pub conflict: ConflictPolicy,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(20),
            conflict: ConflictPolicy::Reject,
        }
    }
}

/// Advisory shooting window. Shots outside it are logged, not refused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeLimits {
    pub min_m: f64,
    pub max_m: f64,
}

impl Default for RangeLimits {
    fn default() -> Self {
        Self {
            min_m: 1.0,
            max_m: 14.5,
        }
    }
}

impl RangeLimits {
    pub fn contains(&self, range_m: f64) -> bool {
        (self.min_m..=self.max_m).contains(&range_m)
    }
}

/// Background range sampling. `hz == 0` reads the range feed inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingCfg {
    pub hz: u32,
    /// A reading older than this counts as unavailable.
    pub stale: Duration,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self {
            hz: 0,
            stale: Duration::from_millis(200),
        }
    }
}
