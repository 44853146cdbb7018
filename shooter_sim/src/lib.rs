//! Simulated collaborators for running the shooter without a robot.
//!
//! A `SimBench` ties the pieces that physically interact together: the
//! piece sensor trips some time after the intake roller starts and clears
//! some time after the kicker starts. Everything reads time from the
//! injected `Clock`, so a `ManualClock` gives fully repeatable runs.

pub mod error;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use shooter_traits::{AngleDrive, BinarySensor, BoxError, Clock, Indicator, Motor, RangeSensor};

pub use error::SimError;

/// Free speed reported by an open-loop roller at full output.
pub const ROLLER_FREE_RPM: f64 = 5000.0;

/// Timing knobs for a bench.
#[derive(Debug, Clone)]
pub struct BenchCfg {
    pub flywheel_time_constant: Duration,
    pub flywheel_stuck: bool,
    pub angle_error_deg: f64,
    pub load_after: Duration,
    pub clear_after_feed: Duration,
    /// Piece already in the robot when the bench starts.
    pub piece_loaded: bool,
}

impl Default for BenchCfg {
    fn default() -> Self {
        Self {
            flywheel_time_constant: Duration::from_millis(400),
            flywheel_stuck: false,
            angle_error_deg: 0.1,
            load_after: Duration::from_millis(500),
            clear_after_feed: Duration::from_millis(150),
            piece_loaded: false,
        }
    }
}

struct BenchState {
    clock: Arc<dyn Clock + Send + Sync>,
    intake_since: Cell<Option<Instant>>,
    feed_since: Cell<Option<Instant>>,
    piece: Cell<bool>,
    load_after: Duration,
    clear_after_feed: Duration,
}

impl BenchState {
    fn update_piece(&self) -> bool {
        let now = self.clock.now();
        let elapsed = |since: &Cell<Option<Instant>>| {
            since.get().map(|t| now.saturating_duration_since(t))
        };
        if !self.piece.get() && elapsed(&self.intake_since).is_some_and(|d| d >= self.load_after) {
            tracing::debug!("sim: piece arrived at sensor");
            self.piece.set(true);
        }
        if self.piece.get() && elapsed(&self.feed_since).is_some_and(|d| d >= self.clear_after_feed) {
            tracing::debug!("sim: piece left the robot");
            self.piece.set(false);
        }
        self.piece.get()
    }
}

/// Factory for simulated collaborators that share one physical state.
pub struct SimBench {
    cfg: BenchCfg,
    state: Rc<BenchState>,
}

impl SimBench {
    pub fn new(cfg: BenchCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let state = Rc::new(BenchState {
            clock,
            intake_since: Cell::new(None),
            feed_since: Cell::new(None),
            piece: Cell::new(cfg.piece_loaded),
            load_after: cfg.load_after,
            clear_after_feed: cfg.clear_after_feed,
        });
        Self { cfg, state }
    }

    pub fn flywheel(&self) -> SimFlywheel {
        SimFlywheel::new(
            self.state.clock.clone(),
            self.cfg.flywheel_time_constant,
            self.cfg.flywheel_stuck,
        )
    }

    pub fn angle(&self) -> SimAngle {
        SimAngle::new(self.cfg.angle_error_deg)
    }

    pub fn feed(&self) -> SimRoller {
        SimRoller::new(RollerRole::Feed, self.state.clone())
    }

    pub fn intake(&self) -> SimRoller {
        SimRoller::new(RollerRole::Intake, self.state.clone())
    }

    pub fn piece_sensor(&self) -> SimPieceSensor {
        SimPieceSensor {
            state: self.state.clone(),
        }
    }

    pub fn piece_loaded(&self) -> bool {
        self.state.update_piece()
    }

    /// Put a piece in (or take it out of) the robot by hand.
    pub fn set_piece_loaded(&self, loaded: bool) {
        self.state.piece.set(loaded);
    }
}

/// Velocity-controlled flywheel with a first-order response.
pub struct SimFlywheel {
    clock: Arc<dyn Clock + Send + Sync>,
    tau: Duration,
    stuck: bool,
    target: f64,
    velocity: f64,
    last: Instant,
}

impl SimFlywheel {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>, tau: Duration, stuck: bool) -> Self {
        let last = clock.now();
        Self {
            clock,
            tau,
            stuck,
            target: 0.0,
            velocity: 0.0,
            last,
        }
    }

    fn advance(&mut self) {
        let now = self.clock.now();
        let dt = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        if self.stuck {
            return;
        }
        let tau = self.tau.as_secs_f64().max(1e-3);
        let alpha = 1.0 - (-dt / tau).exp();
        self.velocity += (self.target - self.velocity) * alpha;
    }
}

impl Motor for SimFlywheel {
    fn set_velocity_setpoint(&mut self, rpm: f64) -> Result<(), BoxError> {
        self.advance();
        tracing::debug!(rpm, "sim flywheel setpoint");
        self.target = rpm;
        Ok(())
    }
    fn set_output(&mut self, percent: f64) -> Result<(), BoxError> {
        self.set_velocity_setpoint(percent * ROLLER_FREE_RPM)
    }
    fn stop(&mut self) -> Result<(), BoxError> {
        self.advance();
        self.target = 0.0;
        Ok(())
    }
    fn current_velocity(&mut self) -> Result<f64, BoxError> {
        self.advance();
        Ok(self.velocity)
    }
}

/// Angle mechanism that settles instantly with a constant error.
pub struct SimAngle {
    error_deg: f64,
    position: f64,
}

impl SimAngle {
    pub fn new(error_deg: f64) -> Self {
        Self {
            error_deg,
            position: 0.0,
        }
    }
}

impl AngleDrive for SimAngle {
    fn set_angle_setpoint(&mut self, degrees: f64) -> Result<(), BoxError> {
        tracing::debug!(degrees, "sim angle setpoint");
        self.position = degrees + self.error_deg;
        Ok(())
    }
    fn stop(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
    fn current_angle(&mut self) -> Result<f64, BoxError> {
        Ok(self.position)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollerRole {
    Intake,
    Feed,
}

/// Open-loop roller (intake or kicker).
pub struct SimRoller {
    role: RollerRole,
    state: Rc<BenchState>,
    output: f64,
}

impl SimRoller {
    fn new(role: RollerRole, state: Rc<BenchState>) -> Self {
        Self {
            role,
            state,
            output: 0.0,
        }
    }

    fn since(&self) -> &Cell<Option<Instant>> {
        match self.role {
            RollerRole::Intake => &self.state.intake_since,
            RollerRole::Feed => &self.state.feed_since,
        }
    }

    pub fn output(&self) -> f64 {
        self.output
    }
}

impl Motor for SimRoller {
    fn set_velocity_setpoint(&mut self, rpm: f64) -> Result<(), BoxError> {
        self.set_output(rpm / ROLLER_FREE_RPM)
    }
    fn set_output(&mut self, percent: f64) -> Result<(), BoxError> {
        tracing::debug!(role = ?self.role, percent, "sim roller output");
        // Settle the piece under the old output before the timer changes, so
        // a run that lasted long enough counts even if nobody read the sensor.
        self.state.update_piece();
        self.output = percent;
        if percent == 0.0 {
            self.since().set(None);
        } else if self.since().get().is_none() {
            self.since().set(Some(self.state.clock.now()));
        }
        Ok(())
    }
    fn stop(&mut self) -> Result<(), BoxError> {
        self.set_output(0.0)
    }
    fn current_velocity(&mut self) -> Result<f64, BoxError> {
        Ok(self.output * ROLLER_FREE_RPM)
    }
}

pub struct SimPieceSensor {
    state: Rc<BenchState>,
}

impl BinarySensor for SimPieceSensor {
    fn is_tripped(&mut self) -> Result<bool, BoxError> {
        Ok(self.state.update_piece())
    }
}

/// Range feed replaying a script of readings.
///
/// Each read consumes one entry; the last entry repeats forever.
#[derive(Debug, Clone)]
pub struct SimVision {
    script: Vec<VisionReading>,
    pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisionReading {
    Range(f64),
    Timeout,
    Disconnected,
}

impl SimVision {
    pub fn fixed(range_m: f64) -> Self {
        Self::script(vec![VisionReading::Range(range_m)])
    }

    /// Never produces a reading.
    pub fn disconnected() -> Self {
        Self::script(vec![VisionReading::Disconnected])
    }

    /// Times out `n` times, then reports `range_m`.
    pub fn flaky(n: usize, range_m: f64) -> Self {
        let mut script = vec![VisionReading::Timeout; n];
        script.push(VisionReading::Range(range_m));
        Self::script(script)
    }

    pub fn script(script: Vec<VisionReading>) -> Self {
        Self { script, pos: 0 }
    }
}

impl RangeSensor for SimVision {
    fn current_range_m(&mut self) -> Result<f64, BoxError> {
        let Some(last) = self.script.len().checked_sub(1) else {
            return Err(Box::new(SimError::Disconnected("vision")));
        };
        let reading = self.script[self.pos.min(last)];
        self.pos = self.pos.saturating_add(1);
        match reading {
            VisionReading::Range(r) => Ok(r),
            VisionReading::Timeout => Err(Box::new(SimError::Timeout)),
            VisionReading::Disconnected => Err(Box::new(SimError::Disconnected("vision"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Idle,
    PreShoot,
    ShotFired,
    PostShootCleanup,
    IntakeRunning,
    IntakeLoaded,
}

/// LED strip stand-in that logs each pattern and remembers the history.
#[derive(Clone, Default)]
pub struct SimIndicator {
    history: Rc<RefCell<Vec<Pattern>>>,
}

impl SimIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pattern shown so far, oldest first.
    pub fn history(&self) -> Vec<Pattern> {
        self.history.borrow().clone()
    }

    pub fn current(&self) -> Option<Pattern> {
        self.history.borrow().last().copied()
    }

    fn show(&mut self, p: Pattern) {
        tracing::info!(pattern = ?p, "indicator");
        self.history.borrow_mut().push(p);
    }
}

impl Indicator for SimIndicator {
    fn show_idle(&mut self) {
        self.show(Pattern::Idle);
    }
    fn show_pre_shoot(&mut self) {
        self.show(Pattern::PreShoot);
    }
    fn show_shot_fired(&mut self) {
        self.show(Pattern::ShotFired);
    }
    fn show_post_shoot_cleanup(&mut self) {
        self.show(Pattern::PostShootCleanup);
    }
    fn show_intake_running(&mut self) {
        self.show(Pattern::IntakeRunning);
    }
    fn show_intake_loaded(&mut self) {
        self.show(Pattern::IntakeLoaded);
    }
}
