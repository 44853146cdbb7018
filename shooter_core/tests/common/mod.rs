#![allow(dead_code)]
//! Scriptable fakes shared by the integration tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shooter_core::builder::Set;
use shooter_core::{Robot, RobotBuilder, Scheduler, SchedulerCfg};
use shooter_traits::{
    AngleDrive, BinarySensor, BoxError, Clock, Indicator, ManualClock, Motor, RangeSensor,
};

pub const TICK: Duration = Duration::from_millis(20);

pub fn speed_points() -> Vec<(f64, f64)> {
    vec![(5.0, 1000.0), (7.5, 1500.0), (9.5, 2000.0), (14.5, 2500.0)]
}

pub fn angle_points() -> Vec<(f64, f64)> {
    vec![
        (5.0, 45.0),
        (7.5, 40.0),
        (8.5, 35.0),
        (9.5, 31.0),
        (10.5, 28.0),
        (14.5, 25.0),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Call {
    Setpoint(f64),
    Output(f64),
    Stop,
}

/// What a fake actuator reports when measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Report the last setpoint exactly.
    Follow,
    Fixed(f64),
    Fail,
}

#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<Vec<(&'static str, Call)>>>);

impl Log {
    pub fn push(&self, who: &'static str, call: Call) {
        self.0.borrow_mut().push((who, call));
    }
    pub fn calls(&self, who: &str) -> Vec<Call> {
        self.0
            .borrow()
            .iter()
            .filter(|(w, _)| *w == who)
            .map(|(_, c)| *c)
            .collect()
    }
    pub fn stops(&self, who: &str) -> usize {
        self.calls(who).iter().filter(|c| **c == Call::Stop).count()
    }
    pub fn last(&self, who: &str) -> Option<Call> {
        self.calls(who).last().copied()
    }
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

pub struct FakeMotor {
    name: &'static str,
    log: Log,
    reading: Rc<Cell<Reading>>,
    setpoint: f64,
}

impl Motor for FakeMotor {
    fn set_velocity_setpoint(&mut self, rpm: f64) -> Result<(), BoxError> {
        self.setpoint = rpm;
        self.log.push(self.name, Call::Setpoint(rpm));
        Ok(())
    }
    fn set_output(&mut self, percent: f64) -> Result<(), BoxError> {
        self.log.push(self.name, Call::Output(percent));
        Ok(())
    }
    fn stop(&mut self) -> Result<(), BoxError> {
        self.setpoint = 0.0;
        self.log.push(self.name, Call::Stop);
        Ok(())
    }
    fn current_velocity(&mut self) -> Result<f64, BoxError> {
        match self.reading.get() {
            Reading::Follow => Ok(self.setpoint),
            Reading::Fixed(v) => Ok(v),
            Reading::Fail => Err(Box::new(std::io::Error::other("encoder offline"))),
        }
    }
}

pub struct FakeAngle {
    log: Log,
    reading: Rc<Cell<Reading>>,
    setpoint: f64,
}

impl AngleDrive for FakeAngle {
    fn set_angle_setpoint(&mut self, degrees: f64) -> Result<(), BoxError> {
        self.setpoint = degrees;
        self.log.push("angle", Call::Setpoint(degrees));
        Ok(())
    }
    fn stop(&mut self) -> Result<(), BoxError> {
        self.log.push("angle", Call::Stop);
        Ok(())
    }
    fn current_angle(&mut self) -> Result<f64, BoxError> {
        match self.reading.get() {
            Reading::Follow => Ok(self.setpoint),
            Reading::Fixed(v) => Ok(v),
            Reading::Fail => Err(Box::new(std::io::Error::other("pot offline"))),
        }
    }
}

/// `None` makes the read fail.
pub struct FakeSensor(Rc<Cell<Option<bool>>>);

impl BinarySensor for FakeSensor {
    fn is_tripped(&mut self) -> Result<bool, BoxError> {
        self.0
            .get()
            .ok_or_else(|| Box::new(std::io::Error::other("beam break offline")) as BoxError)
    }
}

/// `None` makes the read fail.
pub struct FakeRange {
    value: Arc<Mutex<Option<f64>>>,
    reads: Arc<AtomicUsize>,
}

impl RangeSensor for FakeRange {
    fn current_range_m(&mut self) -> Result<f64, BoxError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let v = *self.value.lock().unwrap();
        v.ok_or_else(|| Box::new(std::io::Error::other("no target")) as BoxError)
    }
}

pub struct FakeIndicator(Rc<RefCell<Vec<&'static str>>>);

impl Indicator for FakeIndicator {
    fn show_idle(&mut self) {
        self.0.borrow_mut().push("idle");
    }
    fn show_pre_shoot(&mut self) {
        self.0.borrow_mut().push("pre_shoot");
    }
    fn show_shot_fired(&mut self) {
        self.0.borrow_mut().push("shot_fired");
    }
    fn show_post_shoot_cleanup(&mut self) {
        self.0.borrow_mut().push("post_shoot_cleanup");
    }
    fn show_intake_running(&mut self) {
        self.0.borrow_mut().push("intake_running");
    }
    fn show_intake_loaded(&mut self) {
        self.0.borrow_mut().push("intake_loaded");
    }
}

/// Handles onto every fake, plus a virtual clock.
pub struct Rig {
    pub clock: ManualClock,
    pub log: Log,
    pub flywheel: Rc<Cell<Reading>>,
    pub angle: Rc<Cell<Reading>>,
    pub piece: Rc<Cell<Option<bool>>>,
    pub range: Arc<Mutex<Option<f64>>>,
    pub range_reads: Arc<AtomicUsize>,
    pub lights: Rc<RefCell<Vec<&'static str>>>,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            clock: ManualClock::new(),
            log: Log::default(),
            flywheel: Rc::new(Cell::new(Reading::Follow)),
            angle: Rc::new(Cell::new(Reading::Follow)),
            piece: Rc::new(Cell::new(Some(false))),
            range: Arc::new(Mutex::new(Some(10.0))),
            range_reads: Arc::new(AtomicUsize::new(0)),
            lights: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn set_range(&self, r: Option<f64>) {
        *self.range.lock().unwrap() = r;
    }

    pub fn builder(&self) -> RobotBuilder<Set, Set, Set> {
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(self.clock.clone());
        Robot::builder()
            .with_shooter(
                FakeMotor {
                    name: "flywheel",
                    log: self.log.clone(),
                    reading: self.flywheel.clone(),
                    setpoint: 0.0,
                },
                FakeAngle {
                    log: self.log.clone(),
                    reading: self.angle.clone(),
                    setpoint: 0.0,
                },
                FakeMotor {
                    name: "feed",
                    log: self.log.clone(),
                    reading: Rc::new(Cell::new(Reading::Follow)),
                    setpoint: 0.0,
                },
            )
            .with_intake(
                FakeMotor {
                    name: "intake",
                    log: self.log.clone(),
                    reading: Rc::new(Cell::new(Reading::Follow)),
                    setpoint: 0.0,
                },
                FakeSensor(self.piece.clone()),
            )
            .with_vision(FakeRange {
                value: self.range.clone(),
                reads: self.range_reads.clone(),
            })
            .with_indicator(FakeIndicator(self.lights.clone()))
            .with_calibration(&shooter_core::TableCalibration::new(
                speed_points(),
                angle_points(),
            ))
            .with_clock(clock)
    }

    pub fn robot(&self) -> Robot {
        self.builder().build().unwrap()
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.robot(), SchedulerCfg::default())
    }

    pub fn lights(&self) -> Vec<&'static str> {
        self.lights.borrow().clone()
    }

    /// Milliseconds since the rig was created.
    pub fn now_ms(&self) -> u128 {
        self.clock.elapsed().as_millis()
    }
}
