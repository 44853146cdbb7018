//! Collaborator interfaces for the shooter core.
//!
//! The core never addresses hardware directly; motors, the angle mechanism,
//! the piece sensor, the range feed and the indicator strip are all reached
//! through these traits. Errors cross the boundary boxed so that any driver
//! (real or simulated) can report its own error type.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Boxed error used at every collaborator boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A single motor: flywheel, feed/kicker or intake roller.
pub trait Motor {
    /// Closed-loop velocity target in RPM (handled by the motor controller's own PID).
    fn set_velocity_setpoint(&mut self, rpm: f64) -> Result<(), BoxError>;
    /// Open-loop output as a fraction of full power, `-1.0..=1.0`.
    fn set_output(&mut self, percent: f64) -> Result<(), BoxError>;
    fn stop(&mut self) -> Result<(), BoxError>;
    /// Latest measured velocity in RPM.
    fn current_velocity(&mut self) -> Result<f64, BoxError>;
}

/// Shooter angle mechanism (position controlled).
pub trait AngleDrive {
    fn set_angle_setpoint(&mut self, degrees: f64) -> Result<(), BoxError>;
    fn stop(&mut self) -> Result<(), BoxError>;
    fn current_angle(&mut self) -> Result<f64, BoxError>;
}

/// Binary presence sensor (limit switch / beam break).
pub trait BinarySensor {
    fn is_tripped(&mut self) -> Result<bool, BoxError>;
}

/// Range-to-target feed, usually vision based.
pub trait RangeSensor {
    /// Best current estimate of the straight-line distance to the target, meters.
    fn current_range_m(&mut self) -> Result<f64, BoxError>;
}

/// Fire-and-forget status indicator (LED strip).
///
/// Not an exclusive resource: any component may write, last write wins.
pub trait Indicator {
    fn show_idle(&mut self);
    fn show_pre_shoot(&mut self);
    fn show_shot_fired(&mut self);
    fn show_post_shoot_cleanup(&mut self);
    fn show_intake_running(&mut self) {}
    fn show_intake_loaded(&mut self) {}
}

impl<T: Motor + ?Sized> Motor for Box<T> {
    fn set_velocity_setpoint(&mut self, rpm: f64) -> Result<(), BoxError> {
        (**self).set_velocity_setpoint(rpm)
    }
    fn set_output(&mut self, percent: f64) -> Result<(), BoxError> {
        (**self).set_output(percent)
    }
    fn stop(&mut self) -> Result<(), BoxError> {
        (**self).stop()
    }
    fn current_velocity(&mut self) -> Result<f64, BoxError> {
        (**self).current_velocity()
    }
}

impl<T: AngleDrive + ?Sized> AngleDrive for Box<T> {
    fn set_angle_setpoint(&mut self, degrees: f64) -> Result<(), BoxError> {
        (**self).set_angle_setpoint(degrees)
    }
    fn stop(&mut self) -> Result<(), BoxError> {
        (**self).stop()
    }
    fn current_angle(&mut self) -> Result<f64, BoxError> {
        (**self).current_angle()
    }
}

impl<T: BinarySensor + ?Sized> BinarySensor for Box<T> {
    fn is_tripped(&mut self) -> Result<bool, BoxError> {
        (**self).is_tripped()
    }
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn current_range_m(&mut self) -> Result<f64, BoxError> {
        (**self).current_range_m()
    }
}
