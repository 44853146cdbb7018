//! Closed-loop actuators driven from a range table.
//!
//! An `ActuatorController` owns a target, a tolerance band and the last
//! measurement. The motor controller does its own closed-loop work; we only
//! issue setpoints and decide whether the measurement is inside the band.

use shooter_traits::{AngleDrive, BoxError, Motor};

use crate::hw_error::map_hw_error;
use crate::range_table::RangeTable;

/// Setpoint-level view of an actuator.
pub trait SetpointDrive {
    fn command(&mut self, target: f64) -> Result<(), BoxError>;
    fn halt(&mut self) -> Result<(), BoxError>;
    fn measure(&mut self) -> Result<f64, BoxError>;
}

/// Flywheel driven in velocity mode (RPM).
pub struct FlywheelDrive(pub Box<dyn Motor>);

impl SetpointDrive for FlywheelDrive {
    fn command(&mut self, rpm: f64) -> Result<(), BoxError> {
        self.0.set_velocity_setpoint(rpm)
    }
    fn halt(&mut self) -> Result<(), BoxError> {
        self.0.stop()
    }
    fn measure(&mut self) -> Result<f64, BoxError> {
        self.0.current_velocity()
    }
}

/// Shooter angle mechanism driven in position mode (degrees).
///
/// Shot shutdown leaves the angle where it is; only an explicit
/// `ActuatorController::stop` halts it.
pub struct PositionDrive(pub Box<dyn AngleDrive>);

impl SetpointDrive for PositionDrive {
    fn command(&mut self, degrees: f64) -> Result<(), BoxError> {
        self.0.set_angle_setpoint(degrees)
    }
    fn halt(&mut self) -> Result<(), BoxError> {
        self.0.stop()
    }
    fn measure(&mut self) -> Result<f64, BoxError> {
        self.0.current_angle()
    }
}

pub struct ActuatorController<D: SetpointDrive> {
    name: &'static str,
    drive: D,
    table: RangeTable,
    tolerance: f64,
    target: Option<f64>,
    measurement: Option<f64>,
}

pub type SpeedController = ActuatorController<FlywheelDrive>;
pub type AngleController = ActuatorController<PositionDrive>;

impl<D: SetpointDrive> core::fmt::Debug for ActuatorController<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActuatorController")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("measurement", &self.measurement)
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

impl<D: SetpointDrive> ActuatorController<D> {
    pub fn new(name: &'static str, drive: D, table: RangeTable, tolerance: f64) -> Self {
        Self {
            name,
            drive,
            table,
            tolerance,
            target: None,
            measurement: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up the setpoint for `range_m`, store it, and command the drive.
    ///
    /// A failed command is logged; the target is still recorded so that
    /// `at_target` keeps reporting against it.
    pub fn set_target_by_range(&mut self, range_m: f64) -> f64 {
        let target = self.table.lookup(range_m);
        self.target = Some(target);
        tracing::debug!(actuator = self.name, range_m, target, "setpoint from range");
        if let Err(e) = self.drive.command(target) {
            tracing::warn!(actuator = self.name, error = %map_hw_error(&*e), "setpoint command failed");
        }
        target
    }

    /// Read the drive once and cache the result. Call once per tick.
    pub fn refresh(&mut self) -> Option<f64> {
        self.measurement = match self.drive.measure() {
            Ok(v) if v.is_finite() => Some(v),
            Ok(v) => {
                tracing::warn!(actuator = self.name, value = v, "non-finite measurement");
                None
            }
            Err(e) => {
                tracing::warn!(actuator = self.name, error = %map_hw_error(&*e), "measurement unavailable");
                None
            }
        };
        tracing::trace!(actuator = self.name, measurement = ?self.measurement, target = ?self.target, "refresh");
        self.measurement
    }

    /// Last cached measurement, `None` if never read or the last read failed.
    pub fn current_measurement(&self) -> Option<f64> {
        self.measurement
    }

    pub fn target(&self) -> Option<f64> {
        self.target
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn table(&self) -> &RangeTable {
        &self.table
    }

    /// True when a target is set and the cached measurement is within the band.
    pub fn at_target(&self) -> bool {
        match (self.target, self.measurement) {
            (Some(t), Some(m)) => (m - t).abs() <= self.tolerance,
            _ => false,
        }
    }

    /// Zero the target and halt the drive. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.target = Some(0.0);
        if let Err(e) = self.drive.halt() {
            tracing::warn!(actuator = self.name, error = %map_hw_error(&*e), "halt failed");
        }
    }
}
