//! Where calibration tables come from.

/// Supplies `(range_m, value)` points for the speed and angle tables.
pub trait CalibrationSource {
    fn speed_points(&self) -> Vec<(f64, f64)>;
    fn angle_points(&self) -> Vec<(f64, f64)>;
}

/// Calibration held in memory, e.g. parsed from TOML or CSV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCalibration {
    pub speed: Vec<(f64, f64)>,
    pub angle: Vec<(f64, f64)>,
}

impl TableCalibration {
    pub fn new(speed: Vec<(f64, f64)>, angle: Vec<(f64, f64)>) -> Self {
        Self { speed, angle }
    }
}

impl CalibrationSource for TableCalibration {
    fn speed_points(&self) -> Vec<(f64, f64)> {
        self.speed.clone()
    }

    fn angle_points(&self) -> Vec<(f64, f64)> {
        self.angle.clone()
    }
}
