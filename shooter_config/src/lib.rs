#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and calibration table parsing for the shooter.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Calibration CSV loader enforces headers and checks that the table is a
//!   usable floor-lookup table (non-empty, finite, strictly increasing range).
use serde::Deserialize;
use serde::de::Deserializer;

/// One calibration point: at `range_m` meters, command `value`
/// (RPM for the speed table, degrees for the angle table).
///
/// Expected CSV headers:
/// range_m,value
///
/// Example:
/// range_m,value
/// 5.0,1000.0
/// 7.5,1500.0
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TableRow {
    pub range_m: f64,
    pub value: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedExitMode {
    /// Run the feed for the full `feed_run_ms`.
    #[default]
    Timed,
    /// End the feed early once the piece sensor clears (after `feed_guard_ms`).
    PieceCleared,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ShooterCfg {
    /// How long to wait for speed and angle to settle before firing anyway.
    pub stabilize_timeout_ms: u64,
    /// How long the kicker runs once the shot is fired.
    pub feed_run_ms: u64,
    /// Kicker open-loop output (fraction of full power).
    pub kicker_output: f64,
    /// +/- RPM band counted as "at speed".
    pub speed_tolerance_rpm: f64,
    pub feed_exit: FeedExitMode,
    /// Minimum feed time before a cleared piece sensor may end the feed.
    pub feed_guard_ms: u64,
}

impl Default for ShooterCfg {
    fn default() -> Self {
        Self {
            stabilize_timeout_ms: 3000,
            feed_run_ms: 2000,
            kicker_output: 0.25,
            speed_tolerance_rpm: 25.0,
            feed_exit: FeedExitMode::Timed,
            feed_guard_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AngleCfg {
    /// +/- degrees counted as "at angle".
    pub tolerance_deg: f64,
}

impl Default for AngleCfg {
    fn default() -> Self {
        Self { tolerance_deg: 2.0 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntakeCfg {
    /// Intake roller open-loop output.
    pub output: f64,
    /// Give up loading after this many ms (0 disables the timeout).
    pub load_timeout_ms: u64,
    /// Keep the intake sequence alive until the piece leaves again.
    pub wait_for_unload: bool,
}

impl Default for IntakeCfg {
    fn default() -> Self {
        Self {
            output: 0.25,
            load_timeout_ms: 0,
            wait_for_unload: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConflictMode {
    /// Refuse a sequence whose actuators are already owned.
    #[default]
    Reject,
    /// Cancel the current owner (running its shutdown) and admit the new sequence.
    Preempt,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SchedulerCfg {
    pub tick_ms: u64,
    pub conflict: ConflictMode,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            tick_ms: 20,
            conflict: ConflictMode::Reject,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RangeBindingMode {
    /// Read the range feed when the shot sets its targets.
    #[default]
    Live,
    /// Capture the range feed when the shot is triggered.
    Fixed,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RangeCfg {
    /// Shortest range we expect to shoot from (advisory).
    pub min_m: f64,
    /// Longest range we expect to shoot from (advisory).
    pub max_m: f64,
    pub binding: RangeBindingMode,
    /// Poll the range feed on a background thread at this rate (0 = poll inline).
    pub sample_hz: u32,
    /// A sampled range older than this is treated as unavailable.
    pub stale_ms: u64,
}

impl Default for RangeCfg {
    fn default() -> Self {
        Self {
            min_m: 1.0,
            max_m: 14.5,
            binding: RangeBindingMode::Live,
            sample_hz: 0,
            stale_ms: 200,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Tables {
    /// Range -> flywheel RPM. Accepts either:
    /// - array of tables: [{ range_m = 5.0, value = 1000.0 }, ...]
    /// - array of tuples: [[5.0, 1000.0], [7.5, 1500.0], ...]
    #[serde(deserialize_with = "de_table")]
    pub speed: Vec<TableRow>,
    /// Range -> shooter angle in degrees; same accepted forms as `speed`.
    #[serde(deserialize_with = "de_table")]
    pub angle: Vec<TableRow>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Knobs for the simulated collaborators used by the CLI.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    /// Range reported by the simulated vision feed.
    pub range_m: f64,
    /// First-order time constant of the simulated flywheel.
    pub flywheel_time_constant_ms: u64,
    /// When true the flywheel never spins up (exercises the stabilize timeout).
    pub flywheel_stuck: bool,
    /// Constant error between commanded and reported angle.
    pub angle_error_deg: f64,
    /// Piece sensor trips this long after the intake starts running.
    pub load_after_ms: u64,
    /// Piece sensor clears this long after the kicker starts running.
    pub clear_after_feed_ms: u64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            range_m: 10.0,
            flywheel_time_constant_ms: 400,
            flywheel_stuck: false,
            angle_error_deg: 0.1,
            load_after_ms: 500,
            clear_after_feed_ms: 150,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub shooter: ShooterCfg,
    pub angle: AngleCfg,
    pub intake: IntakeCfg,
    pub scheduler: SchedulerCfg,
    pub range: RangeCfg,
    pub tables: Tables,
    pub logging: Logging,
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowToml {
    Tuple((f64, f64)),
    Table { range_m: f64, value: f64 },
}

fn de_table<'de, D>(deserializer: D) -> Result<Vec<TableRow>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<RowToml>> = Option::deserialize(deserializer)?;
    let mut out = Vec::new();
    if let Some(items) = opt {
        for r in items {
            match r {
                RowToml::Tuple((range_m, value)) => out.push(TableRow { range_m, value }),
                RowToml::Table { range_m, value } => out.push(TableRow { range_m, value }),
            }
        }
    }
    Ok(out)
}

/// Check that rows form a usable floor-lookup table.
///
/// Rows must be non-empty, finite, and strictly increasing by `range_m`.
/// Unlike a least-squares calibration there is nothing to fit; the rows are
/// used exactly as given.
pub fn check_rows(rows: &[TableRow]) -> eyre::Result<()> {
    if rows.is_empty() {
        eyre::bail!("calibration table requires at least one row");
    }
    for (i, r) in rows.iter().enumerate() {
        if !r.range_m.is_finite() || !r.value.is_finite() {
            eyre::bail!("calibration table row {} is not finite", i);
        }
    }
    for i in 1..rows.len() {
        let d = rows[i].range_m - rows[i - 1].range_m;
        if d == 0.0 {
            eyre::bail!(
                "calibration table has duplicate range_m values at index {} and {}",
                i - 1,
                i
            );
        }
        if d < 0.0 {
            eyre::bail!(
                "calibration table range_m values must be strictly increasing (index {})",
                i
            );
        }
    }
    Ok(())
}

pub fn load_table_csv(path: &std::path::Path) -> eyre::Result<Vec<TableRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["range_m", "value"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'range_m,value', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TableRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    check_rows(&rows)?;
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Shooter
        if self.shooter.stabilize_timeout_ms == 0 {
            eyre::bail!("shooter.stabilize_timeout_ms must be >= 1");
        }
        if self.shooter.stabilize_timeout_ms > 60_000 {
            eyre::bail!("shooter.stabilize_timeout_ms is unreasonably large (>60s)");
        }
        if self.shooter.feed_run_ms == 0 {
            eyre::bail!("shooter.feed_run_ms must be >= 1");
        }
        if self.shooter.feed_run_ms > 60_000 {
            eyre::bail!("shooter.feed_run_ms is unreasonably large (>60s)");
        }
        if !(self.shooter.kicker_output > 0.0 && self.shooter.kicker_output <= 1.0) {
            eyre::bail!("shooter.kicker_output must be in (0.0, 1.0]");
        }
        if !self.shooter.speed_tolerance_rpm.is_finite() || self.shooter.speed_tolerance_rpm < 0.0
        {
            eyre::bail!("shooter.speed_tolerance_rpm must be >= 0");
        }
        if self.shooter.feed_exit == FeedExitMode::PieceCleared
            && self.shooter.feed_guard_ms >= self.shooter.feed_run_ms
        {
            eyre::bail!("shooter.feed_guard_ms must be < shooter.feed_run_ms");
        }

        // Angle
        if !self.angle.tolerance_deg.is_finite() || self.angle.tolerance_deg < 0.0 {
            eyre::bail!("angle.tolerance_deg must be >= 0");
        }

        // Intake
        if !(self.intake.output > 0.0 && self.intake.output <= 1.0) {
            eyre::bail!("intake.output must be in (0.0, 1.0]");
        }

        // Scheduler
        if self.scheduler.tick_ms == 0 {
            eyre::bail!("scheduler.tick_ms must be >= 1");
        }
        if self.scheduler.tick_ms > 1000 {
            eyre::bail!("scheduler.tick_ms must be <= 1000");
        }

        // Range
        if !self.range.min_m.is_finite() || self.range.min_m < 0.0 {
            eyre::bail!("range.min_m must be >= 0");
        }
        if !self.range.max_m.is_finite() || self.range.max_m <= self.range.min_m {
            eyre::bail!("range.max_m must be > range.min_m");
        }
        if self.range.sample_hz > 0 && self.range.stale_ms == 0 {
            eyre::bail!("range.stale_ms must be >= 1 when range.sample_hz is set");
        }

        // Tables: optional here (may come from CSV), but must be valid when present
        if !self.tables.speed.is_empty() {
            check_rows(&self.tables.speed).map_err(|e| eyre::eyre!("tables.speed: {e}"))?;
        }
        if !self.tables.angle.is_empty() {
            check_rows(&self.tables.angle).map_err(|e| eyre::eyre!("tables.angle: {e}"))?;
        }

        // Sim
        if !self.sim.range_m.is_finite() || self.sim.range_m < 0.0 {
            eyre::bail!("sim.range_m must be >= 0");
        }
        if self.sim.flywheel_time_constant_ms == 0 {
            eyre::bail!("sim.flywheel_time_constant_ms must be >= 1");
        }

        // Logging rotation: only known values
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
