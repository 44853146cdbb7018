//! Robot assembly on the simulated bench, command execution and result output.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use eyre::WrapErr;
use serde_json::json;
use shooter_config::{Config, TableRow};
use shooter_core::error::{BuildError, Result as CoreResult, ShooterError};
use shooter_core::{
    BindingMode, Completed, IntakeOutcome, IntakeReport, Outcome, RangeBinding, RangeLimits,
    RangeTable, Robot, RunLimits, RunSummary, Scheduler, SchedulerCfg, ShotReport, Stabilization,
    TableCalibration, run_until_idle,
};
use shooter_sim::{BenchCfg, SimBench, SimIndicator, SimVision};
use shooter_traits::{Clock, ManualClock, MonotonicClock};

use crate::cli::{Job, RunOpts};

/// Test hook: `offline` makes the simulated range feed never report.
const ENV_VISION: &str = "SHOOTER_TEST_VISION";
/// Test hook: `1` keeps the simulated flywheel from spinning up.
const ENV_FLYWHEEL_STUCK: &str = "SHOOTER_TEST_FLYWHEEL_STUCK";

/// Config tables, with any CSV files replacing them.
pub fn resolve_tables(
    cfg: &Config,
    speed_csv: Option<&Path>,
    angle_csv: Option<&Path>,
) -> eyre::Result<TableCalibration> {
    let mut cal = TableCalibration::from(&cfg.tables);
    if let Some(path) = speed_csv {
        cal.speed = points(
            &shooter_config::load_table_csv(path).wrap_err("load speed table")?,
        );
    }
    if let Some(path) = angle_csv {
        cal.angle = points(
            &shooter_config::load_table_csv(path).wrap_err("load angle table")?,
        );
    }
    Ok(cal)
}

fn points(rows: &[TableRow]) -> Vec<(f64, f64)> {
    rows.iter().map(|r| (r.range_m, r.value)).collect()
}

fn env_flag(name: &str, value: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v.eq_ignore_ascii_case(value))
}

/// A scheduler over a freshly built simulated robot.
pub struct Session {
    pub sched: Scheduler,
    pub indicator: SimIndicator,
}

pub fn build_session(
    cfg: &Config,
    tables: &TableCalibration,
    realtime: bool,
    piece_loaded: bool,
) -> eyre::Result<Session> {
    let clock: Arc<dyn Clock + Send + Sync> = if realtime {
        Arc::new(MonotonicClock::new())
    } else {
        Arc::new(ManualClock::new())
    };

    let bench = SimBench::new(
        BenchCfg {
            flywheel_time_constant: Duration::from_millis(cfg.sim.flywheel_time_constant_ms),
            flywheel_stuck: cfg.sim.flywheel_stuck || env_flag(ENV_FLYWHEEL_STUCK, "1"),
            angle_error_deg: cfg.sim.angle_error_deg,
            load_after: Duration::from_millis(cfg.sim.load_after_ms),
            clear_after_feed: Duration::from_millis(cfg.sim.clear_after_feed_ms),
            piece_loaded,
        },
        clock.clone(),
    );
    let vision = if env_flag(ENV_VISION, "offline") {
        tracing::info!("sim vision offline");
        SimVision::disconnected()
    } else {
        SimVision::fixed(cfg.sim.range_m)
    };
    let indicator = SimIndicator::new();

    let robot = Robot::builder()
        .with_shooter(bench.flywheel(), bench.angle(), bench.feed())
        .with_intake(bench.intake(), bench.piece_sensor())
        .with_vision(vision)
        .with_indicator(indicator.clone())
        .with_calibration(tables)
        .with_shot_cfg((&cfg.shooter).into())
        .with_intake_cfg((&cfg.intake).into())
        .with_tolerances(cfg.into())
        .with_range_limits((&cfg.range).into())
        .with_sampling((&cfg.range).into())
        .with_clock(clock)
        .build()?;

    let sched = Scheduler::new(robot, SchedulerCfg::from(&cfg.scheduler));
    Ok(Session { sched, indicator })
}

fn run_limits(opts: RunOpts, shutdown: Arc<AtomicBool>) -> RunLimits {
    let defaults = RunLimits::default();
    RunLimits {
        max_ticks: opts.max_ticks.unwrap_or(defaults.max_ticks),
        shutdown: Some(shutdown),
    }
}

/// The binding a CLI shot uses: an explicit range wins over `[range] binding`.
fn shot_binding(cfg: &Config, robot: &mut Robot, range: Option<f64>) -> CoreResult<RangeBinding> {
    if let Some(r) = range {
        if !r.is_finite() {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "--range must be a finite number",
            )));
        }
        return Ok(RangeBinding::Fixed(r));
    }
    robot.bind_range(BindingMode::from(&cfg.range)).ok_or_else(|| {
        eyre::Report::new(ShooterError::State(
            "no range reading available to capture for a fixed-range shot".into(),
        ))
    })
}

/// Schedule `jobs` on the same tick and run until every one has finished.
pub fn run_jobs(
    cfg: &Config,
    tables: &TableCalibration,
    jobs: &[Job],
    range: Option<f64>,
    opts: RunOpts,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    let piece_loaded = !jobs.contains(&Job::Intake);
    let Session {
        mut sched,
        indicator,
    } = build_session(cfg, tables, opts.realtime, piece_loaded)?;

    for job in jobs {
        match job {
            Job::Shoot => {
                let binding = shot_binding(cfg, sched.robot_mut(), range)?;
                sched.schedule_shot(binding)?;
            }
            Job::Intake => {
                sched.schedule_intake()?;
            }
        }
    }

    let result = run_until_idle(&mut sched, &run_limits(opts, shutdown));
    tracing::debug!(patterns = ?indicator.history(), "indicator history");
    match result {
        Ok(summary) => {
            report_summary(&summary);
            Ok(())
        }
        Err(e) => {
            // Whatever finished, including the cancelled shutdowns.
            for done in sched.drain_completed() {
                report_completed(&done);
            }
            Err(e)
        }
    }
}

fn json_mode() -> bool {
    crate::cli::JSON_MODE.get().copied().unwrap_or(false)
}

fn ms(d: Option<Duration>) -> Option<u64> {
    d.map(shooter_core::util::as_millis_u64)
}

fn stabilization_name(s: Option<Stabilization>) -> Option<&'static str> {
    s.map(|s| match s {
        Stabilization::Reached => "reached",
        Stabilization::TimedOut => "timed_out",
    })
}

fn intake_outcome_name(o: Option<IntakeOutcome>) -> Option<&'static str> {
    o.map(|o| match o {
        IntakeOutcome::Loaded => "loaded",
        IntakeOutcome::TimedOut => "timed_out",
        IntakeOutcome::Cancelled => "cancelled",
    })
}

fn shot_json(id: u64, r: &ShotReport) -> serde_json::Value {
    json!({
        "id": id,
        "command": "shoot",
        "range_m": r.range_m,
        "speed_rpm": r.speed_target,
        "angle_deg": r.angle_target,
        "stabilization": stabilization_name(r.stabilization),
        "stabilize_ms": ms(r.stabilize_time),
        "feed_ms": ms(r.feed_time),
        "outside_limits": r.outside_limits,
        "cancelled": r.cancelled,
    })
}

fn intake_json(id: u64, r: &IntakeReport) -> serde_json::Value {
    json!({
        "id": id,
        "command": "intake",
        "outcome": intake_outcome_name(r.outcome),
        "load_ms": ms(r.load_time),
        "unloaded": r.unloaded,
        "cancelled": r.cancelled,
    })
}

fn shot_text(id: u64, r: &ShotReport) -> String {
    if r.cancelled && r.speed_target.is_none() {
        return format!("shoot #{id}: cancelled before targets were set");
    }
    let mut line = format!(
        "shoot #{id}: range {:.2} m, speed {:.0} rpm, angle {:.1} deg",
        r.range_m.unwrap_or(f64::NAN),
        r.speed_target.unwrap_or(f64::NAN),
        r.angle_target.unwrap_or(f64::NAN),
    );
    match (r.stabilization, ms(r.stabilize_time)) {
        (Some(Stabilization::Reached), Some(t)) => line.push_str(&format!(", at target after {t} ms")),
        (Some(Stabilization::TimedOut), Some(t)) => {
            line.push_str(&format!(", fired on timeout after {t} ms"));
        }
        _ => {}
    }
    if let Some(t) = ms(r.feed_time) {
        line.push_str(&format!(", fed {t} ms"));
    }
    if r.outside_limits {
        line.push_str(" (outside shooting window)");
    }
    if r.cancelled {
        line.push_str(" (cancelled)");
    }
    line
}

fn intake_text(id: u64, r: &IntakeReport) -> String {
    match (r.outcome, ms(r.load_time)) {
        (Some(IntakeOutcome::Loaded), Some(t)) if r.unloaded => {
            format!("intake #{id}: loaded after {t} ms, then unloaded")
        }
        (Some(IntakeOutcome::Loaded), Some(t)) => format!("intake #{id}: loaded after {t} ms"),
        (Some(IntakeOutcome::TimedOut), _) => format!("intake #{id}: gave up, no piece"),
        _ => format!("intake #{id}: cancelled"),
    }
}

fn report_completed(done: &Completed) {
    let id = done.id.get();
    if json_mode() {
        let v = match &done.outcome {
            Outcome::Shot(r) => shot_json(id, r),
            Outcome::Intake(r) => intake_json(id, r),
        };
        println!("{v}");
    } else {
        let line = match &done.outcome {
            Outcome::Shot(r) => shot_text(id, r),
            Outcome::Intake(r) => intake_text(id, r),
        };
        println!("{line}");
    }
}

fn report_summary(summary: &RunSummary) {
    for done in &summary.completed {
        report_completed(done);
    }
    let elapsed_ms = shooter_core::util::as_millis_u64(summary.elapsed);
    if json_mode() {
        println!(
            "{}",
            json!({ "ticks": summary.ticks, "elapsed_ms": elapsed_ms, "completed": summary.completed.len() })
        );
    } else {
        println!("complete in {elapsed_ms} ms ({} ticks)", summary.ticks);
    }
}

fn table(name: &'static str, points: &[(f64, f64)]) -> CoreResult<RangeTable> {
    RangeTable::new(points.iter().copied())
        .map_err(|source| eyre::Report::new(BuildError::InvalidTable { table: name, source }))
}

pub fn lookup(cfg: &Config, tables: &TableCalibration, range_m: f64) -> eyre::Result<()> {
    if !range_m.is_finite() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "--range must be a finite number",
        )));
    }
    let speed = table("speed", &tables.speed)?.lookup(range_m);
    let angle = table("angle", &tables.angle)?.lookup(range_m);
    let limits = RangeLimits::from(&cfg.range);
    let outside = !limits.contains(range_m);
    if json_mode() {
        println!(
            "{}",
            json!({ "range_m": range_m, "speed_rpm": speed, "angle_deg": angle, "outside_limits": outside })
        );
    } else {
        println!("range {range_m:.2} m -> speed {speed:.0} rpm, angle {angle:.1} deg");
        if outside {
            println!(
                "note: outside the shooting window {:.2}..={:.2} m",
                limits.min_m, limits.max_m
            );
        }
    }
    Ok(())
}

pub fn self_check(cfg: &Config, tables: &TableCalibration) -> eyre::Result<()> {
    let Session { mut sched, .. } = build_session(cfg, tables, false, false)?;
    let robot = sched.robot_mut();
    let range = robot.read_range();
    let piece = robot.piece_present();
    let speed_entries = robot.shooter.speed.table().len();
    let angle_entries = robot.shooter.angle.table().len();
    if range.is_none() {
        tracing::warn!("range feed gave no reading during self-check");
    }
    if json_mode() {
        println!(
            "{}",
            json!({
                "ok": true,
                "range_m": range,
                "piece_present": piece,
                "speed_entries": speed_entries,
                "angle_entries": angle_entries,
            })
        );
    } else {
        let range = range.map_or_else(|| "unavailable".to_string(), |r| format!("{r:.2} m"));
        let piece = match piece {
            Some(true) => "yes",
            Some(false) => "no",
            None => "unknown",
        };
        println!(
            "self-check ok: range {range}, piece loaded: {piece}, speed table {speed_entries} entries, angle table {angle_entries} entries"
        );
    }
    Ok(())
}
