//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "shooter", version, about = "Shooter sequencing CLI (simulated robot)")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/shooter.toml")]
    pub config: PathBuf,

    /// Speed table CSV (strict header `range_m,value`); replaces `[tables] speed`
    #[arg(long, value_name = "FILE")]
    pub speed_table: Option<PathBuf>,

    /// Angle table CSV (strict header `range_m,value`); replaces `[tables] angle`
    #[arg(long, value_name = "FILE")]
    pub angle_table: Option<PathBuf>,

    /// Print results and errors as JSON lines; console logs become JSON too
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace). Defaults to `[logging] level`, then warn.
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Options shared by every command that runs the scheduler.
#[derive(Args, Debug, Clone, Copy)]
pub struct RunOpts {
    /// Pace ticks on the wall clock instead of virtual time
    #[arg(long, action = ArgAction::SetTrue)]
    pub realtime: bool,

    /// Give up (cancelling everything) after this many ticks
    #[arg(long, value_name = "N")]
    pub max_ticks: Option<u64>,
}

/// A sequence that can be scheduled from the command line.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Job {
    Shoot,
    Intake,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fire one shot at the current (or given) range
    Shoot {
        /// Shoot from this range in meters instead of reading the range feed
        #[arg(long, value_name = "METERS")]
        range: Option<f64>,
        #[command(flatten)]
        run: RunOpts,
    },
    /// Run the intake until a piece is loaded
    Intake {
        #[command(flatten)]
        run: RunOpts,
    },
    /// Schedule several sequences on the same tick and run until all finish
    Schedule {
        /// Sequences in scheduling order, e.g. `intake shoot`
        #[arg(value_enum, required = true, num_args = 1..)]
        jobs: Vec<Job>,
        #[command(flatten)]
        run: RunOpts,
    },
    /// Print the speed and angle setpoints for a range
    Lookup {
        /// Range in meters
        #[arg(long, value_name = "METERS")]
        range: f64,
    },
    /// Validate config and tables, build the robot, read each sensor once
    SelfCheck,
}
