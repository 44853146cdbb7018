mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE, Job};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        let code = error_fmt::exit_code_for_error(&e);
        tracing::error!(error = %e, code, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", error_fmt::format_error_json(&e));
        } else {
            eprintln!("{}", error_fmt::humanize(&e));
        }
        std::process::exit(code);
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;

    let cfg = load_config(&cli.config)?;
    init_tracing(&cli, &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        })
        .wrap_err("install Ctrl-C handler")?;
    }

    let tables = run::resolve_tables(&cfg, cli.speed_table.as_deref(), cli.angle_table.as_deref())?;

    match cli.cmd {
        Commands::Shoot { range, run } => {
            run::run_jobs(&cfg, &tables, &[Job::Shoot], range, run, shutdown)
        }
        Commands::Intake { run } => run::run_jobs(&cfg, &tables, &[Job::Intake], None, run, shutdown),
        Commands::Schedule { jobs, run } => run::run_jobs(&cfg, &tables, &jobs, None, run, shutdown),
        Commands::Lookup { range } => run::lookup(&cfg, &tables, range),
        Commands::SelfCheck => run::self_check(&cfg, &tables),
    }
}

fn load_config(path: &Path) -> eyre::Result<shooter_config::Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = shooter_config::load_toml(&text).map_err(|e: toml::de::Error| {
        eyre::eyre!("parse config {}: {}", path.display(), e.message())
    })?;
    cfg.validate()?;
    Ok(cfg)
}

/// Console logs on stderr (pretty or JSON) plus an optional JSON-lines file sink.
///
/// Level precedence: `RUST_LOG`, then `--log-level`, then `[logging] level`, then warn.
fn init_tracing(cli: &Cli, logging: &shooter_config::Logging) -> eyre::Result<()> {
    let level = cli
        .log_level
        .as_deref()
        .or(logging.level.as_deref())
        .unwrap_or("warn");
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level).wrap_err_with(|| format!("invalid log level {level:?}"))?,
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);
    if cli.json {
        layers.push(console.json().boxed());
    } else {
        layers.push(console.boxed());
    }

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?;
        let rotation = match logging.rotation.as_deref() {
            Some("daily") => Rotation::DAILY,
            Some("hourly") => Rotation::HOURLY,
            _ => Rotation::NEVER,
        };
        let (writer, guard) =
            tracing_appender::non_blocking(RollingFileAppender::new(rotation, dir, name));
        let _ = FILE_GUARD.set(guard);
        layers.push(fmt::layer().json().with_writer(writer).boxed());
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
