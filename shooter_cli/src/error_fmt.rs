//! Human-readable error descriptions and structured JSON error formatting.

use shooter_core::error::{BuildError, ScheduleError, ShooterError, TableError};

/// Every message in the error chain, outermost first, lowercased.
fn chain_text(err: &eyre::Report) -> String {
    err.chain()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ")
        .to_ascii_lowercase()
}

fn table_fix(source: &TableError) -> &'static str {
    match source {
        TableError::Empty => {
            "Add rows under [tables] in the config or pass --speed-table/--angle-table with a CSV."
        }
        TableError::NonFinite { .. } => "Replace NaN/inf entries with real numbers.",
        TableError::NotIncreasing { .. } => "Sort the rows by range_m and remove duplicate ranges.",
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidTable { table, source } => format!(
                "What happened: The {table} table cannot be used ({source}).\nLikely causes: Missing, unsorted or non-numeric calibration rows.\nHow to fix: {}",
                table_fix(source)
            ),
            BuildError::MissingTable(table) => format!(
                "What happened: No {table} table was provided.\nLikely causes: The config has no [tables] {table} entry and no CSV was given.\nHow to fix: Add [tables] {table} to the config or pass --{table}-table <CSV>."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML or on the command line.\nHow to fix: Edit the config file or arguments, then rerun."
            ),
            BuildError::MissingShooter | BuildError::MissingIntake | BuildError::MissingVision => format!(
                "What happened: {be}.\nLikely causes: A collaborator failed to initialize.\nHow to fix: Re-run with --log-level=debug for details."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<ScheduleError>() {
        return match se {
            ScheduleError::ResourceConflict { command, owner, .. } => format!(
                "What happened: {command} could not start because {owner} already owns the actuators it needs.\nLikely causes: Two sequences that share actuators were scheduled together.\nHow to fix: Run them one after another, or set scheduler.conflict = \"preempt\" to let the newer one take over."
            ),
            ScheduleError::UnknownCommand(id) => format!(
                "What happened: No active sequence with id {id}.\nLikely causes: It already finished.\nHow to fix: Nothing to cancel."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<ShooterError>() {
        return match de {
            ShooterError::Interrupted => "What happened: Run interrupted.\nLikely causes: Ctrl-C or a shutdown request.\nHow to fix: Active sequences were shut down; start a new run when ready.".to_string(),
            ShooterError::State(msg) if msg.contains("did not finish") => format!(
                "What happened: The {msg}.\nLikely causes: The range feed never produced a reading, or the piece never arrived.\nHow to fix: Check the vision feed and piece sensor, or raise --max-ticks."
            ),
            ShooterError::State(msg) if msg.contains("no range reading") => format!(
                "What happened: {msg}.\nLikely causes: The range feed is offline while [range] binding = \"fixed\".\nHow to fix: Pass --range <METERS> or use binding = \"live\"."
            ),
            ShooterError::Timeout => "What happened: A sensor read timed out.\nLikely causes: Device unplugged or too slow.\nHow to fix: Check wiring and connections.".to_string(),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let lower = chain_text(err);

    // Calibration CSV header special-case
    if lower.contains("calibration csv must have headers") {
        return "Invalid headers in calibration CSV. Expected 'range_m,value'.".to_string();
    }

    if lower.contains("calibration") || lower.contains("tables.") {
        return format!(
            "What happened: A calibration table is invalid ({}).\nLikely causes: Missing rows, non-numeric values, or ranges not strictly increasing.\nHow to fix: Fix the table rows and try again.",
            err.root_cause()
        );
    }

    if lower.contains("parse config") || lower.contains("must be") {
        return format!(
            "What happened: Configuration is invalid ({}).\nLikely causes: A typo or an out-of-range value in the TOML.\nHow to fix: Edit the TOML config and try again.",
            err.root_cause()
        );
    }

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file ({}).\nLikely causes: Wrong --config path.\nHow to fix: Pass --config <FILE> pointing at a readable TOML file.",
            err.root_cause()
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {err}"
    )
}

/// Short stable name for the JSON `reason` field.
fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidTable { .. } | BuildError::MissingTable(_) => "InvalidTable",
            _ => "InvalidConfig",
        };
    }
    if let Some(ScheduleError::ResourceConflict { .. }) = err.downcast_ref::<ScheduleError>() {
        return "ResourceConflict";
    }
    if let Some(ShooterError::Interrupted) = err.downcast_ref::<ShooterError>() {
        return "Interrupted";
    }
    if chain_text(err).contains("calibration") {
        return "InvalidTable";
    }
    "Error"
}

/// Stable exit codes: 3 invalid table, 4 resource conflict, 5 interrupted, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "InvalidTable" => 3,
        "ResourceConflict" => 4,
        "Interrupted" => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let reason = reason_name(err);
    let msg = humanize(err);

    let details = match (
        err.downcast_ref::<BuildError>(),
        err.downcast_ref::<ScheduleError>(),
    ) {
        (Some(BuildError::InvalidTable { table, source }), _) => {
            Some(json!({ "table": table, "problem": source.to_string() }))
        }
        (Some(BuildError::MissingTable(table)), _) => Some(json!({ "table": table })),
        (
            _,
            Some(ScheduleError::ResourceConflict {
                command, owner, ..
            }),
        ) => Some(json!({ "command": command, "owner": owner })),
        _ => None,
    };

    let obj = if let Some(d) = details {
        json!({ "reason": reason, "details": d, "message": msg })
    } else {
        json!({ "reason": reason, "message": msg })
    };
    obj.to_string()
}
