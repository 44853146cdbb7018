use thiserror::Error;

use crate::sequence::Requirements;

#[derive(Debug, Error, Clone)]
pub enum ShooterError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("invalid state: {0}")]
    State(String),
    #[error("interrupted")]
    Interrupted,
    #[error("io error: {0}")]
    Io(String),
}

/// A calibration table that cannot be used for floor lookup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("table has no entries")]
    Empty,
    #[error("entry {index} is not finite")]
    NonFinite { index: usize },
    #[error("entry {index} does not increase strictly in range")]
    NotIncreasing { index: usize },
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing shooter (flywheel, angle drive, feed)")]
    MissingShooter,
    #[error("missing intake (motor, piece sensor)")]
    MissingIntake,
    #[error("missing vision range feed")]
    MissingVision,
    #[error("missing {0} table")]
    MissingTable(&'static str),
    #[error("invalid {table} table: {source}")]
    InvalidTable {
        table: &'static str,
        #[source]
        source: TableError,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("{command} needs {wanted:?} but {owner} already holds {held:?}")]
    ResourceConflict {
        command: &'static str,
        owner: &'static str,
        wanted: Requirements,
        held: Requirements,
    },
    #[error("no active command with id {0}")]
    UnknownCommand(u64),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
