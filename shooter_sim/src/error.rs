use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("sensor timeout")]
    Timeout,
    #[error("{0} disconnected")]
    Disconnected(&'static str),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
