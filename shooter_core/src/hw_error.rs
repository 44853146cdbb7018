//! Maps `Box<dyn Error>` from trait boundaries to typed `ShooterError`.
//!
//! The traits in `shooter_traits` use `Box<dyn Error + Send + Sync>` so any
//! driver can report its own error type; this module converts those to our
//! typed enum, with an optional feature-gated path for `shooter_sim::SimError`.

use crate::error::ShooterError;

/// Map a trait-boundary error to a typed `ShooterError`.
///
/// Attempts to downcast known simulator error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ShooterError {
    #[cfg(feature = "sim-errors")]
    {
        if let Some(sim) = e.downcast_ref::<shooter_sim::SimError>() {
            return match sim {
                shooter_sim::SimError::Timeout => ShooterError::Timeout,
                shooter_sim::SimError::Io(io) => ShooterError::Io(io.to_string()),
                other => ShooterError::HardwareFault(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        if io.kind() == std::io::ErrorKind::TimedOut {
            return ShooterError::Timeout;
        }
        return ShooterError::Io(io.to_string());
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") || s.to_lowercase().contains("timed out") {
        ShooterError::Timeout
    } else {
        ShooterError::Hardware(s)
    }
}
