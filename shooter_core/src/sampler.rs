//! Background range sampling.
//!
//! Spawns a thread that owns the `RangeSensor`, pushes the latest reading
//! through a bounded channel, and tracks the last-ok timestamp so the
//! consumer can tell a live feed from a stalled one.
//!
//! Each `RangeSampler` spawns exactly one thread, shut down and joined when
//! the sampler is dropped.
use crossbeam_channel as xch;
use shooter_traits::RangeSensor;
use shooter_traits::clock::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::hw_error::map_hw_error;

pub struct RangeSampler {
    rx: xch::Receiver<f64>,
    last_ok: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
    epoch: Instant,
    clock: Arc<dyn Clock + Send + Sync>,
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    /// Join handle for graceful thread cleanup
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl RangeSampler {
    pub fn spawn<S: RangeSensor + Send + 'static>(
        mut sensor: S,
        hz: u32,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let (tx, rx) = xch::bounded(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_clone = last_ok.clone();
        let failures = Arc::new(AtomicU64::new(0));
        let failures_clone = failures.clone();
        let period = Duration::from_micros(crate::util::period_us(hz));
        let epoch = clock.now();
        let thread_clock = clock.clone();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("range sampler received shutdown signal");
                    break;
                }

                match sensor.current_range_m() {
                    Ok(r) if r.is_finite() => {
                        // Full means the consumer has not caught up; the
                        // reading it has is at most one period old.
                        match tx.try_send(r) {
                            Ok(()) | Err(xch::TrySendError::Full(_)) => {}
                            Err(xch::TrySendError::Disconnected(_)) => {
                                tracing::debug!("range sampler consumer disconnected, exiting thread");
                                break;
                            }
                        }
                        last_ok_clone.store(thread_clock.ms_since(epoch), Ordering::Relaxed);
                    }
                    Ok(r) => {
                        failures_clone.fetch_add(1, Ordering::Relaxed);
                        tracing::trace!(range_m = r, "non-finite range sample dropped");
                    }
                    Err(e) => {
                        failures_clone.fetch_add(1, Ordering::Relaxed);
                        tracing::trace!(error = %map_hw_error(&*e), "range sample failed");
                    }
                }

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                thread_clock.sleep(period);
            }
            tracing::trace!("range sampler thread exiting cleanly");
        });

        Self {
            rx,
            last_ok,
            failures,
            epoch,
            clock,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Newest reading since the last call, if any.
    pub fn latest(&self) -> Option<f64> {
        self.rx.try_iter().last()
    }

    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    /// Milliseconds since the last good reading, on the sampler's clock.
    pub fn stalled_for_now(&self) -> u64 {
        self.stalled_for(self.clock.ms_since(self.epoch))
    }

    /// Failed or non-finite reads so far.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

impl Drop for RangeSampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits at its next shutdown check: immediately if it is
        // between reads, otherwise once the current read or sleep returns.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("range sampler thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "range sampler thread panicked during shutdown");
                }
            }
        }
    }
}
