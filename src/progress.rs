//! Periodic progress lines while a run is in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{Error, Result};
use crate::results::BenchmarkCounters;

/// One observation of a running benchmark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub total_ops: u64,
    pub ops_per_second: f64,
    pub remaining: Duration,
}

/// Samples the shared counters on a fixed interval and logs a status line.
///
/// Only loads the counters; it never writes to them and never holds up the
/// workers.
pub struct ProgressReporter {
    counters: Arc<BenchmarkCounters>,
    started: Instant,
    duration: Duration,
    interval: Duration,
}

impl ProgressReporter {
    /// Create a reporter for a run that began at `started` and lasts `duration`.
    ///
    /// Fails with [`Error::InvalidArgument`] if `interval` is zero.
    pub fn new(
        counters: Arc<BenchmarkCounters>,
        started: Instant,
        duration: Duration,
        interval: Duration,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidArgument(
                "progress interval must be positive".into(),
            ));
        }
        Ok(Self {
            counters,
            started,
            duration,
            interval,
        })
    }

    /// Sample the counters as if `elapsed` had passed since the start.
    pub fn sample_at(&self, elapsed: Duration) -> ProgressSample {
        let total_ops = self.counters.operations();
        let secs = elapsed.as_secs_f64();
        ProgressSample {
            total_ops,
            ops_per_second: if secs > 0.0 { total_ops as f64 / secs } else { 0.0 },
            remaining: self.duration.saturating_sub(elapsed),
        }
    }

    /// Sample the counters now.
    pub fn sample(&self) -> ProgressSample {
        self.sample_at(self.started.elapsed())
    }

    /// Report until the run's deadline passes or `stop` fires.
    pub fn spawn(self, stop: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::from_std(self.started);
            let mut ticker = tokio::time::interval_at(start + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let expired = tokio::time::sleep_until(start + self.duration);
            tokio::pin!(expired);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let sample = self.sample();
                        if !sample.remaining.is_zero() {
                            info!(
                                "Progress: {} ops, {:.1} ops/sec, {}s remaining",
                                sample.total_ops,
                                sample.ops_per_second,
                                sample.remaining.as_secs()
                            );
                        }
                    }
                    _ = &mut expired => break,
                    _ = stop.cancelled() => break,
                }
            }
        })
    }
}
