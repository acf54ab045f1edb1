//! Deadline-bounded point-read load generation.
//!
//! A run starts a fixed pool of workers against one [`ContainerClient`].
//! Each worker is a blocking task, because every read is a synchronous call
//! into the native library, and loops until the deadline passes or the run
//! is stopped. Both conditions are checked once per iteration, before a new
//! read starts; a read already in flight always runs to completion, so a
//! run overshoots its deadline by at most the slowest outstanding read.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::LoadConfig;
use crate::container::ContainerClient;
use crate::error::{Error, Result};
use crate::progress::ProgressReporter;
use crate::results::{BenchmarkCounters, BenchmarkResults};

/// Item id and partition key for one index.
///
/// The mapping matches the data-loading tooling: index `i` is stored as
/// `item{i}` in partition `partition{i % partition_count}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemKey {
    pub index: u64,
    pub item_id: String,
    pub partition_key: String,
}

impl ItemKey {
    /// Map `index` (reduced modulo `item_count`) to its key.
    ///
    /// Fails with [`Error::InvalidArgument`] if either count is zero.
    pub fn new(index: u64, item_count: u64, partition_count: u64) -> Result<Self> {
        if item_count == 0 || partition_count == 0 {
            return Err(Error::InvalidArgument(format!(
                "item count ({}) and partition count ({}) must be non-zero",
                item_count, partition_count
            )));
        }

        let index = index % item_count;
        Ok(Self {
            index,
            item_id: format!("item{}", index),
            partition_key: format!("partition{}", index % partition_count),
        })
    }
}

/// Everything one worker needs. Nothing here is shared mutably except the
/// counters, which are only added to.
struct WorkerContext {
    id: usize,
    rng: StdRng,
    container: Arc<ContainerClient>,
    counters: Arc<BenchmarkCounters>,
    item_count: u64,
    partition_count: u64,
    deadline: Instant,
    stop: CancellationToken,
}

impl WorkerContext {
    fn seed(id: usize) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        now.wrapping_add(id as u64)
    }

    fn should_stop(&self) -> bool {
        self.stop.is_cancelled() || Instant::now() >= self.deadline
    }

    fn run(mut self) {
        let mut attempts = 0u64;

        while !self.should_stop() {
            let index = self.rng.random_range(0..self.item_count);
            let key = match ItemKey::new(index, self.item_count, self.partition_count) {
                Ok(key) => key,
                Err(e) => {
                    warn!(worker = self.id, error = %e, "cannot build item key");
                    break;
                }
            };

            let op_start = Instant::now();
            let result = self.container.read_item(&key.item_id, &key.partition_key);
            let op_latency = op_start.elapsed();
            attempts += 1;

            match result {
                Ok(_) => self.counters.record_success(op_latency),
                Err(e) => {
                    // A single failed read never ends the run.
                    self.counters.record_failure();
                    warn!(
                        worker = self.id,
                        item_id = %key.item_id,
                        partition_key = %key.partition_key,
                        error = %e,
                        "error reading item"
                    );
                }
            }
        }

        debug!(worker = self.id, attempts, "worker stopped");
    }
}

/// Drives point reads from a fixed pool of workers for a fixed duration.
///
/// # Example
///
/// ```no_run
/// # async fn example(container: std::sync::Arc<cosmos_bench::ContainerClient>) -> cosmos_bench::Result<()> {
/// use cosmos_bench::{LoadConfig, LoadGenerator};
///
/// let generator = LoadGenerator::new(LoadConfig::default())?;
/// let results = generator.run(container).await?;
/// println!("{}", results);
/// # Ok(())
/// # }
/// ```
pub struct LoadGenerator {
    config: LoadConfig,
    stop: Mutex<CancellationToken>,
}

impl LoadGenerator {
    /// Create a generator after validating `config`.
    pub fn new(config: LoadConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stop: Mutex::new(CancellationToken::new()),
        })
    }

    /// The configuration runs use.
    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    fn stop_slot(&self) -> MutexGuard<'_, CancellationToken> {
        self.stop.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Token that ends the current (or next) run early when cancelled.
    ///
    /// Workers notice it at their next iteration, like the deadline. Once a
    /// stopped run returns, the generator arms a fresh token, so a token
    /// taken before that point has no effect on later runs.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop_slot().clone()
    }

    /// Request an early stop of the current run.
    pub fn stop(&self) {
        self.stop_slot().cancel();
    }

    /// Generate load for the configured duration.
    pub async fn run(&self, container: Arc<ContainerClient>) -> Result<BenchmarkResults> {
        let deadline = Instant::now() + self.config.duration;
        self.run_until(container, deadline).await
    }

    /// Generate load until `deadline`.
    ///
    /// Returns once every worker has returned. Per-read failures are logged
    /// and counted but never abort the run; the only run-level failure is
    /// finishing with zero successful reads.
    pub async fn run_until(
        &self,
        container: Arc<ContainerClient>,
        deadline: Instant,
    ) -> Result<BenchmarkResults> {
        if container.is_closed() {
            return Err(Error::Closed);
        }

        let started = Instant::now();
        let counters = Arc::new(BenchmarkCounters::new());
        let stop = self.stop_token();
        let run = stop.child_token();

        info!(
            "Benchmark started at {} with {} workers",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            self.config.workers
        );

        let reporter = ProgressReporter::new(
            counters.clone(),
            started,
            deadline.saturating_duration_since(started),
            self.config.progress_interval,
        )?
        .spawn(run.clone());

        let workers: Vec<_> = (0..self.config.workers)
            .map(|id| {
                let ctx = WorkerContext {
                    id,
                    rng: StdRng::seed_from_u64(WorkerContext::seed(id)),
                    container: container.clone(),
                    counters: counters.clone(),
                    item_count: self.config.item_count,
                    partition_count: self.config.partition_count,
                    deadline,
                    stop: run.clone(),
                };
                tokio::task::spawn_blocking(move || ctx.run())
            })
            .collect();

        tokio::select! {
            _ = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {}
            _ = run.cancelled() => {
                info!("stop requested, waiting for in-flight reads");
            }
        }
        run.cancel();

        for worker in workers {
            if let Err(e) = worker.await {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic());
                }
            }
        }
        if let Err(e) = reporter.await {
            debug!(error = %e, "progress reporter ended abnormally");
        }

        // A stop only ever applies to the run it was issued for.
        if stop.is_cancelled() {
            let mut slot = self.stop_slot();
            if slot.is_cancelled() {
                *slot = CancellationToken::new();
            }
        }

        let elapsed = started.elapsed();
        BenchmarkResults::from_counters(counters.snapshot(), elapsed)
    }
}
