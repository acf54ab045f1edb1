//! Shared run counters and the summary computed from them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};

/// Counters shared by every worker of a run.
///
/// Only ever added to. A new set is created for each run.
#[derive(Debug, Default)]
pub struct BenchmarkCounters {
    operations: AtomicU64,
    latency_ns: AtomicU64,
    failures: AtomicU64,
}

/// A point-in-time copy of [`BenchmarkCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub total_ops: u64,
    pub latency_ns: u64,
    pub failed_ops: u64,
}

impl BenchmarkCounters {
    /// Fresh counters, all zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one successful operation and its latency.
    pub fn record_success(&self, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.operations.fetch_add(1, Ordering::Relaxed);
        self.latency_ns.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Count one failed attempt.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Successful operations so far.
    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    /// Load all three counters.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            total_ops: self.operations.load(Ordering::Relaxed),
            latency_ns: self.latency_ns.load(Ordering::Relaxed),
            failed_ops: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Throughput and latency of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResults {
    pub total_ops: u64,
    pub failed_ops: u64,
    #[serde(skip)]
    pub elapsed: Duration,
    pub elapsed_time_ms: u64,
    pub ops_per_second: f64,
    pub latency_ms: f64,
}

impl BenchmarkResults {
    /// Reduce final counters to a summary.
    ///
    /// Fails with [`Error::NoOperationsCompleted`] when nothing succeeded,
    /// since there is no mean latency to report.
    pub fn from_counters(counters: CounterSnapshot, elapsed: Duration) -> Result<Self> {
        if counters.total_ops == 0 {
            return Err(Error::NoOperationsCompleted);
        }

        let total = counters.total_ops as f64;
        Ok(Self {
            total_ops: counters.total_ops,
            failed_ops: counters.failed_ops,
            elapsed,
            elapsed_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            ops_per_second: total / elapsed.as_secs_f64(),
            latency_ms: counters.latency_ns as f64 / total / 1e6,
        })
    }

    /// Render as a markdown table with a single row labelled `implementation`.
    pub fn markdown_table(&self, implementation: &str) -> String {
        format!(
            "| Implementation | Total Ops | Duration (ms) | Ops/sec | Latency (ms) |\n\
             |---------------|-----------|---------------|---------|--------------|\n\
             | {} | {} | {} | {:.2} | {:.2} |",
            implementation, self.total_ops, self.elapsed_time_ms, self.ops_per_second, self.latency_ms
        )
    }
}

impl fmt::Display for BenchmarkResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Total ops: {}", self.total_ops)?;
        writeln!(f, "Failed ops: {}", self.failed_ops)?;
        writeln!(f, "Total elapsed time: {}ms", self.elapsed_time_ms)?;
        writeln!(f, "Ops/sec: {:.2}", self.ops_per_second)?;
        writeln!(f, "Latency (mean): {:.2} ms", self.latency_ms)?;
        write!(f, "========================")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_operations_is_an_error() {
        let snapshot = CounterSnapshot {
            total_ops: 0,
            latency_ns: 0,
            failed_ops: 12,
        };
        let result = BenchmarkResults::from_counters(snapshot, Duration::from_secs(1));
        assert!(matches!(result, Err(Error::NoOperationsCompleted)));
    }

    #[test]
    fn test_mean_latency_exact() {
        let snapshot = CounterSnapshot {
            total_ops: 100,
            latency_ns: 100_000_000,
            failed_ops: 0,
        };
        let results = BenchmarkResults::from_counters(snapshot, Duration::from_secs(2)).unwrap();
        assert_eq!(results.latency_ms, 1.0);
        assert_eq!(results.ops_per_second, 50.0);
        assert_eq!(results.elapsed_time_ms, 2000);
    }

    #[test]
    fn test_counters_accumulate() {
        let counters = BenchmarkCounters::new();
        counters.record_success(Duration::from_millis(2));
        counters.record_success(Duration::from_millis(4));
        counters.record_failure();

        assert_eq!(
            counters.snapshot(),
            CounterSnapshot {
                total_ops: 2,
                latency_ns: 6_000_000,
                failed_ops: 1,
            }
        );
        assert_eq!(counters.operations(), 2);
    }

    #[test]
    fn test_results_render() {
        let snapshot = CounterSnapshot {
            total_ops: 10,
            latency_ns: 25_000_000,
            failed_ops: 1,
        };
        let results = BenchmarkResults::from_counters(snapshot, Duration::from_secs(1)).unwrap();

        let text = results.to_string();
        assert!(text.contains("Total ops: 10"));
        assert!(text.contains("Latency (mean): 2.50 ms"));

        let table = results.markdown_table("Rust FFI");
        assert!(table.ends_with("| Rust FFI | 10 | 1000 | 10.00 | 2.50 |"));

        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json["total_ops"], 10);
        assert_eq!(json["elapsed_time_ms"], 1000);
        assert!(json.get("elapsed").is_none());
    }
}
