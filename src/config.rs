//! Benchmark configuration.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Well-known Cosmos DB Emulator key, not a secret.
pub const EMULATOR_KEY: &str =
    "C2y6yDjf5/R+ob0N8A7Cgv30VRDJIWEHLM+4QDU5DE2nQ9nDuVTqobD4b8mGGyPMbIZnqyMsEcaGQy67XIw/Jw==";

/// Endpoint of a locally running emulator.
pub const DEFAULT_ENDPOINT: &str = "https://localhost:8080";

/// Database the data-loading tooling creates.
pub const DEFAULT_DATABASE: &str = "sdk-bench-db";

/// Container the data-loading tooling fills.
pub const DEFAULT_CONTAINER: &str = "RandomDocs";

/// Where to connect and what to read from.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub endpoint: String,
    pub key: String,
    pub database: String,
    pub container: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            key: EMULATOR_KEY.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            container: DEFAULT_CONTAINER.to_string(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("endpoint", &self.endpoint)
            .field("key", &"<redacted>")
            .field("database", &self.database)
            .field("container", &self.container)
            .finish()
    }
}

/// Shape of a point-read run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConfig {
    /// Number of items in the container (`item0` .. `item{n-1}`).
    pub item_count: u64,
    /// Number of partitions the items are spread across.
    pub partition_count: u64,
    /// Number of concurrent workers.
    pub workers: usize,
    /// How long to generate load for.
    pub duration: Duration,
    /// How often to report progress.
    pub progress_interval: Duration,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            item_count: 10_000,
            partition_count: 10,
            workers: num_cpus::get(),
            duration: Duration::from_secs(60),
            progress_interval: Duration::from_secs(5),
        }
    }
}

impl LoadConfig {
    /// Reject values that would make a run meaningless or panic.
    pub fn validate(&self) -> Result<()> {
        if self.item_count == 0 {
            return Err(Error::InvalidArgument("item count must be at least 1".into()));
        }
        if self.partition_count == 0 {
            return Err(Error::InvalidArgument(
                "partition count must be at least 1".into(),
            ));
        }
        if self.workers == 0 {
            return Err(Error::InvalidArgument("workers must be at least 1".into()));
        }
        if self.duration.is_zero() {
            return Err(Error::InvalidArgument("duration must be positive".into()));
        }
        if self.progress_interval.is_zero() {
            return Err(Error::InvalidArgument(
                "progress interval must be positive".into(),
            ));
        }
        Ok(())
    }
}
