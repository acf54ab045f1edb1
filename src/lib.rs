//! Point-read benchmarking for Azure Cosmos DB through its native client
//! library.
//!
//! The crate has two halves. The handle layer ([`CosmosClient`],
//! [`DatabaseClient`], [`ContainerClient`]) owns handles created by the
//! native library and guarantees each is released exactly once, either by
//! an explicit `close` or on drop. The load generator ([`LoadGenerator`])
//! drives concurrent point reads against one container until a deadline and
//! reduces the outcome to [`BenchmarkResults`].
//!
//! The native library sits behind the [`NativeApi`] trait. With the `native`
//! feature the crate links libazurecosmos; [`sim::SimulatedApi`] is an
//! in-process stand-in that needs no database.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cosmos_bench::sim::{SimulatedApi, SimulatedConfig};
//! use cosmos_bench::{CosmosClient, LoadConfig, LoadGenerator};
//!
//! #[tokio::main]
//! async fn main() -> cosmos_bench::Result<()> {
//!     let api = Arc::new(SimulatedApi::new(SimulatedConfig::default()));
//!
//!     let mut client = CosmosClient::with_key(api, "https://localhost:8080", "key")?;
//!     let mut database = client.database_client("sdk-bench-db")?;
//!     let container = Arc::new(database.container_client("RandomDocs")?);
//!
//!     let generator = LoadGenerator::new(LoadConfig::default())?;
//!     let results = generator.run(container.clone()).await?;
//!     println!("{}", results);
//!
//!     // Children first, then the client.
//!     drop(container);
//!     database.close();
//!     client.close();
//!     Ok(())
//! }
//! ```

pub mod bench;
pub mod client;
pub mod config;
pub mod container;
pub mod database;
pub mod error;
mod ffi;
pub mod progress;
pub mod results;
pub mod sim;
pub mod types;

// Re-export main types at the crate root
pub use bench::{ItemKey, LoadGenerator};
pub use client::CosmosClient;
pub use config::{ConnectionConfig, LoadConfig};
pub use container::ContainerClient;
pub use database::DatabaseClient;
pub use error::{Error, Result};
#[cfg(feature = "native")]
pub use ffi::LinkedApi;
pub use ffi::NativeApi;
pub use ffi::error::translate as translate_status;
pub use progress::{ProgressReporter, ProgressSample};
pub use results::{BenchmarkCounters, BenchmarkResults, CounterSnapshot};
pub use types::RandomDocsItem;

/// Status codes reported by the native library.
pub mod status {
    pub use crate::ffi::raw::{
        COSMOS_ERROR_CODE_CONNECTION_FAILED as CONNECTION_FAILED,
        COSMOS_ERROR_CODE_INVALID_ARGUMENT as INVALID_ARGUMENT,
        COSMOS_ERROR_CODE_INVALID_HANDLE as INVALID_HANDLE,
        COSMOS_ERROR_CODE_NOT_FOUND as NOT_FOUND, COSMOS_ERROR_CODE_SUCCESS as SUCCESS,
        COSMOS_ERROR_CODE_UNKNOWN as UNKNOWN,
    };
}
