//! Command-line interface for cosmos-bench
//!
//! # Usage Examples
//!
//! ```bash
//! # Point reads against the local emulator through libazurecosmos
//! cosmos-bench point-read --item-count 10000 --partition-count 10 --duration 60
//!
//! # Dry run against the in-process simulated library
//! cosmos-bench --backend simulated point-read --duration 10 --sim-latency-ms 2
//! ```
//!
//! Exit codes: 0 on a completed run, 1 when the client, database or
//! container cannot be opened, 2 when the run finished without a single
//! successful read.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use cosmos_bench::config::{DEFAULT_CONTAINER, DEFAULT_DATABASE, DEFAULT_ENDPOINT, EMULATOR_KEY};
use cosmos_bench::sim::{Dataset, SetupStage, SimulatedApi, SimulatedConfig};
use cosmos_bench::{
    BenchmarkResults, ConnectionConfig, CosmosClient, Error, LoadConfig, LoadGenerator, NativeApi,
};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "cosmos-bench")]
#[command(about = "Benchmarks for the Cosmos DB native client library")]
struct Cli {
    /// Cosmos DB endpoint URL
    #[arg(short = 'e', long, env = "COSMOS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Cosmos DB primary key
    #[arg(short = 'k', long, env = "COSMOS_KEY", default_value = EMULATOR_KEY, hide_default_value = true)]
    key: String,

    /// Benchmarking database name
    #[arg(short = 'd', long, env = "COSMOS_DATABASE", default_value = DEFAULT_DATABASE)]
    database: String,

    /// Native library to drive
    #[arg(long, value_enum, default_value_t = Backend::default())]
    backend: Backend,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Benchmark point read operations against a container
    PointRead {
        /// Total number of items in the container
        #[arg(short = 'i', long, default_value_t = 10_000)]
        item_count: u64,

        /// Duration to run the benchmark (in seconds)
        #[arg(short = 't', long = "duration", default_value_t = 60)]
        duration_seconds: u64,

        /// Number of partitions the items are distributed across
        #[arg(short = 'p', long, default_value_t = 10)]
        partition_count: u64,

        /// Number of concurrent workers
        #[arg(short = 'w', long, default_value_t = num_cpus::get())]
        workers: usize,

        /// Container name
        #[arg(short = 'c', long, default_value = DEFAULT_CONTAINER)]
        container: String,

        /// Seconds between progress lines
        #[arg(long, default_value_t = 5)]
        progress_interval: u64,

        /// Output format for the results
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        #[command(flatten)]
        sim: SimArgs,
    },
}

/// Knobs for `--backend simulated`.
#[derive(clap::Args)]
struct SimArgs {
    /// Simulated per-read latency in milliseconds
    #[arg(long, default_value_t = 1)]
    sim_latency_ms: u64,

    /// Make every Nth simulated read fail
    #[arg(long)]
    sim_fail_every: Option<u64>,

    /// Make the simulated library fail while opening this handle
    #[arg(long, value_enum)]
    sim_fail_setup: Option<SimSetupStage>,
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum Backend {
    /// libazurecosmos linked at build time (requires the `native` feature)
    #[cfg_attr(feature = "native", default)]
    Native,
    /// In-process simulated library
    #[cfg_attr(not(feature = "native"), default)]
    Simulated,
}

#[derive(Clone, Copy, ValueEnum)]
enum SimSetupStage {
    Client,
    Database,
    Container,
}

impl From<SimSetupStage> for SetupStage {
    fn from(stage: SimSetupStage) -> Self {
        match stage {
            SimSetupStage::Client => SetupStage::Client,
            SimSetupStage::Database => SetupStage::Database,
            SimSetupStage::Container => SetupStage::Container,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::PointRead {
            item_count,
            duration_seconds,
            partition_count,
            workers,
            container,
            progress_interval,
            format,
            sim,
        } => {
            let connection = ConnectionConfig {
                endpoint: cli.endpoint,
                key: cli.key,
                database: cli.database,
                container,
            };
            let load = LoadConfig {
                item_count,
                partition_count,
                workers,
                duration: Duration::from_secs(duration_seconds),
                progress_interval: Duration::from_secs(progress_interval),
            };

            run_point_read(cli.backend, connection, load, format, sim).await
        }
    }
}

async fn run_point_read(
    backend: Backend,
    connection: ConnectionConfig,
    load: LoadConfig,
    format: OutputFormat,
    sim: SimArgs,
) -> ExitCode {
    let generator = match LoadGenerator::new(load.clone()) {
        Ok(g) => g,
        Err(e) => {
            error!("invalid benchmark configuration: {}", e);
            return ExitCode::from(1);
        }
    };

    let api = match native_api(backend, &load, sim) {
        Ok(api) => api,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(1);
        }
    };

    // Setup failures abort before any worker starts.
    let (mut client, mut database, container) = match open_container(api, &connection) {
        Ok(handles) => handles,
        Err(e) => {
            error!("setup failed: {:#}", e);
            return ExitCode::from(1);
        }
    };

    info!("Starting point read benchmark...");
    info!("Item count: {}", load.item_count);
    info!("Duration: {}s", load.duration.as_secs());
    info!("Partition count: {}", load.partition_count);
    info!("Workers: {}", load.workers);
    info!("Container: {}", connection.container);

    let stop = generator.stop_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after in-flight reads");
            stop.cancel();
        }
    });

    let container = Arc::new(container);
    let outcome = generator.run(container.clone()).await;

    // Children before parents.
    if let Ok(mut container) = Arc::try_unwrap(container) {
        container.close();
    }
    database.close();
    client.close();

    match outcome {
        Ok(results) => {
            print_results(&results, format);
            ExitCode::SUCCESS
        }
        Err(Error::NoOperationsCompleted) => {
            error!("benchmark failed: no operations completed");
            ExitCode::from(2)
        }
        Err(e) => {
            error!("benchmark failed: {}", e);
            ExitCode::from(1)
        }
    }
}

fn native_api(backend: Backend, load: &LoadConfig, sim: SimArgs) -> anyhow::Result<Arc<dyn NativeApi>> {
    match backend {
        Backend::Simulated => {
            let config = SimulatedConfig {
                read_latency: Duration::from_millis(sim.sim_latency_ms),
                fail_every: sim.sim_fail_every,
                null_payload: false,
                fail_setup: sim.sim_fail_setup.map(SetupStage::from),
                handle_on_error: false,
                null_handle: None,
                dataset: Some(Dataset {
                    item_count: load.item_count,
                    partition_count: load.partition_count,
                }),
            };
            Ok(Arc::new(SimulatedApi::new(config)))
        }
        #[cfg(feature = "native")]
        Backend::Native => Ok(Arc::new(cosmos_bench::LinkedApi)),
        #[cfg(not(feature = "native"))]
        Backend::Native => {
            anyhow::bail!("this build has no native library; rebuild with --features native or use --backend simulated")
        }
    }
}

fn open_container(
    api: Arc<dyn NativeApi>,
    connection: &ConnectionConfig,
) -> anyhow::Result<(CosmosClient, cosmos_bench::DatabaseClient, cosmos_bench::ContainerClient)> {
    let client = CosmosClient::with_key(api, &connection.endpoint, &connection.key)
        .with_context(|| format!("failed to create Cosmos client for {}", connection.endpoint))?;
    let database = client
        .database_client(&connection.database)
        .with_context(|| format!("failed to get database client {}", connection.database))?;
    let container = database
        .container_client(&connection.container)
        .with_context(|| format!("failed to get container client {}", connection.container))?;
    Ok((client, database, container))
}

fn print_results(results: &BenchmarkResults, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", results);
        }
        OutputFormat::Json => match serde_json::to_string_pretty(results) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("failed to serialize results: {}", e),
        },
        OutputFormat::Markdown => {
            println!();
            println!("=== Markdown Table (Point Read Benchmark) ===");
            println!("{}", results.markdown_table("Rust FFI"));
            println!("============================================");
        }
    }
}
