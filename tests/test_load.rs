//! Load generator tests.
//!
//! These drive real worker pools against the simulated library, so they take
//! a few hundred milliseconds each.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cosmos_bench::sim::{Dataset, SimulatedApi, SimulatedConfig};
use cosmos_bench::{ContainerClient, CosmosClient, DatabaseClient, Error, LoadConfig, LoadGenerator};

fn open(api: &Arc<SimulatedApi>) -> (CosmosClient, DatabaseClient, ContainerClient) {
    let client = CosmosClient::with_key(api.clone(), "https://localhost:8080", "test-key")
        .expect("client should open");
    let database = client
        .database_client("sdk-bench-db")
        .expect("database should open");
    let container = database
        .container_client("RandomDocs")
        .expect("container should open");
    (client, database, container)
}

fn load_config(workers: usize, duration: Duration) -> LoadConfig {
    LoadConfig {
        item_count: 10_000,
        partition_count: 10,
        workers,
        duration,
        progress_interval: Duration::from_millis(50),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_counts_every_successful_read() {
    let api = Arc::new(SimulatedApi::new(SimulatedConfig {
        read_latency: Duration::from_millis(1),
        dataset: Some(Dataset {
            item_count: 10_000,
            partition_count: 10,
        }),
        ..Default::default()
    }));
    let (_client, _database, container) = open(&api);

    let generator = LoadGenerator::new(load_config(4, Duration::from_millis(200))).unwrap();
    let results = generator
        .run(Arc::new(container))
        .await
        .expect("run should complete");

    let stats = api.stats();
    assert!(results.total_ops > 0);
    // Every generated key exists in the data set.
    assert_eq!(results.failed_ops, 0);
    assert_eq!(results.total_ops, stats.reads);
    assert!(results.latency_ms >= 1.0, "latency {}", results.latency_ms);
    assert!(results.ops_per_second > 0.0);
    assert_eq!(stats.live_strings, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failures_do_not_abort_the_run() {
    let api = Arc::new(SimulatedApi::new(SimulatedConfig {
        read_latency: Duration::from_micros(200),
        fail_every: Some(5),
        ..Default::default()
    }));
    let (_client, _database, container) = open(&api);

    let duration = Duration::from_millis(250);
    let generator = LoadGenerator::new(load_config(3, duration)).unwrap();
    let results = generator
        .run(Arc::new(container))
        .await
        .expect("run should complete despite failures");

    let attempts = api.stats().reads;
    assert!(attempts >= 5, "only {} attempts", attempts);
    assert_eq!(results.total_ops, attempts - attempts / 5);
    assert_eq!(results.failed_ops, attempts / 5);
    assert!(
        results.elapsed + Duration::from_millis(10) >= duration,
        "run ended early: {:?}",
        results.elapsed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_deadline_overshoot_is_bounded() {
    let latency = Duration::from_millis(100);
    let duration = Duration::from_millis(300);
    let api = Arc::new(SimulatedApi::new(SimulatedConfig {
        read_latency: latency,
        ..Default::default()
    }));
    let (_client, _database, container) = open(&api);

    let generator = LoadGenerator::new(load_config(4, duration)).unwrap();
    let begin = Instant::now();
    let deadline = begin + duration;
    let results = generator
        .run_until(Arc::new(container), deadline)
        .await
        .expect("run should complete");
    let wall = begin.elapsed();

    // Scheduling slack on top of deadline + one read.
    let slack = Duration::from_millis(150);
    assert!(wall <= duration + latency + slack, "run took {:?}", wall);
    assert!(results.elapsed <= duration + latency + slack);

    // Nothing new starts once the deadline has passed; the only reads
    // entering the library near it are ones whose iteration began before.
    let last = api.stats().last_read_started.expect("reads happened");
    assert!(
        last < deadline + latency / 2,
        "read started {:?} after the deadline",
        last.saturating_duration_since(deadline)
    );
    assert_eq!(api.in_flight_reads(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_token_ends_run_early() {
    let api = Arc::new(SimulatedApi::new(SimulatedConfig {
        read_latency: Duration::from_millis(2),
        ..Default::default()
    }));
    let (_client, _database, container) = open(&api);

    let generator = LoadGenerator::new(load_config(2, Duration::from_secs(60))).unwrap();
    let stop = generator.stop_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        stop.cancel();
    });

    let begin = Instant::now();
    let results = generator
        .run(Arc::new(container))
        .await
        .expect("run should complete");

    assert!(begin.elapsed() < Duration::from_secs(5));
    assert!(results.total_ops > 0);
    assert_eq!(api.in_flight_reads(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zero_successes_fail_the_run() {
    let api = Arc::new(SimulatedApi::new(SimulatedConfig {
        read_latency: Duration::from_micros(500),
        fail_every: Some(1),
        ..Default::default()
    }));
    let (_client, _database, container) = open(&api);

    let generator = LoadGenerator::new(load_config(2, Duration::from_millis(100))).unwrap();
    let result = generator.run(Arc::new(container)).await;

    assert!(matches!(result, Err(Error::NoOperationsCompleted)), "got {:?}", result);
    assert!(api.stats().failed_reads > 0);
}

#[tokio::test]
async fn test_closed_container_is_rejected() {
    let api = Arc::new(SimulatedApi::new(SimulatedConfig::default()));
    let (_client, _database, mut container) = open(&api);
    container.close();

    let generator = LoadGenerator::new(load_config(2, Duration::from_millis(50))).unwrap();
    let result = generator.run(Arc::new(container)).await;

    assert!(matches!(result, Err(Error::Closed)), "got {:?}", result);
    assert_eq!(api.stats().reads, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_container_released_once_after_run() {
    let api = Arc::new(SimulatedApi::new(SimulatedConfig {
        read_latency: Duration::from_millis(1),
        ..Default::default()
    }));
    let (mut client, mut database, container) = open(&api);

    let container = Arc::new(container);
    let generator = LoadGenerator::new(load_config(3, Duration::from_millis(100))).unwrap();
    generator
        .run(container.clone())
        .await
        .expect("run should complete");

    let mut container = Arc::try_unwrap(container).expect("workers have released the container");
    container.close();
    database.close();
    client.close();
    drop(container);

    let stats = api.stats();
    assert_eq!(stats.containers_released, 1);
    assert_eq!(stats.databases_released, 1);
    assert_eq!(stats.clients_released, 1);
    assert_eq!(stats.double_releases, 0);
    assert_eq!(stats.live_handles, 0);
    assert_eq!(stats.live_strings, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_applies_only_to_current_run() {
    let api = Arc::new(SimulatedApi::new(SimulatedConfig {
        read_latency: Duration::from_millis(1),
        ..Default::default()
    }));
    let (_client, _database, container) = open(&api);
    let container = Arc::new(container);

    let generator = LoadGenerator::new(load_config(2, Duration::from_secs(60))).unwrap();
    let stop = generator.stop_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.cancel();
    });
    let first = generator
        .run(container.clone())
        .await
        .expect("stopped run should still report");
    assert!(first.total_ops > 0);
    assert!(!generator.stop_token().is_cancelled());

    let reads_before = api.stats().reads;
    let second = generator
        .run_until(container.clone(), Instant::now() + Duration::from_millis(150))
        .await
        .expect("second run should complete reads");
    assert!(second.total_ops > 0);
    assert!(api.stats().reads > reads_before);

    // Stopping through the generator works for later runs too.
    generator.stop();
    let third = generator
        .run_until(container.clone(), Instant::now() + Duration::from_secs(60))
        .await;
    assert!(matches!(third, Err(Error::NoOperationsCompleted)), "got {:?}", third);
    assert!(!generator.stop_token().is_cancelled());
}
