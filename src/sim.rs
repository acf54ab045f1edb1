//! An in-process stand-in for the native client library.
//!
//! [`SimulatedApi`] implements [`NativeApi`] with real heap allocations for
//! handles and C strings, so the wrappers run through exactly the same
//! pointer handling as against libazurecosmos. It tracks every live
//! allocation, counts every call, and refuses (and counts) releases of
//! anything it does not consider live instead of freeing it twice.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cosmos_bench::sim::{SimulatedApi, SimulatedConfig};
//! use cosmos_bench::CosmosClient;
//!
//! let sim = Arc::new(SimulatedApi::new(SimulatedConfig::default()));
//! let client = CosmosClient::with_key(sim.clone(), "https://localhost:8080", "key")?;
//! let database = client.database_client("sdk-bench-db")?;
//! let container = database.container_client("RandomDocs")?;
//! let body = container.read_item("item1", "partition1")?;
//! assert!(body.contains("\"id\":\"item1\""));
//! # Ok::<(), cosmos_bench::Error>(())
//! ```

use std::collections::{HashMap, HashSet};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::bench::ItemKey;
use crate::ffi::{
    ClientHandle, ContainerHandle, CosmosError, CosmosErrorCode, DatabaseHandle, NativeApi,
    COSMOS_ERROR_CODE_CONNECTION_FAILED, COSMOS_ERROR_CODE_INVALID_ARGUMENT,
    COSMOS_ERROR_CODE_INVALID_HANDLE, COSMOS_ERROR_CODE_NOT_FOUND, COSMOS_ERROR_CODE_SUCCESS,
    COSMOS_ERROR_CODE_UNKNOWN,
};
use crate::types::RandomDocsItem;

/// Setup step at which the simulated library can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStage {
    Client,
    Database,
    Container,
}

/// Shape of the data set the simulated container holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dataset {
    pub item_count: u64,
    pub partition_count: u64,
}

/// Behaviour of a [`SimulatedApi`].
#[derive(Debug, Clone, Default)]
pub struct SimulatedConfig {
    /// Time each read blocks for.
    pub read_latency: Duration,
    /// Fail every Kth read (counted across all callers).
    pub fail_every: Option<u64>,
    /// Report success on reads but return no document.
    pub null_payload: bool,
    /// Fail the given setup step.
    pub fail_setup: Option<SetupStage>,
    /// Along with a `fail_setup` error, still write a live handle.
    pub handle_on_error: bool,
    /// Report success on the given setup step without writing a handle.
    pub null_handle: Option<SetupStage>,
    /// When set, reads of ids outside the data set fail with not-found.
    pub dataset: Option<Dataset>,
}

/// Snapshot of the calls a [`SimulatedApi`] has seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatedStats {
    pub clients_created: u64,
    pub clients_released: u64,
    pub databases_created: u64,
    pub databases_released: u64,
    pub containers_created: u64,
    pub containers_released: u64,
    pub reads: u64,
    pub failed_reads: u64,
    pub strings_allocated: u64,
    pub strings_released: u64,
    /// Releases of a handle or string that was not live.
    pub double_releases: u64,
    pub live_handles: usize,
    pub live_strings: usize,
    /// When the most recent read call entered the library.
    pub last_read_started: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Client,
    Database,
    Container,
}

struct SimClient {
    endpoint: String,
}

struct SimDatabase {
    id: String,
}

struct SimContainer {
    database: String,
    id: String,
}

#[derive(Default)]
struct Counters {
    clients_created: AtomicU64,
    clients_released: AtomicU64,
    databases_created: AtomicU64,
    databases_released: AtomicU64,
    containers_created: AtomicU64,
    containers_released: AtomicU64,
    reads: AtomicU64,
    failed_reads: AtomicU64,
    strings_allocated: AtomicU64,
    strings_released: AtomicU64,
    double_releases: AtomicU64,
}

/// Simulated native client library.
pub struct SimulatedApi {
    config: SimulatedConfig,
    counters: Counters,
    handles: Mutex<HashMap<usize, Kind>>,
    strings: Mutex<HashSet<usize>>,
    created_at: Instant,
    // Nanoseconds after `created_at`, plus one so zero means "never".
    last_read_offset_ns: AtomicU64,
    in_flight_reads: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimulatedApi {
    /// Create a simulated library with the given behaviour.
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            counters: Counters::default(),
            handles: Mutex::new(HashMap::new()),
            strings: Mutex::new(HashSet::new()),
            created_at: Instant::now(),
            last_read_offset_ns: AtomicU64::new(0),
            in_flight_reads: AtomicUsize::new(0),
        }
    }

    /// The behaviour this instance was created with.
    pub fn config(&self) -> &SimulatedConfig {
        &self.config
    }

    /// Reads currently blocked inside the library.
    pub fn in_flight_reads(&self) -> usize {
        self.in_flight_reads.load(Ordering::SeqCst)
    }

    /// Snapshot every counter.
    pub fn stats(&self) -> SimulatedStats {
        let c = &self.counters;
        let offset = self.last_read_offset_ns.load(Ordering::SeqCst);

        SimulatedStats {
            clients_created: c.clients_created.load(Ordering::SeqCst),
            clients_released: c.clients_released.load(Ordering::SeqCst),
            databases_created: c.databases_created.load(Ordering::SeqCst),
            databases_released: c.databases_released.load(Ordering::SeqCst),
            containers_created: c.containers_created.load(Ordering::SeqCst),
            containers_released: c.containers_released.load(Ordering::SeqCst),
            reads: c.reads.load(Ordering::SeqCst),
            failed_reads: c.failed_reads.load(Ordering::SeqCst),
            strings_allocated: c.strings_allocated.load(Ordering::SeqCst),
            strings_released: c.strings_released.load(Ordering::SeqCst),
            double_releases: c.double_releases.load(Ordering::SeqCst),
            live_handles: lock(&self.handles).len(),
            live_strings: lock(&self.strings).len(),
            last_read_started: (offset > 0)
                .then(|| self.created_at + Duration::from_nanos(offset - 1)),
        }
    }

    /// Allocate a C string the way the library does for its outputs.
    pub(crate) fn alloc_string(&self, s: &str) -> *mut c_char {
        let owned = CString::new(s.replace('\0', "")).unwrap_or_default();
        let ptr = owned.into_raw();
        lock(&self.strings).insert(ptr as usize);
        self.counters.strings_allocated.fetch_add(1, Ordering::SeqCst);
        ptr
    }

    fn register<T>(&self, kind: Kind, value: T) -> *mut T {
        let ptr = Box::into_raw(Box::new(value));
        lock(&self.handles).insert(ptr as usize, kind);
        ptr
    }

    /// Free a registered handle. Returns false if it was not live.
    unsafe fn release<T>(&self, kind: Kind, ptr: *mut T) -> bool {
        let mut handles = lock(&self.handles);
        match handles.get(&(ptr as usize)) {
            Some(k) if *k == kind => {
                handles.remove(&(ptr as usize));
                drop(handles);
                drop(Box::from_raw(ptr));
                true
            }
            _ => {
                self.counters.double_releases.fetch_add(1, Ordering::SeqCst);
                false
            }
        }
    }

    /// Run `f` against a live handle, or `None` if it is not live.
    unsafe fn with_live<T, R>(&self, kind: Kind, ptr: *mut T, f: impl FnOnce(&T) -> R) -> Option<R> {
        let handles = lock(&self.handles);
        match handles.get(&(ptr as usize)) {
            Some(k) if *k == kind => Some(f(&*ptr)),
            _ => None,
        }
    }

    unsafe fn fail(
        &self,
        out_error: *mut CosmosError,
        code: CosmosErrorCode,
        message: &str,
    ) -> CosmosErrorCode {
        if !out_error.is_null() {
            (*out_error).code = code;
            (*out_error).message = self.alloc_string(message);
        }
        code
    }

    fn should_fail(&self, stage: SetupStage) -> bool {
        self.config.fail_setup == Some(stage)
    }

    fn null_handle(&self, stage: SetupStage) -> bool {
        self.config.null_handle == Some(stage)
    }

    fn mark_read_started(&self) {
        let offset = self.created_at.elapsed().as_nanos() as u64 + 1;
        self.last_read_offset_ns.fetch_max(offset, Ordering::SeqCst);
    }
}

unsafe fn arg<'a>(ptr: *const c_char) -> Option<std::borrow::Cow<'a, str>> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy())
    }
}

fn random_number(item_id: &str) -> i32 {
    item_id
        .bytes()
        .fold(17i32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as i32))
}

impl NativeApi for SimulatedApi {
    unsafe fn client_create_with_key(
        &self,
        endpoint: *const c_char,
        key: *const c_char,
        out_client: *mut ClientHandle,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode {
        let (endpoint, key) = match (arg(endpoint), arg(key)) {
            (Some(e), Some(k)) => (e.into_owned(), k),
            _ => return self.fail(out_error, COSMOS_ERROR_CODE_INVALID_ARGUMENT, "null argument"),
        };

        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return self.fail(
                out_error,
                COSMOS_ERROR_CODE_INVALID_ARGUMENT,
                &format!("invalid endpoint: {}", endpoint),
            );
        }
        if key.is_empty() {
            return self.fail(out_error, COSMOS_ERROR_CODE_INVALID_ARGUMENT, "empty key");
        }
        if self.null_handle(SetupStage::Client) {
            return COSMOS_ERROR_CODE_SUCCESS;
        }
        let failed = self.should_fail(SetupStage::Client);
        if !failed || self.config.handle_on_error {
            let ptr = self.register(Kind::Client, SimClient { endpoint: endpoint.clone() });
            *out_client = ClientHandle::from_raw(ptr.cast());
            self.counters.clients_created.fetch_add(1, Ordering::SeqCst);
        }
        if failed {
            return self.fail(
                out_error,
                COSMOS_ERROR_CODE_CONNECTION_FAILED,
                &format!("simulated connection failure to {}", endpoint),
            );
        }
        COSMOS_ERROR_CODE_SUCCESS
    }

    unsafe fn client_database_client(
        &self,
        client: ClientHandle,
        database_id: *const c_char,
        out_database: *mut DatabaseHandle,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode {
        let Some(database_id) = arg(database_id) else {
            return self.fail(out_error, COSMOS_ERROR_CODE_INVALID_ARGUMENT, "null database id");
        };
        let live = self.with_live(Kind::Client, client.as_ptr().cast::<SimClient>(), |c| {
            c.endpoint.clone()
        });
        let Some(endpoint) = live else {
            return self.fail(out_error, COSMOS_ERROR_CODE_INVALID_HANDLE, "invalid client handle");
        };
        if self.null_handle(SetupStage::Database) {
            return COSMOS_ERROR_CODE_SUCCESS;
        }
        let failed = self.should_fail(SetupStage::Database);
        if !failed || self.config.handle_on_error {
            let ptr = self.register(
                Kind::Database,
                SimDatabase {
                    id: database_id.to_string(),
                },
            );
            *out_database = DatabaseHandle::from_raw(ptr.cast());
            self.counters.databases_created.fetch_add(1, Ordering::SeqCst);
        }
        if failed {
            return self.fail(
                out_error,
                COSMOS_ERROR_CODE_NOT_FOUND,
                &format!("database {} not found at {}", database_id, endpoint),
            );
        }
        COSMOS_ERROR_CODE_SUCCESS
    }

    unsafe fn database_container_client(
        &self,
        database: DatabaseHandle,
        container_id: *const c_char,
        out_container: *mut ContainerHandle,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode {
        let Some(container_id) = arg(container_id) else {
            return self.fail(out_error, COSMOS_ERROR_CODE_INVALID_ARGUMENT, "null container id");
        };
        let live = self.with_live(Kind::Database, database.as_ptr().cast::<SimDatabase>(), |d| {
            d.id.clone()
        });
        let Some(database_id) = live else {
            return self.fail(out_error, COSMOS_ERROR_CODE_INVALID_HANDLE, "invalid database handle");
        };
        if self.null_handle(SetupStage::Container) {
            return COSMOS_ERROR_CODE_SUCCESS;
        }
        let failed = self.should_fail(SetupStage::Container);
        if failed && !self.config.handle_on_error {
            return self.fail(
                out_error,
                COSMOS_ERROR_CODE_NOT_FOUND,
                &format!("container {}/{} not found", database_id, container_id),
            );
        }

        let message = format!("container {}/{} not found", database_id, container_id);
        let ptr = self.register(
            Kind::Container,
            SimContainer {
                database: database_id,
                id: container_id.into_owned(),
            },
        );
        *out_container = ContainerHandle::from_raw(ptr.cast());
        self.counters.containers_created.fetch_add(1, Ordering::SeqCst);
        if failed {
            return self.fail(out_error, COSMOS_ERROR_CODE_NOT_FOUND, &message);
        }
        COSMOS_ERROR_CODE_SUCCESS
    }

    unsafe fn container_read_item(
        &self,
        container: ContainerHandle,
        partition_key: *const c_char,
        item_id: *const c_char,
        out_json: *mut *mut c_char,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode {
        self.mark_read_started();
        let n = self.counters.reads.fetch_add(1, Ordering::SeqCst) + 1;

        let live = self.with_live(Kind::Container, container.as_ptr().cast::<SimContainer>(), |c| {
            format!("{}/{}", c.database, c.id)
        });
        let Some(location) = live else {
            return self.fail(out_error, COSMOS_ERROR_CODE_INVALID_HANDLE, "invalid container handle");
        };
        let (partition_key, item_id) = match (arg(partition_key), arg(item_id)) {
            (Some(p), Some(i)) => (p.into_owned(), i.into_owned()),
            _ => return self.fail(out_error, COSMOS_ERROR_CODE_INVALID_ARGUMENT, "null argument"),
        };

        if !self.config.read_latency.is_zero() {
            self.in_flight_reads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.config.read_latency);
            self.in_flight_reads.fetch_sub(1, Ordering::SeqCst);
        }

        if let Some(k) = self.config.fail_every {
            if k > 0 && n % k == 0 {
                self.counters.failed_reads.fetch_add(1, Ordering::SeqCst);
                return self.fail(
                    out_error,
                    COSMOS_ERROR_CODE_UNKNOWN,
                    &format!("simulated failure on read {}", n),
                );
            }
        }

        if let Some(dataset) = self.config.dataset {
            let found = item_id
                .strip_prefix("item")
                .and_then(|n| n.parse::<u64>().ok())
                .filter(|&index| index < dataset.item_count)
                .and_then(|index| {
                    ItemKey::new(index, dataset.item_count, dataset.partition_count).ok()
                })
                .is_some_and(|key| key.partition_key == partition_key);
            if !found {
                self.counters.failed_reads.fetch_add(1, Ordering::SeqCst);
                return self.fail(
                    out_error,
                    COSMOS_ERROR_CODE_NOT_FOUND,
                    &format!("item {} not found in partition {}", item_id, partition_key),
                );
            }
        }

        if self.config.null_payload {
            *out_json = std::ptr::null_mut();
            return COSMOS_ERROR_CODE_SUCCESS;
        }

        let doc = RandomDocsItem {
            random_number: random_number(&item_id),
            data: location,
            id: item_id,
            partition_key,
        };
        match serde_json::to_string(&doc) {
            Ok(json) => {
                *out_json = self.alloc_string(&json);
                COSMOS_ERROR_CODE_SUCCESS
            }
            Err(e) => self.fail(out_error, COSMOS_ERROR_CODE_UNKNOWN, &e.to_string()),
        }
    }

    unsafe fn client_free(&self, client: ClientHandle) {
        if self.release(Kind::Client, client.as_ptr().cast::<SimClient>()) {
            self.counters.clients_released.fetch_add(1, Ordering::SeqCst);
        }
    }

    unsafe fn database_free(&self, database: DatabaseHandle) {
        if self.release(Kind::Database, database.as_ptr().cast::<SimDatabase>()) {
            self.counters.databases_released.fetch_add(1, Ordering::SeqCst);
        }
    }

    unsafe fn container_free(&self, container: ContainerHandle) {
        if self.release(Kind::Container, container.as_ptr().cast::<SimContainer>()) {
            self.counters.containers_released.fetch_add(1, Ordering::SeqCst);
        }
    }

    unsafe fn string_free(&self, s: *mut c_char) {
        if s.is_null() {
            return;
        }
        let live = lock(&self.strings).remove(&(s as usize));
        if live {
            drop(CString::from_raw(s));
            self.counters.strings_released.fetch_add(1, Ordering::SeqCst);
        } else {
            self.counters.double_releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for SimulatedApi {
    fn drop(&mut self) {
        // Reclaim anything a test leaked so the allocator stays balanced.
        let strings = std::mem::take(&mut *lock(&self.strings));
        for addr in strings {
            unsafe { drop(CString::from_raw(addr as *mut c_char)) };
        }
        let handles = std::mem::take(&mut *lock(&self.handles));
        for (addr, kind) in handles {
            unsafe {
                match kind {
                    Kind::Client => drop(Box::from_raw(addr as *mut SimClient)),
                    Kind::Database => drop(Box::from_raw(addr as *mut SimDatabase)),
                    Kind::Container => drop(Box::from_raw(addr as *mut SimContainer)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_of_unknown_handle_is_counted_not_freed() {
        let sim = SimulatedApi::new(SimulatedConfig::default());
        let bogus = ClientHandle::from_raw(0x1000 as *mut _);
        unsafe { sim.client_free(bogus) };

        let stats = sim.stats();
        assert_eq!(stats.double_releases, 1);
        assert_eq!(stats.clients_released, 0);
    }

    #[test]
    fn test_wrong_kind_release_is_rejected() {
        let sim = SimulatedApi::new(SimulatedConfig::default());
        let client = SimClient {
            endpoint: "https://localhost".into(),
        };
        let ptr = sim.register(Kind::Client, client);
        unsafe { sim.database_free(DatabaseHandle::from_raw(ptr.cast())) };

        let stats = sim.stats();
        assert_eq!(stats.double_releases, 1);
        assert_eq!(stats.live_handles, 1);
    }

    #[test]
    fn test_random_number_is_stable() {
        assert_eq!(random_number("item42"), random_number("item42"));
        assert_ne!(random_number("item42"), random_number("item43"));
    }
}
