//! The seam between the safe wrappers and a native client library.
//!
//! Every method mirrors one C entry point one-to-one, including the
//! out-parameter calling convention, so the wrappers exercise exactly the
//! same pointer and ownership discipline whichever implementation is behind
//! the trait object.

use std::os::raw::c_char;

use super::handles::{ClientHandle, ContainerHandle, DatabaseHandle};
use super::raw::{CosmosError, CosmosErrorCode};

/// Entry points of a Cosmos DB native client library.
///
/// # Safety
///
/// All methods follow C rules: string arguments must be valid NUL-terminated
/// strings for the duration of the call, out-pointers must be writable, and
/// every handle or string returned must be released exactly once through the
/// matching `*_free` method of the same implementation.
pub trait NativeApi: Send + Sync {
    /// `cosmos_client_create_with_key`
    unsafe fn client_create_with_key(
        &self,
        endpoint: *const c_char,
        key: *const c_char,
        out_client: *mut ClientHandle,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode;

    /// `cosmos_client_database_client`
    unsafe fn client_database_client(
        &self,
        client: ClientHandle,
        database_id: *const c_char,
        out_database: *mut DatabaseHandle,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode;

    /// `cosmos_database_container_client`
    unsafe fn database_container_client(
        &self,
        database: DatabaseHandle,
        container_id: *const c_char,
        out_container: *mut ContainerHandle,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode;

    /// `cosmos_container_read_item`
    unsafe fn container_read_item(
        &self,
        container: ContainerHandle,
        partition_key: *const c_char,
        item_id: *const c_char,
        out_json: *mut *mut c_char,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode;

    /// `cosmos_client_free`
    unsafe fn client_free(&self, client: ClientHandle);

    /// `cosmos_database_free`
    unsafe fn database_free(&self, database: DatabaseHandle);

    /// `cosmos_container_free`
    unsafe fn container_free(&self, container: ContainerHandle);

    /// `cosmos_string_free`
    unsafe fn string_free(&self, s: *mut c_char);
}

/// The library linked at build time.
#[cfg(feature = "native")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedApi;

#[cfg(feature = "native")]
impl NativeApi for LinkedApi {
    unsafe fn client_create_with_key(
        &self,
        endpoint: *const c_char,
        key: *const c_char,
        out_client: *mut ClientHandle,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode {
        super::raw::cosmos_client_create_with_key(endpoint, key, out_client, out_error)
    }

    unsafe fn client_database_client(
        &self,
        client: ClientHandle,
        database_id: *const c_char,
        out_database: *mut DatabaseHandle,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode {
        super::raw::cosmos_client_database_client(client, database_id, out_database, out_error)
    }

    unsafe fn database_container_client(
        &self,
        database: DatabaseHandle,
        container_id: *const c_char,
        out_container: *mut ContainerHandle,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode {
        super::raw::cosmos_database_container_client(database, container_id, out_container, out_error)
    }

    unsafe fn container_read_item(
        &self,
        container: ContainerHandle,
        partition_key: *const c_char,
        item_id: *const c_char,
        out_json: *mut *mut c_char,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode {
        super::raw::cosmos_container_read_item(container, partition_key, item_id, out_json, out_error)
    }

    unsafe fn client_free(&self, client: ClientHandle) {
        super::raw::cosmos_client_free(client)
    }

    unsafe fn database_free(&self, database: DatabaseHandle) {
        super::raw::cosmos_database_free(database)
    }

    unsafe fn container_free(&self, container: ContainerHandle) {
        super::raw::cosmos_container_free(container)
    }

    unsafe fn string_free(&self, s: *mut c_char) {
        super::raw::cosmos_string_free(s)
    }
}
