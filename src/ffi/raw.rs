//! Raw C function bindings for libazurecosmos.
//!
//! This module contains the direct FFI bindings to the C API.
//! Users should prefer the safe Rust wrappers in the parent modules.

use std::os::raw::{c_char, c_int};

#[cfg(feature = "native")]
use super::handles::*;

/// Error code returned by C functions.
pub type CosmosErrorCode = c_int;

// Error codes
pub const COSMOS_ERROR_CODE_SUCCESS: CosmosErrorCode = 0;
pub const COSMOS_ERROR_CODE_INVALID_ARGUMENT: CosmosErrorCode = 1;
pub const COSMOS_ERROR_CODE_CONNECTION_FAILED: CosmosErrorCode = 2;
pub const COSMOS_ERROR_CODE_NOT_FOUND: CosmosErrorCode = 3;
pub const COSMOS_ERROR_CODE_INVALID_HANDLE: CosmosErrorCode = 4;
pub const COSMOS_ERROR_CODE_UNKNOWN: CosmosErrorCode = 999;

/// C error structure.
///
/// `message` is allocated by the library and must be handed back to
/// `cosmos_string_free` by whoever made the call that filled it in.
#[repr(C)]
pub struct CosmosError {
    pub code: CosmosErrorCode,
    pub message: *mut c_char,
}

impl Default for CosmosError {
    fn default() -> Self {
        Self {
            code: COSMOS_ERROR_CODE_SUCCESS,
            message: std::ptr::null_mut(),
        }
    }
}

/// Opaque `struct cosmos_client`.
#[repr(C)]
pub struct RawClient {
    _private: [u8; 0],
}

/// Opaque `struct cosmos_database_client`.
#[repr(C)]
pub struct RawDatabase {
    _private: [u8; 0],
}

/// Opaque `struct cosmos_container_client`.
#[repr(C)]
pub struct RawContainer {
    _private: [u8; 0],
}

#[cfg(feature = "native")]
extern "C" {
    // ========================================================================
    // Client
    // ========================================================================

    pub fn cosmos_client_create_with_key(
        endpoint: *const c_char,
        key: *const c_char,
        out_client: *mut ClientHandle,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode;

    pub fn cosmos_client_free(client: ClientHandle);

    pub fn cosmos_client_database_client(
        client: ClientHandle,
        database_id: *const c_char,
        out_database: *mut DatabaseHandle,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode;

    // ========================================================================
    // Database
    // ========================================================================

    pub fn cosmos_database_free(database: DatabaseHandle);

    pub fn cosmos_database_container_client(
        database: DatabaseHandle,
        container_id: *const c_char,
        out_container: *mut ContainerHandle,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode;

    // ========================================================================
    // Container
    // ========================================================================

    pub fn cosmos_container_free(container: ContainerHandle);

    pub fn cosmos_container_read_item(
        container: ContainerHandle,
        partition_key: *const c_char,
        item_id: *const c_char,
        out_json: *mut *mut c_char,
        out_error: *mut CosmosError,
    ) -> CosmosErrorCode;

    // ========================================================================
    // Memory
    // ========================================================================

    pub fn cosmos_string_free(s: *mut c_char);
}
