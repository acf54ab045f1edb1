//! Container-level client and point reads.

use std::fmt;
use std::os::raw::c_char;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ffi::strings::{to_cstring, ForeignString};
use crate::ffi::{self, check_error, ContainerHandle, NativeApi};

/// A handle to one container, opened with [`DatabaseClient::container_client`].
///
/// Reads take `&self`, so one container can be shared by many threads
/// through an `Arc`. Closing takes `&mut self`, which the borrow checker
/// only grants once every other reference is gone; a container cannot be
/// released while a read on it is in flight.
///
/// [`DatabaseClient::container_client`]: crate::DatabaseClient::container_client
pub struct ContainerClient {
    api: Arc<dyn NativeApi>,
    handle: ContainerHandle,
    id: String,
}

impl ContainerClient {
    /// Take ownership of a handle the library just wrote, before its status
    /// is checked.
    ///
    /// # Safety
    ///
    /// The handle must have been produced by `api` (or be invalid) and not be
    /// owned by another ContainerClient.
    pub(crate) unsafe fn from_handle(api: Arc<dyn NativeApi>, handle: ContainerHandle, id: &str) -> Self {
        Self {
            api,
            handle,
            id: id.to_string(),
        }
    }

    /// Finish opening: a success status with no handle is a broken response.
    pub(crate) fn opened(self) -> Result<Self> {
        if self.is_closed() {
            return Err(Error::NullResponse);
        }
        debug!(container = %self.id, "opened container handle");
        Ok(self)
    }

    /// The container id this handle was opened for.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read one item by id and partition key, returning its JSON body.
    ///
    /// Neither argument is checked for emptiness; the service decides.
    pub fn read_item(&self, item_id: &str, partition_key: &str) -> Result<String> {
        if !self.handle.is_valid() {
            return Err(Error::Closed);
        }

        let item_id_c = to_cstring("item id", item_id)?;
        let partition_key_c = to_cstring("partition key", partition_key)?;

        unsafe {
            let mut out_json: *mut c_char = std::ptr::null_mut();
            let mut err = ffi::CosmosError::default();

            let code = self.api.container_read_item(
                self.handle,
                partition_key_c.as_ptr(),
                item_id_c.as_ptr(),
                &mut out_json,
                &mut err,
            );
            let body = ForeignString::from_raw(self.api.as_ref(), out_json);
            check_error(self.api.as_ref(), code, &mut err)?;

            // Success with no body breaks the library's contract.
            match body {
                Some(body) => Ok(body.into_string()),
                None => Err(Error::NullResponse),
            }
        }
    }

    /// Read one item and deserialize it.
    pub fn read_item_as<T: DeserializeOwned>(&self, item_id: &str, partition_key: &str) -> Result<T> {
        let body = self.read_item(item_id, partition_key)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Check if the container handle has been closed.
    pub fn is_closed(&self) -> bool {
        !self.handle.is_valid()
    }

    /// Release the native container handle. Idempotent.
    pub fn close(&mut self) {
        if !self.handle.is_valid() {
            return;
        }

        let handle = std::mem::replace(&mut self.handle, ContainerHandle::invalid());
        unsafe {
            self.api.container_free(handle);
        }
        debug!(container = %self.id, "released container handle");
    }
}

impl Drop for ContainerClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ContainerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerClient")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

unsafe impl Send for ContainerClient {}
unsafe impl Sync for ContainerClient {}
