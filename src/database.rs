//! Database-level client.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::container::ContainerClient;
use crate::error::{Error, Result};
use crate::ffi::strings::to_cstring;
use crate::ffi::{self, check_error, ContainerHandle, DatabaseHandle, NativeApi};

/// A handle to one database, opened with [`CosmosClient::database_client`].
///
/// [`CosmosClient::database_client`]: crate::CosmosClient::database_client
pub struct DatabaseClient {
    api: Arc<dyn NativeApi>,
    handle: DatabaseHandle,
    id: String,
}

impl DatabaseClient {
    /// Take ownership of a handle the library just wrote, before its status
    /// is checked.
    ///
    /// # Safety
    ///
    /// The handle must have been produced by `api` (or be invalid) and not be
    /// owned by another DatabaseClient.
    pub(crate) unsafe fn from_handle(api: Arc<dyn NativeApi>, handle: DatabaseHandle, id: &str) -> Self {
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
        debug!(database = %self.id, "opened database handle");
        Ok(self)
    }

    /// The database id this handle was opened for.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Open a handle to a container in this database.
    pub fn container_client(&self, container_id: &str) -> Result<ContainerClient> {
        if !self.handle.is_valid() {
            return Err(Error::Closed);
        }

        let container_id_c = to_cstring("container id", container_id)?;

        unsafe {
            let mut container = ContainerHandle::invalid();
            let mut err = ffi::CosmosError::default();

            let code = self.api.database_container_client(
                self.handle,
                container_id_c.as_ptr(),
                &mut container,
                &mut err,
            );
            let container = ContainerClient::from_handle(self.api.clone(), container, container_id);
            check_error(self.api.as_ref(), code, &mut err)?;
            container.opened()
        }
    }

    /// Check if the database handle has been closed.
    pub fn is_closed(&self) -> bool {
        !self.handle.is_valid()
    }

    /// Release the native database handle. Idempotent.
    pub fn close(&mut self) {
        if !self.handle.is_valid() {
            return;
        }

        let handle = std::mem::replace(&mut self.handle, DatabaseHandle::invalid());
        unsafe {
            self.api.database_free(handle);
        }
        debug!(database = %self.id, "released database handle");
    }
}

impl Drop for DatabaseClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for DatabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseClient")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

unsafe impl Send for DatabaseClient {}
unsafe impl Sync for DatabaseClient {}
