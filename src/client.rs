//! Account-level client, the root of the handle chain.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::database::DatabaseClient;
use crate::error::{Error, Result};
use crate::ffi::strings::to_cstring;
use crate::ffi::{self, check_error, ClientHandle, DatabaseHandle, NativeApi};

/// A connection to a Cosmos DB account.
///
/// Owns one native client handle. The handle is released by [`close`] or,
/// if `close` was never called, when the client is dropped.
///
/// Database clients opened from this client are independent: closing the
/// client does not close them, and they should be closed first.
///
/// [`close`]: CosmosClient::close
///
/// # Example
///
/// ```no_run
/// # #[cfg(feature = "native")]
/// # fn main() -> cosmos_bench::Result<()> {
/// use cosmos_bench::CosmosClient;
///
/// let mut client = CosmosClient::connect("https://localhost:8080", "key")?;
/// let mut database = client.database_client("sdk-bench-db")?;
/// database.close();
/// client.close();
/// # Ok(())
/// # }
/// # #[cfg(not(feature = "native"))]
/// # fn main() {}
/// ```
pub struct CosmosClient {
    api: Arc<dyn NativeApi>,
    handle: ClientHandle,
}

impl CosmosClient {
    /// Create a client authenticated with an account key.
    pub fn with_key(api: Arc<dyn NativeApi>, endpoint: &str, key: &str) -> Result<Self> {
        let endpoint_c = to_cstring("endpoint", endpoint)?;
        let key_c = to_cstring("key", key)?;

        unsafe {
            let mut handle = ClientHandle::invalid();
            let mut err = ffi::CosmosError::default();

            let code = api.client_create_with_key(
                endpoint_c.as_ptr(),
                key_c.as_ptr(),
                &mut handle,
                &mut err,
            );
            // Owned before the status is checked, so a handle written
            // alongside an error is still released.
            let client = Self { api, handle };
            check_error(client.api.as_ref(), code, &mut err)?;

            if client.is_closed() {
                return Err(Error::NullResponse);
            }

            debug!(endpoint, "opened client handle");
            Ok(client)
        }
    }

    /// Create a client against the linked native library.
    #[cfg(feature = "native")]
    pub fn connect(endpoint: &str, key: &str) -> Result<Self> {
        Self::with_key(Arc::new(ffi::LinkedApi), endpoint, key)
    }

    /// Open a handle to a database in this account.
    pub fn database_client(&self, database_id: &str) -> Result<DatabaseClient> {
        if !self.handle.is_valid() {
            return Err(Error::Closed);
        }

        let database_id_c = to_cstring("database id", database_id)?;

        unsafe {
            let mut database = DatabaseHandle::invalid();
            let mut err = ffi::CosmosError::default();

            let code = self.api.client_database_client(
                self.handle,
                database_id_c.as_ptr(),
                &mut database,
                &mut err,
            );
            let database = DatabaseClient::from_handle(self.api.clone(), database, database_id);
            check_error(self.api.as_ref(), code, &mut err)?;
            database.opened()
        }
    }

    /// Check if the client has been closed.
    pub fn is_closed(&self) -> bool {
        !self.handle.is_valid()
    }

    /// Release the native client.
    ///
    /// Safe to call more than once; only the first call reaches the library.
    pub fn close(&mut self) {
        if !self.handle.is_valid() {
            return;
        }

        let handle = std::mem::replace(&mut self.handle, ClientHandle::invalid());
        unsafe {
            self.api.client_free(handle);
        }
        debug!("released client handle");
    }
}

impl Drop for CosmosClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for CosmosClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosmosClient")
            .field("closed", &self.is_closed())
            .finish()
    }
}

// CosmosClient is not Clone - each client owns its handle
// The native client is internally synchronized
unsafe impl Send for CosmosClient {}
unsafe impl Sync for CosmosClient {}
