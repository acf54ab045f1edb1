//! Error types for the cosmos-bench crate.

use thiserror::Error;

/// Result type alias for cosmos-bench operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for cosmos-bench operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The native library reported a non-success status.
    #[error("cosmos error {code}: {message}")]
    Foreign {
        /// Status code from the library.
        code: i32,
        /// Message from the library, empty when none was supplied.
        message: String,
    },

    /// Operation attempted on a handle that was already released.
    #[error("handle is closed")]
    Closed,

    /// The library reported success but returned a null document or handle.
    #[error("received null response from native library")]
    NullResponse,

    /// A benchmark run finished without a single successful operation.
    #[error("no operations completed")]
    NoOperationsCompleted,

    /// Function argument or configuration value is invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A document did not match the requested type.
    #[error("failed to deserialize document: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl Error {
    /// Check if this error came from the native library.
    pub fn is_foreign(&self) -> bool {
        matches!(self, Error::Foreign { .. })
    }

    /// Check if this is a closed-handle error.
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed)
    }

    /// The native status code, if any.
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Foreign { code, .. } => Some(*code),
            _ => None,
        }
    }
}
