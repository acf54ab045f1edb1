//! FFI bindings to libazurecosmos.
//!
//! This module contains low-level C bindings. Users should prefer the
//! safe Rust wrappers in the parent modules.

pub mod api;
pub mod error;
pub mod handles;
pub mod raw;
pub mod strings;

pub use api::NativeApi;
#[cfg(feature = "native")]
pub use api::LinkedApi;
pub use error::check_error;
pub use handles::*;
pub use raw::*;
