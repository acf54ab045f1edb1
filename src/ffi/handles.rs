//! Handle types for opaque references to native client objects.
//!
//! Each handle type is a transparent newtype around the raw pointer so the
//! three kinds of handle cannot be mixed up at a call site.

use super::raw::{RawClient, RawContainer, RawDatabase};

/// Macro to define a handle type.
macro_rules! define_handle {
    ($name:ident, $target:ty) => {
        /// Opaque handle to a native client object.
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name {
            ptr: *mut $target,
        }

        impl $name {
            /// Create an invalid (null) handle.
            #[inline]
            pub const fn invalid() -> Self {
                Self {
                    ptr: std::ptr::null_mut(),
                }
            }

            /// Wrap a raw pointer produced by the library.
            #[inline]
            pub const fn from_raw(ptr: *mut $target) -> Self {
                Self { ptr }
            }

            /// The raw pointer.
            #[inline]
            pub const fn as_ptr(&self) -> *mut $target {
                self.ptr
            }

            /// Check if this handle is valid (non-null).
            #[inline]
            pub fn is_valid(&self) -> bool {
                !self.ptr.is_null()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::invalid()
            }
        }
    };
}

define_handle!(ClientHandle, RawClient);
define_handle!(DatabaseHandle, RawDatabase);
define_handle!(ContainerHandle, RawContainer);
