//! Moving text across the boundary.
//!
//! Text going in is copied into a `CString` that lives for the duration of
//! the call. Text coming out was allocated by the library's allocator, so it
//! is copied and handed back through `string_free`, never `free`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use super::api::NativeApi;
use crate::error::{Error, Result};

/// Copy `value` into a NUL-terminated buffer for a single call.
///
/// `what` names the argument in the error when `value` holds a NUL byte.
pub(crate) fn to_cstring(what: &str, value: &str) -> Result<CString> {
    CString::new(value)
        .map_err(|_| Error::InvalidArgument(format!("{} contains a NUL byte", what)))
}

/// A NUL-terminated buffer owned by the native library.
///
/// Released through the library exactly once, when dropped.
pub(crate) struct ForeignString<'a> {
    api: &'a dyn NativeApi,
    ptr: *mut c_char,
}

impl<'a> ForeignString<'a> {
    /// Take ownership of a library-allocated buffer. Returns `None` for null.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a valid NUL-terminated buffer allocated by
    /// `api` that nothing else will release.
    pub(crate) unsafe fn from_raw(api: &'a dyn NativeApi, ptr: *mut c_char) -> Option<Self> {
        if ptr.is_null() {
            None
        } else {
            Some(Self { api, ptr })
        }
    }

    pub(crate) fn as_c_str(&self) -> &CStr {
        unsafe { CStr::from_ptr(self.ptr) }
    }

    /// Copy the bytes into a managed string; the buffer is released on return.
    pub(crate) fn into_string(self) -> String {
        self.as_c_str().to_string_lossy().into_owned()
    }
}

impl Drop for ForeignString<'_> {
    fn drop(&mut self) {
        unsafe {
            self.api.string_free(self.ptr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedApi, SimulatedConfig};

    #[test]
    fn test_to_cstring_rejects_nul() {
        let err = to_cstring("item id", "item\0").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(ref m) if m.contains("item id")));
        assert_eq!(to_cstring("item id", "item1").unwrap().as_bytes(), b"item1");
    }

    #[test]
    fn test_foreign_string_released_once() {
        let sim = SimulatedApi::new(SimulatedConfig::default());
        let ptr = sim.alloc_string("{\"id\":\"item1\"}");

        let s = unsafe { ForeignString::from_raw(&sim, ptr) }.expect("non-null");
        assert_eq!(s.into_string(), "{\"id\":\"item1\"}");

        let stats = sim.stats();
        assert_eq!(stats.strings_allocated, 1);
        assert_eq!(stats.strings_released, 1);
        assert_eq!(stats.double_releases, 0);
    }

    #[test]
    fn test_foreign_string_null_is_none() {
        let sim = SimulatedApi::new(SimulatedConfig::default());
        assert!(unsafe { ForeignString::from_raw(&sim, std::ptr::null_mut()) }.is_none());
        assert_eq!(sim.stats().strings_released, 0);
    }
}
