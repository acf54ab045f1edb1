//! Error conversion utilities for FFI.

use std::ffi::CStr;

use super::api::NativeApi;
use super::raw::{CosmosError, CosmosErrorCode, COSMOS_ERROR_CODE_SUCCESS};
use super::strings::ForeignString;
use crate::error::Error;

/// Convert a status code and optional message to a Rust error.
///
/// Returns `None` for the success code whatever the message says. The
/// message is only borrowed; releasing it is up to the caller.
pub fn translate(code: CosmosErrorCode, message: Option<&CStr>) -> Option<Error> {
    if code == COSMOS_ERROR_CODE_SUCCESS {
        return None;
    }

    let message = message
        .map(|m| m.to_string_lossy().into_owned())
        .unwrap_or_default();

    Some(Error::Foreign { code, message })
}

/// Check a status code and convert to Result.
///
/// Any message the library wrote into `err` is released through `api`
/// before returning, on success and failure alike.
///
/// # Safety
///
/// `err.message` must be null or a string allocated by `api` for this call.
pub unsafe fn check_error(
    api: &dyn NativeApi,
    code: CosmosErrorCode,
    err: &mut CosmosError,
) -> crate::Result<()> {
    let message = ForeignString::from_raw(api, std::mem::replace(&mut err.message, std::ptr::null_mut()));

    match translate(code, message.as_ref().map(|m| m.as_c_str())) {
        None => Ok(()),
        Some(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::raw::COSMOS_ERROR_CODE_NOT_FOUND;
    use crate::sim::{SimulatedApi, SimulatedConfig};

    #[test]
    fn test_translate_success_ignores_message() {
        let msg = CStr::from_bytes_with_nul(b"stale text\0").unwrap();
        assert!(translate(COSMOS_ERROR_CODE_SUCCESS, Some(msg)).is_none());
        assert!(translate(COSMOS_ERROR_CODE_SUCCESS, None).is_none());
    }

    #[test]
    fn test_translate_null_message_is_empty() {
        match translate(COSMOS_ERROR_CODE_NOT_FOUND, None) {
            Some(Error::Foreign { code, message }) => {
                assert_eq!(code, COSMOS_ERROR_CODE_NOT_FOUND);
                assert_eq!(message, "");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_translate_copies_message() {
        let msg = CStr::from_bytes_with_nul(b"item not found\0").unwrap();
        let err = translate(7, Some(msg)).expect("error");
        assert_eq!(err.to_string(), "cosmos error 7: item not found");
    }

    #[test]
    fn test_check_error_releases_message() {
        let sim = SimulatedApi::new(SimulatedConfig::default());
        let mut err = CosmosError {
            code: COSMOS_ERROR_CODE_NOT_FOUND,
            message: sim.alloc_string("missing"),
        };

        let result = unsafe { check_error(&sim, COSMOS_ERROR_CODE_NOT_FOUND, &mut err) };
        assert!(matches!(result, Err(Error::Foreign { ref message, .. }) if message == "missing"));
        assert!(err.message.is_null());

        let stats = sim.stats();
        assert_eq!(stats.strings_released, 1);
        assert_eq!(stats.live_strings, 0);
    }

    #[test]
    fn test_check_error_releases_message_on_success() {
        let sim = SimulatedApi::new(SimulatedConfig::default());
        let mut err = CosmosError {
            code: COSMOS_ERROR_CODE_SUCCESS,
            message: sim.alloc_string("informational"),
        };

        let result = unsafe { check_error(&sim, COSMOS_ERROR_CODE_SUCCESS, &mut err) };
        assert!(result.is_ok());
        assert_eq!(sim.stats().live_strings, 0);
    }
}
