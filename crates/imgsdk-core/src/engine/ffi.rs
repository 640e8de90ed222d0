//! C ABI definitions for the native engine library.
//!
//! This module defines the function pointer types resolved from the engine
//! dynamic library and the status codes they return.

use std::ffi::c_char;

use crate::error::{Error, Result};

/// Raw engine instance token as it crosses the ABI. Zero means allocation
/// failed; any other value is opaque.
pub type RawHandle = u64;

/// Status code returned by engine entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum EngineStatus {
    /// Operation succeeded.
    Ok = 0,
    /// A required pointer argument was null.
    NullPointer = -1,
    /// The input file does not exist.
    FileNotExist = -2,
    /// Parameters were rejected by the engine.
    InvalidParams = -3,
    /// The engine failed to allocate memory.
    AllocFailed = -4,
}

impl From<i32> for EngineStatus {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            -1 => Self::NullPointer,
            -2 => Self::FileNotExist,
            -3 => Self::InvalidParams,
            -4 => Self::AllocFailed,
            // Unknown codes treated as invalid parameters
            _ => Self::InvalidParams,
        }
    }
}

impl EngineStatus {
    /// Fold a status into a `Result`, attaching `context` on failure.
    pub fn into_result(self, context: &str) -> Result<()> {
        match self {
            Self::Ok => Ok(()),
            Self::NullPointer => Err(Error::Execution(format!("{context}: null pointer"))),
            Self::FileNotExist => Err(Error::Execution(format!("{context}: file not found"))),
            Self::InvalidParams => Err(Error::Execution(format!("{context}: invalid parameters"))),
            Self::AllocFailed => Err(Error::Execution(format!("{context}: allocation failed"))),
        }
    }
}

// =============================================================================
// Engine entry point types
// =============================================================================
//
// All path and command strings cross the ABI as NUL-terminated UTF-8. Entry
// points taking a handle never retain the string pointers past the call.

/// `sdk_init() -> handle` — allocate an instance, zero on failure.
pub type InitFn = unsafe extern "C" fn() -> RawHandle;

/// `sdk_free(handle)` — release an instance.
pub type FreeFn = unsafe extern "C" fn(RawHandle);

/// `sdk_set_input_path(handle, path) -> status`
pub type SetInputPathFn = unsafe extern "C" fn(RawHandle, *const c_char) -> i32;

/// `sdk_set_output_path(handle, path) -> status`
pub type SetOutputPathFn = unsafe extern "C" fn(RawHandle, *const c_char) -> i32;

/// `sdk_set_effect_cmd(handle, json) -> status`
pub type SetEffectCmdFn = unsafe extern "C" fn(RawHandle, *const c_char) -> i32;

/// `sdk_execute_cmd(handle) -> status` — blocking edit execution.
pub type ExecuteCmdFn = unsafe extern "C" fn(RawHandle) -> i32;

/// `sdk_bind_window(handle, width, height, format) -> status`
pub type BindWindowFn = unsafe extern "C" fn(RawHandle, u32, u32, i32) -> i32;

/// `sdk_resize_window(handle, width, height, format) -> status`
pub type ResizeWindowFn = unsafe extern "C" fn(RawHandle, u32, u32, i32) -> i32;

/// `sdk_unbind_window(handle)`
pub type UnbindWindowFn = unsafe extern "C" fn(RawHandle);

/// `sdk_swap_buffers(handle)` — exchange back and front buffers.
pub type SwapBuffersFn = unsafe extern "C" fn(RawHandle);

/// `sdk_redraw(handle) -> status` — repaint the bound window.
pub type RedrawFn = unsafe extern "C" fn(RawHandle) -> i32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_round_trip() {
        assert_eq!(EngineStatus::from(0), EngineStatus::Ok);
        assert_eq!(EngineStatus::from(-2), EngineStatus::FileNotExist);
        assert_eq!(EngineStatus::from(-4), EngineStatus::AllocFailed);
    }

    #[test]
    fn unknown_code_is_invalid_params() {
        assert_eq!(EngineStatus::from(42), EngineStatus::InvalidParams);
    }

    #[test]
    fn failure_status_carries_context() {
        let err = EngineStatus::FileNotExist.into_result("execute").unwrap_err();
        assert!(err.to_string().contains("execute"));
    }
}
