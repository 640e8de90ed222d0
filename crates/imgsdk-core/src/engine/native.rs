//! Production [`Engine`] implementation over the loaded dynamic library.

use std::ffi::CString;
use std::path::Path;
use std::sync::Arc;

use crate::command::EffectCommand;
use crate::error::{Error, Result};
use crate::surface::PixelFormat;

use super::ffi::EngineStatus;
use super::handle::EngineHandle;
use super::library::{EngineLibrary, init_global_library};
use super::Engine;

/// Engine backed by the native library's C entry points.
///
/// Cheap to clone conceptually (wrap it in an `Arc<dyn Engine>`); all calls
/// forward to function pointers resolved at library load.
pub struct NativeEngine {
    lib: Arc<EngineLibrary>,
}

impl NativeEngine {
    /// Build an engine over an already loaded library.
    pub fn new(lib: Arc<EngineLibrary>) -> Self {
        Self { lib }
    }

    /// Build an engine over the process-wide library, loading it on first
    /// use (from `path`, or the default search path when `None`).
    pub fn global(path: Option<&Path>) -> Result<Self> {
        Ok(Self::new(init_global_library(path)?))
    }
}

/// Marshal a path as a NUL-terminated C string.
fn c_path(path: &Path) -> Result<CString> {
    let text = path
        .to_str()
        .ok_or_else(|| Error::Execution(format!("path {} is not valid UTF-8", path.display())))?;
    CString::new(text).map_err(|_| Error::Execution(format!("path {text:?} contains NUL")))
}

impl Engine for NativeEngine {
    fn init(&self) -> Result<EngineHandle> {
        // SAFETY: entry point resolved against the ABI in `ffi`.
        let raw = unsafe { (self.lib.init)() };
        EngineHandle::from_raw(raw)
            .ok_or_else(|| Error::EngineInit("engine returned a null handle".into()))
    }

    fn bind_surface(
        &self,
        handle: &EngineHandle,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<()> {
        // SAFETY: handle is live for the duration of the borrow.
        let status = unsafe { (self.lib.bind_window)(handle.raw(), width, height, format as i32) };
        EngineStatus::from(status).into_result("bind_surface")
    }

    fn resize_surface(
        &self,
        handle: &EngineHandle,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<()> {
        // SAFETY: as above.
        let status =
            unsafe { (self.lib.resize_window)(handle.raw(), width, height, format as i32) };
        EngineStatus::from(status).into_result("resize_surface")
    }

    fn unbind_surface(&self, handle: &EngineHandle) {
        // SAFETY: as above.
        unsafe { (self.lib.unbind_window)(handle.raw()) };
    }

    fn swap_buffers(&self, handle: &EngineHandle) {
        // SAFETY: as above.
        unsafe { (self.lib.swap_buffers)(handle.raw()) };
    }

    fn redraw(&self, handle: &EngineHandle) -> Result<()> {
        // SAFETY: as above.
        let status = unsafe { (self.lib.redraw)(handle.raw()) };
        EngineStatus::from(status).into_result("redraw")
    }

    fn execute(
        &self,
        handle: &EngineHandle,
        command: &EffectCommand,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        let input = c_path(input)?;
        let output = c_path(output)?;
        let cmd_json = serde_json::to_string(command.effect())
            .map_err(|e| Error::Execution(format!("command serialization failed: {e}")))?;
        let cmd = CString::new(cmd_json)
            .map_err(|_| Error::Execution("command contains NUL".into()))?;

        tracing::debug!(command = %command, "Dispatching edit to native engine");

        // SAFETY: the strings outlive each call and the engine does not
        // retain the pointers past the call, per the ABI contract.
        unsafe {
            let raw = handle.raw();
            EngineStatus::from((self.lib.set_input_path)(raw, input.as_ptr()))
                .into_result("set_input_path")?;
            EngineStatus::from((self.lib.set_output_path)(raw, output.as_ptr()))
                .into_result("set_output_path")?;
            EngineStatus::from((self.lib.set_effect_cmd)(raw, cmd.as_ptr()))
                .into_result("set_effect_cmd")?;
            EngineStatus::from((self.lib.execute_cmd)(raw)).into_result("execute_cmd")?;
        }

        Ok(())
    }

    fn teardown(&self, handle: EngineHandle) {
        tracing::debug!(?handle, "Releasing engine instance");
        // SAFETY: `handle` is consumed by this call, so the raw token is
        // passed to the free entry point exactly once.
        unsafe { (self.lib.free)(handle.raw()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_path_rejects_interior_nul() {
        let path = Path::new("/tmp/a\0b.png");
        assert!(c_path(path).is_err());
    }

    #[test]
    fn c_path_accepts_ordinary_paths() {
        let c = c_path(Path::new("/tmp/input.png")).unwrap();
        assert_eq!(c.to_str().unwrap(), "/tmp/input.png");
    }
}
