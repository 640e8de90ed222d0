//! Loading and one-time initialization of the engine dynamic library.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use libloading::Library;

use crate::error::Result;

use super::ffi::{
    BindWindowFn, ExecuteCmdFn, FreeFn, InitFn, RedrawFn, ResizeWindowFn, SetEffectCmdFn,
    SetInputPathFn, SetOutputPathFn, SwapBuffersFn, UnbindWindowFn,
};

/// Base name of the engine library (`libimgsdk.so` / `imgsdk.dll` / ...).
const ENGINE_LIBRARY_NAME: &str = "imgsdk";

/// Process-wide engine library, loaded at most once.
static GLOBAL_LIBRARY: OnceLock<Arc<EngineLibrary>> = OnceLock::new();

/// A loaded engine library with all entry points resolved.
///
/// Resolution happens once at load time; a missing symbol fails the load
/// rather than a later call. The `Library` is retained for the lifetime of
/// this struct, which keeps the copied function pointers valid.
pub struct EngineLibrary {
    // Field order matters: the function pointers must never outlive the
    // library they point into, and drop order is declaration order.
    pub(super) init: InitFn,
    pub(super) free: FreeFn,
    pub(super) set_input_path: SetInputPathFn,
    pub(super) set_output_path: SetOutputPathFn,
    pub(super) set_effect_cmd: SetEffectCmdFn,
    pub(super) execute_cmd: ExecuteCmdFn,
    pub(super) bind_window: BindWindowFn,
    pub(super) resize_window: ResizeWindowFn,
    pub(super) unbind_window: UnbindWindowFn,
    pub(super) swap_buffers: SwapBuffersFn,
    pub(super) redraw: RedrawFn,
    _lib: Library,
}

impl EngineLibrary {
    /// Load the engine library from an explicit path.
    pub fn load(path: &Path) -> Result<Arc<Self>> {
        tracing::info!("Loading engine library from {}", path.display());
        // SAFETY: loading runs arbitrary library initializers; the engine
        // library is part of the deployment and trusted by contract.
        let lib = unsafe { Library::new(path)? };
        Self::resolve(lib)
    }

    /// Load the engine library by its platform-decorated default name,
    /// searching the system library path.
    pub fn load_default() -> Result<Arc<Self>> {
        let name = libloading::library_filename(ENGINE_LIBRARY_NAME);
        tracing::info!("Loading engine library {}", name.to_string_lossy());
        // SAFETY: see `load`.
        let lib = unsafe { Library::new(name)? };
        Self::resolve(lib)
    }

    fn resolve(lib: Library) -> Result<Arc<Self>> {
        // SAFETY: symbol types match the engine ABI declared in `ffi`.
        unsafe {
            let resolved = Self {
                init: *lib.get::<InitFn>(b"sdk_init\0")?,
                free: *lib.get::<FreeFn>(b"sdk_free\0")?,
                set_input_path: *lib.get::<SetInputPathFn>(b"sdk_set_input_path\0")?,
                set_output_path: *lib.get::<SetOutputPathFn>(b"sdk_set_output_path\0")?,
                set_effect_cmd: *lib.get::<SetEffectCmdFn>(b"sdk_set_effect_cmd\0")?,
                execute_cmd: *lib.get::<ExecuteCmdFn>(b"sdk_execute_cmd\0")?,
                bind_window: *lib.get::<BindWindowFn>(b"sdk_bind_window\0")?,
                resize_window: *lib.get::<ResizeWindowFn>(b"sdk_resize_window\0")?,
                unbind_window: *lib.get::<UnbindWindowFn>(b"sdk_unbind_window\0")?,
                swap_buffers: *lib.get::<SwapBuffersFn>(b"sdk_swap_buffers\0")?,
                redraw: *lib.get::<RedrawFn>(b"sdk_redraw\0")?,
                _lib: lib,
            };
            Ok(Arc::new(resolved))
        }
    }
}

/// Initialize the process-wide engine library, at most once.
///
/// The first call loads the library (from `path`, or the default search
/// path when `None`) and publishes it; every later call returns the already
/// loaded instance and ignores its argument. Sessions created through
/// [`NativeEngine::global`](super::NativeEngine::global) share this
/// instance. There is no teardown: the library stays mapped until process
/// exit.
pub fn init_global_library(path: Option<&Path>) -> Result<Arc<EngineLibrary>> {
    if let Some(lib) = GLOBAL_LIBRARY.get() {
        return Ok(lib.clone());
    }

    let lib = match path {
        Some(path) => EngineLibrary::load(path)?,
        None => EngineLibrary::load_default()?,
    };

    // A racing initializer may have won; keep whichever was published.
    Ok(GLOBAL_LIBRARY.get_or_init(|| lib).clone())
}
