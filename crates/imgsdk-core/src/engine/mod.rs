//! The seam to the black-box native image-processing engine.
//!
//! # Architecture
//!
//! ```text
//! RenderSession
//!     │
//!     └── Arc<dyn Engine>
//!             │
//!             └── NativeEngine
//!                     │
//!                     └── EngineLibrary (dylib loaded via libloading)
//!                             │
//!                             └── C ABI entry points (engine::ffi)
//! ```
//!
//! The engine's pixel processing is opaque; this module only defines the
//! ownership and calling discipline around it. [`EngineHandle`] is the
//! move-only token for one engine instance, [`Engine`] is the trait the
//! session drives, and [`NativeEngine`] is the production implementation.
//! Tests substitute their own [`Engine`] and never touch a real library.

mod ffi;
mod handle;
mod library;
mod native;

use std::path::Path;

pub use ffi::{EngineStatus, RawHandle};
pub use handle::EngineHandle;
pub use library::{EngineLibrary, init_global_library};
pub use native::NativeEngine;

use crate::command::EffectCommand;
use crate::error::Result;
use crate::surface::PixelFormat;

/// Operations on one native engine instance.
///
/// All methods except [`Engine::init`] and [`Engine::teardown`] borrow the
/// handle; only `init` mints one and only `teardown` consumes one, so the
/// at-most-once teardown contract is enforced by move semantics.
///
/// Implementations must be safe to call from the session's worker thread.
pub trait Engine: Send + Sync + 'static {
    /// Allocate a new engine instance.
    fn init(&self) -> Result<EngineHandle>;

    /// Attach a drawable target to the instance.
    fn bind_surface(
        &self,
        handle: &EngineHandle,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<()>;

    /// Resize the attached drawable target.
    fn resize_surface(
        &self,
        handle: &EngineHandle,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<()>;

    /// Detach the drawable target. Must not fail: it runs in reaction to a
    /// windowing-system signal the session cannot refuse.
    fn unbind_surface(&self, handle: &EngineHandle);

    /// Exchange back and front buffers of the attached target.
    fn swap_buffers(&self, handle: &EngineHandle);

    /// Ask the instance to repaint the attached target.
    fn redraw(&self, handle: &EngineHandle) -> Result<()>;

    /// Run one edit: read `input`, apply `command`, write `output`.
    ///
    /// Blocking; invoked on the session worker, never on the caller thread.
    fn execute(
        &self,
        handle: &EngineHandle,
        command: &EffectCommand,
        input: &Path,
        output: &Path,
    ) -> Result<()>;

    /// Release the instance. Consumes the handle.
    fn teardown(&self, handle: EngineHandle);
}
