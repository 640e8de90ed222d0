//! Surface bindings: the optional association between a session and a
//! drawable target.
//!
//! Binding lifetime is driven entirely by the surrounding windowing system
//! through three signals — available, changed, destroyed — forwarded into
//! the owning [`RenderSession`](crate::session::RenderSession). The session
//! reacts; it never creates or destroys a surface on its own initiative.

use serde::Serialize;

/// Pixel format of a drawable target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum PixelFormat {
    /// 32-bit RGBA.
    Rgba8888 = 0,
    /// 24-bit RGB.
    Rgb888 = 1,
    /// 8-bit grayscale.
    Gray8 = 2,
}

/// Dimensions and format reported by a surface signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSpec {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// One attached drawable target.
///
/// At most one exists per session. Dropping the binding does not touch the
/// engine; the session issues the unbind call itself while it still holds
/// the engine handle.
#[derive(Debug)]
pub struct SurfaceBinding {
    width: u32,
    height: u32,
    format: PixelFormat,
    swap_count: u64,
}

impl SurfaceBinding {
    /// Create a binding sized to the reported dimensions.
    pub(crate) fn new(spec: SurfaceSpec) -> Self {
        Self {
            width: spec.width,
            height: spec.height,
            format: spec.format,
            swap_count: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Number of buffer swaps performed against this binding.
    pub fn swap_count(&self) -> u64 {
        self.swap_count
    }

    /// Adopt new dimensions from a surface-changed signal.
    pub(crate) fn resize(&mut self, spec: SurfaceSpec) {
        self.width = spec.width;
        self.height = spec.height;
        self.format = spec.format;
    }

    /// Record one back/front buffer exchange.
    pub(crate) fn record_swap(&mut self) {
        self.swap_count += 1;
    }
}
