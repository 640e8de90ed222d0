//! Native render session bridge for the imgsdk image-editing engine.
//!
//! This crate provides:
//! - Effect command parsing (two accepted text syntaxes, one canonical form)
//! - Ownership and lifecycle of the native engine handle
//! - The render session state machine with per-session worker execution
//! - Optional surface binding driven by windowing-system signals
//! - An exactly-once completion channel back to the caller
//!
//! The pixel processing itself lives in the external engine library; this
//! crate is the lifecycle and concurrency envelope around it.

pub mod command;
pub mod completion;
pub mod engine;
pub mod error;
pub mod session;
pub mod surface;

pub use command::{Effect, EffectCommand};
pub use completion::{Completion, CompletionQueue, CorrelationToken, OnEditComplete};
pub use engine::{Engine, EngineHandle, EngineLibrary, NativeEngine, init_global_library};
pub use error::{Error, Result};
pub use session::{PendingEdit, RenderSession, SessionOptions, SessionState};
pub use surface::{PixelFormat, SurfaceBinding, SurfaceSpec};
