//! Move-only ownership token for one native engine instance.

use std::num::NonZeroU64;

use super::ffi::RawHandle;

/// Owned token for one engine instance.
///
/// Deliberately neither `Clone` nor `Copy`: the owning session holds the
/// only value, and [`Engine::teardown`](super::Engine::teardown) consumes it
/// by move, so a second teardown does not typecheck. Components that need
/// read access during execution hold an `Arc<EngineHandle>` handed out by
/// the session, never a duplicated token.
///
/// There is no `Drop` impl. Releasing the underlying instance requires the
/// engine that minted the token, so a bare dropped handle leaks rather than
/// guessing at a free function.
pub struct EngineHandle {
    raw: NonZeroU64,
}

impl EngineHandle {
    /// Wrap a raw token minted by an engine's `init`. Zero signals a failed
    /// allocation and yields `None`.
    ///
    /// Only [`Engine`](super::Engine) implementations should call this;
    /// everything else receives handles, never creates them.
    pub fn from_raw(raw: RawHandle) -> Option<Self> {
        NonZeroU64::new(raw).map(|raw| Self { raw })
    }

    /// The raw token value, for passing back across the ABI.
    pub fn raw(&self) -> RawHandle {
        self.raw.get()
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EngineHandle({:#x})", self.raw)
    }
}
