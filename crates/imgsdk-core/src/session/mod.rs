//! Render sessions: the lifecycle state machine around one engine instance.
//!
//! # Architecture
//!
//! ```text
//! caller thread                windowing thread
//!     │                              │
//!     │ create / setters /           │ surface_available
//!     │ execute / invalidate /       │ surface_changed
//!     │ destroy                      │ surface_destroyed
//!     └──────────┬───────────────────┘
//!                │  (single session mutex)
//!          RenderSession ── job queue ──► worker thread
//!                ▲                            │
//!                └── completion callback ◄────┘
//! ```
//!
//! One mutex serializes every state-changing operation; the worker runs the
//! native call outside it. `destroy()` waits for the worker to quiesce and
//! joins it before the engine handle is released, so a completion can never
//! observe a freed handle.

mod worker;

use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, unbounded};

use crate::command::{self, EffectCommand};
use crate::completion::{CorrelationToken, OnEditComplete};
use crate::engine::{Engine, EngineHandle};
use crate::error::{Error, Result};
use crate::surface::{SurfaceBinding, SurfaceSpec};

use worker::{ExecuteJob, Job};

/// Lifecycle phase of a render session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No engine instance yet; only observable during construction.
    Unbound,
    /// Engine instance allocated, configuration incomplete.
    Bound,
    /// Input path, output path and effect command are all set.
    Configured,
    /// One edit is in flight on the worker.
    Executing,
    /// The most recent edit succeeded; the session is reusable.
    Completed,
    /// The most recent edit failed; the session is reusable.
    Failed,
    /// The engine handle has been released. Terminal.
    Destroyed,
}

/// An edit supplied at construction time, dispatched automatically as soon
/// as a surface is attached.
pub struct PendingEdit {
    /// Effect command spec, in either accepted syntax.
    pub spec: String,
    /// Input image path.
    pub input: PathBuf,
    /// Output image path.
    pub output: PathBuf,
    /// Completion listener for the deferred execution.
    pub listener: Arc<dyn OnEditComplete>,
    /// Correlation token echoed back with the completion.
    pub token: CorrelationToken,
}

/// Construction options for [`RenderSession::create`].
#[derive(Default)]
pub struct SessionOptions {
    /// Surface to bind immediately, if the windowing system already
    /// reported one. Headless sessions leave this `None`.
    pub surface: Option<SurfaceSpec>,
    /// Edit to dispatch once a surface is attached.
    pub pending: Option<PendingEdit>,
}

/// Mutable session state, guarded by the single session mutex.
struct State {
    phase: SessionState,
    /// Engine instance token. `Some` from successful init until destroy.
    /// Shared with the worker as a read capability during execution.
    handle: Option<Arc<EngineHandle>>,
    surface: Option<SurfaceBinding>,
    command: Option<EffectCommand>,
    input_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    /// True from `execute()` acceptance until the completion callback has
    /// returned and the worker dropped its handle capability.
    executing: bool,
    /// Bumped by `destroy()`; a completion whose snapshot no longer matches
    /// is reported as a destruction failure instead of a session outcome.
    generation: u64,
    /// Construction-time edit waiting for a surface.
    deferred: Option<(Arc<dyn OnEditComplete>, CorrelationToken)>,
}

impl State {
    fn ensure_live(&self) -> Result<()> {
        if self.phase == SessionState::Destroyed {
            return Err(Error::DestroyedSession);
        }
        Ok(())
    }

    fn ensure_not_executing(&self) -> Result<()> {
        if self.executing {
            return Err(Error::AlreadyExecuting);
        }
        Ok(())
    }

    /// Promote to `Configured` once all three pieces are present.
    fn refresh_configured(&mut self) {
        if self.command.is_some() && self.input_path.is_some() && self.output_path.is_some() {
            self.phase = SessionState::Configured;
        }
    }
}

/// State plus the condvar the worker uses to signal quiesce.
pub(crate) struct Shared {
    state: Mutex<State>,
    idle: Condvar,
}

impl Shared {
    /// Acquire the session mutex.
    ///
    /// A poisoned lock still holds consistent state (every critical section
    /// is a handful of field writes), and refusing to lock would make
    /// destroy impossible, so poisoning is folded away.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_idle(&self) {
        self.idle.notify_all();
    }

    /// Block until no execution is in flight. Re-checks after every wake.
    fn wait_idle<'a>(&'a self, mut guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        while guard.executing {
            guard = self
                .idle
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
        guard
    }
}

/// One bridge instance: owns one engine handle, at most one surface binding
/// and at most one in-flight execution.
///
/// All methods are callable from any thread; internally everything is
/// serialized through one mutex. Dropping the session destroys it.
pub struct RenderSession {
    engine: Arc<dyn Engine>,
    shared: Arc<Shared>,
    jobs: Sender<Job>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession").finish_non_exhaustive()
    }
}

impl RenderSession {
    /// Create a session: allocate an engine instance, spawn the worker, and
    /// apply `options` (immediate surface binding and/or a pending edit).
    ///
    /// Fails with [`Error::EngineInit`] when the engine cannot allocate.
    pub fn create(engine: Arc<dyn Engine>, options: SessionOptions) -> Result<Self> {
        let handle = engine.init()?;
        tracing::info!(?handle, "Render session created");

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                phase: SessionState::Unbound,
                handle: Some(Arc::new(handle)),
                surface: None,
                command: None,
                input_path: None,
                output_path: None,
                executing: false,
                generation: 0,
                deferred: None,
            }),
            idle: Condvar::new(),
        });

        let (jobs, job_rx) = unbounded();
        let worker = std::thread::Builder::new()
            .name("imgsdk-session".into())
            .spawn({
                let engine = engine.clone();
                let shared = shared.clone();
                move || worker::run(engine, shared, job_rx)
            })?;

        let session = Self {
            engine,
            shared,
            jobs,
            worker: Mutex::new(Some(worker)),
        };

        {
            let mut state = session.shared.lock();
            state.phase = SessionState::Bound;
        }

        if let Some(pending) = options.pending {
            session.set_input_path(pending.input)?;
            session.set_output_path(pending.output)?;
            session.set_effect_cmd(&pending.spec)?;
            session.shared.lock().deferred = Some((pending.listener, pending.token));
        }

        if let Some(spec) = options.surface {
            session.surface_available(spec)?;
        }

        Ok(session)
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> SessionState {
        self.shared.lock().phase
    }

    /// Whether a surface binding is currently attached.
    pub fn surface_bound(&self) -> bool {
        self.shared.lock().surface.is_some()
    }

    /// Buffer swaps performed against the current binding, if any.
    pub fn surface_swap_count(&self) -> Option<u64> {
        self.shared.lock().surface.as_ref().map(|s| s.swap_count())
    }

    /// Set the input image path. Rejected while an edit is in flight.
    pub fn set_input_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::NotConfigured("input path"));
        }
        let mut state = self.shared.lock();
        state.ensure_live()?;
        state.ensure_not_executing()?;
        state.input_path = Some(path);
        state.refresh_configured();
        Ok(())
    }

    /// Set the output image path. Rejected while an edit is in flight.
    pub fn set_output_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::NotConfigured("output path"));
        }
        let mut state = self.shared.lock();
        state.ensure_live()?;
        state.ensure_not_executing()?;
        state.output_path = Some(path);
        state.refresh_configured();
        Ok(())
    }

    /// Parse and accept an effect command spec (either syntax).
    ///
    /// On a parse failure the session state is left untouched.
    pub fn set_effect_cmd(&self, spec: &str) -> Result<()> {
        let command = command::parse(spec)?;
        let mut state = self.shared.lock();
        state.ensure_live()?;
        state.ensure_not_executing()?;
        tracing::debug!(%command, "Effect command accepted");
        state.command = Some(command);
        state.refresh_configured();
        Ok(())
    }

    /// Submit the configured edit for asynchronous execution.
    ///
    /// Returns immediately; the outcome arrives exactly once through
    /// `listener`, on the worker thread, with `token` echoed back. Fails
    /// synchronously with [`Error::NotConfigured`] or
    /// [`Error::AlreadyExecuting`] without starting work.
    pub fn execute(
        &self,
        listener: Arc<dyn OnEditComplete>,
        token: CorrelationToken,
    ) -> Result<()> {
        let job = {
            let mut state = self.shared.lock();
            state.ensure_live()?;
            state.ensure_not_executing()?;

            let command = state
                .command
                .clone()
                .ok_or(Error::NotConfigured("effect command"))?;
            let input = state
                .input_path
                .clone()
                .ok_or(Error::NotConfigured("input path"))?;
            let output = state
                .output_path
                .clone()
                .ok_or(Error::NotConfigured("output path"))?;
            let handle = state.handle.clone().ok_or(Error::DestroyedSession)?;

            state.executing = true;
            state.phase = SessionState::Executing;

            ExecuteJob {
                generation: state.generation,
                handle,
                command,
                input,
                output,
                listener,
                token,
            }
        };

        tracing::debug!(%job.command, "Edit submitted");

        if self.jobs.send(Job::Execute(job)).is_err() {
            // Worker gone; only possible once destruction has begun.
            let mut state = self.shared.lock();
            state.executing = false;
            self.shared.notify_idle();
            return Err(Error::DestroyedSession);
        }
        Ok(())
    }

    /// Request a redraw: swap buffers, then signal the engine to repaint.
    ///
    /// A no-op (not an error) when no surface is attached.
    pub fn invalidate(&self) -> Result<()> {
        let mut state = self.shared.lock();
        state.ensure_live()?;
        let Some(handle) = state.handle.clone() else {
            return Err(Error::DestroyedSession);
        };
        match state.surface.as_mut() {
            None => {
                tracing::trace!("invalidate with no surface attached; ignoring");
                Ok(())
            }
            Some(binding) => {
                self.engine.swap_buffers(&handle);
                binding.record_swap();
                self.engine.redraw(&handle)
            }
        }
    }

    /// Windowing-system signal: a surface is ready.
    ///
    /// Attaches a binding sized to `spec` and dispatches the
    /// construction-time pending edit, if one is waiting and the session is
    /// fully configured.
    pub fn surface_available(&self, spec: SurfaceSpec) -> Result<()> {
        let deferred = {
            let mut state = self.shared.lock();
            state.ensure_live()?;
            let handle = state.handle.clone().ok_or(Error::DestroyedSession)?;

            self.engine
                .bind_surface(&handle, spec.width, spec.height, spec.format)?;
            if state.surface.is_some() {
                tracing::debug!("Replacing existing surface binding");
            }
            state.surface = Some(SurfaceBinding::new(spec));
            tracing::info!(
                width = spec.width,
                height = spec.height,
                "Surface attached"
            );
            state.deferred.take()
        };

        if let Some((listener, token)) = deferred {
            self.execute(listener, token)?;
        }
        Ok(())
    }

    /// Windowing-system signal: the surface changed dimensions.
    ///
    /// Ignored when no binding is attached.
    pub fn surface_changed(&self, spec: SurfaceSpec) -> Result<()> {
        let mut state = self.shared.lock();
        state.ensure_live()?;
        let Some(handle) = state.handle.clone() else {
            return Err(Error::DestroyedSession);
        };
        if let Some(binding) = state.surface.as_mut() {
            self.engine
                .resize_surface(&handle, spec.width, spec.height, spec.format)?;
            binding.resize(spec);
        }
        Ok(())
    }

    /// Windowing-system signal: the surface is about to become invalid.
    ///
    /// Waits for any mid-flight execution to finish, then detaches the
    /// binding. Ignored when no binding exists or the session is already
    /// destroyed; the signal cannot be refused, so it never errors.
    pub fn surface_destroyed(&self) {
        let state = self.shared.lock();
        if state.phase == SessionState::Destroyed || state.surface.is_none() {
            return;
        }

        // The execution that may be touching the surface must finish before
        // the underlying surface object becomes invalid.
        let mut state = self.shared.wait_idle(state);

        // destroy() may have won the race while we waited.
        if state.phase == SessionState::Destroyed {
            return;
        }
        if let Some(handle) = state.handle.as_ref() {
            self.engine.unbind_surface(handle);
        }
        state.surface = None;
        tracing::info!("Surface detached");
    }

    /// Destroy the session: wait for the in-flight edit (if any), stop the
    /// worker, and release the engine handle exactly once.
    ///
    /// Idempotent: destroying an already-destroyed session is a no-op.
    pub fn destroy(&self) -> Result<()> {
        let handle = {
            let mut state = self.shared.lock();
            if state.phase == SessionState::Destroyed {
                return Ok(());
            }
            state.phase = SessionState::Destroyed;
            state.generation += 1;
            state.deferred = None;

            // Quiesce: the worker delivers the raced completion (as a
            // failure) and drops its handle capability before signaling idle.
            let mut state = self.shared.wait_idle(state);

            state.surface = None;
            state.handle.take()
        };

        let _ = self.jobs.send(Job::Shutdown);
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                tracing::error!("Session worker panicked");
            }
        }

        if let Some(handle) = handle {
            match Arc::try_unwrap(handle) {
                Ok(handle) => {
                    self.engine.teardown(handle);
                    tracing::info!("Render session destroyed");
                }
                Err(_) => {
                    // Should be unreachable after the join; leak instead of
                    // risking a double free.
                    tracing::error!("Engine handle still shared at destroy; leaking it");
                }
            }
        }
        Ok(())
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        let _ = self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicU64, Ordering};

    use crate::surface::PixelFormat;

    /// Engine stub that counts instances and succeeds at everything.
    #[derive(Default)]
    struct StubEngine {
        next_raw: AtomicU64,
        live: AtomicU64,
    }

    impl Engine for StubEngine {
        fn init(&self) -> Result<EngineHandle> {
            let raw = self.next_raw.fetch_add(1, Ordering::SeqCst) + 1;
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(EngineHandle::from_raw(raw).expect("nonzero raw"))
        }

        fn bind_surface(&self, _: &EngineHandle, _: u32, _: u32, _: PixelFormat) -> Result<()> {
            Ok(())
        }

        fn resize_surface(&self, _: &EngineHandle, _: u32, _: u32, _: PixelFormat) -> Result<()> {
            Ok(())
        }

        fn unbind_surface(&self, _: &EngineHandle) {}

        fn swap_buffers(&self, _: &EngineHandle) {}

        fn redraw(&self, _: &EngineHandle) -> Result<()> {
            Ok(())
        }

        fn execute(
            &self,
            _: &EngineHandle,
            _: &EffectCommand,
            _: &Path,
            _: &Path,
        ) -> Result<()> {
            Ok(())
        }

        fn teardown(&self, handle: EngineHandle) {
            drop(handle);
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    struct NullListener;

    impl OnEditComplete for NullListener {
        fn on_success(&self, _: &Path, _: CorrelationToken) {}
        fn on_error(&self, _: &Error, _: CorrelationToken) {}
    }

    fn session() -> RenderSession {
        RenderSession::create(Arc::new(StubEngine::default()), SessionOptions::default())
            .expect("create")
    }

    #[test]
    fn create_starts_bound() {
        let s = session();
        assert_eq!(s.state(), SessionState::Bound);
        assert!(!s.surface_bound());
    }

    #[test]
    fn configuration_promotes_to_configured() {
        let s = session();
        s.set_input_path("/tmp/in.png").unwrap();
        assert_eq!(s.state(), SessionState::Bound);
        s.set_output_path("/tmp/out.png").unwrap();
        assert_eq!(s.state(), SessionState::Bound);
        s.set_effect_cmd("{\"effect\":\"Normal\"}").unwrap();
        assert_eq!(s.state(), SessionState::Configured);
    }

    #[test]
    fn empty_paths_are_rejected() {
        let s = session();
        assert!(matches!(
            s.set_input_path(""),
            Err(Error::NotConfigured("input path"))
        ));
        assert!(matches!(
            s.set_output_path(""),
            Err(Error::NotConfigured("output path"))
        ));
    }

    #[test]
    fn execute_before_configuration_is_rejected() {
        let s = session();
        let err = s.execute(Arc::new(NullListener), CorrelationToken(0)).unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));
    }

    #[test]
    fn malformed_command_leaves_state_untouched() {
        let s = session();
        s.set_input_path("/tmp/in.png").unwrap();
        s.set_output_path("/tmp/out.png").unwrap();
        assert!(s.set_effect_cmd("{\"effect\":\"Nonsense\"}").is_err());
        assert_eq!(s.state(), SessionState::Bound);
    }

    #[test]
    fn invalidate_without_surface_is_a_noop() {
        let s = session();
        s.invalidate().unwrap();
    }

    #[test]
    fn invalidate_with_surface_swaps() {
        let s = session();
        s.surface_available(SurfaceSpec {
            width: 640,
            height: 480,
            format: PixelFormat::Rgba8888,
        })
        .unwrap();
        s.invalidate().unwrap();
        s.invalidate().unwrap();
        assert_eq!(s.surface_swap_count(), Some(2));
    }

    #[test]
    fn surface_destroyed_without_binding_is_ignored() {
        let s = session();
        s.surface_destroyed();
        assert_eq!(s.state(), SessionState::Bound);
    }

    #[test]
    fn operations_after_destroy_fail_fast() {
        let s = session();
        s.destroy().unwrap();
        assert_eq!(s.state(), SessionState::Destroyed);
        assert!(matches!(
            s.set_input_path("/tmp/in.png"),
            Err(Error::DestroyedSession)
        ));
        assert!(matches!(s.invalidate(), Err(Error::DestroyedSession)));
        assert!(matches!(
            s.execute(Arc::new(NullListener), CorrelationToken(0)),
            Err(Error::DestroyedSession)
        ));
    }

    #[test]
    fn destroy_is_idempotent_and_releases_once() {
        let engine = Arc::new(StubEngine::default());
        let s = RenderSession::create(engine.clone(), SessionOptions::default()).unwrap();
        s.destroy().unwrap();
        s.destroy().unwrap();
        assert_eq!(engine.live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn drop_destroys_the_session() {
        let engine = Arc::new(StubEngine::default());
        {
            let _s = RenderSession::create(engine.clone(), SessionOptions::default()).unwrap();
        }
        assert_eq!(engine.live.load(Ordering::SeqCst), 0);
    }
}
