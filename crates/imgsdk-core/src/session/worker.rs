//! The per-session worker thread.
//!
//! Each session owns exactly one worker (not a shared pool), matching the
//! at-most-one-in-flight invariant: a job is only ever enqueued after the
//! session has marked itself executing, so the queue never holds more than
//! one `Execute` at a time.

use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::command::EffectCommand;
use crate::completion::{CorrelationToken, OnEditComplete};
use crate::engine::{Engine, EngineHandle};
use crate::error::Error;

use super::{SessionState, Shared};

/// Message accepted by the worker.
pub(super) enum Job {
    /// Run one snapshotted edit.
    Execute(ExecuteJob),
    /// Exit the worker loop. Sent once, by `destroy()`.
    Shutdown,
}

/// Everything one execution needs, snapshotted at submission time.
///
/// The handle travels as an `Arc` capability; the worker drops its clone
/// before signaling quiesce so `destroy()` can recover exclusive ownership.
pub(super) struct ExecuteJob {
    pub generation: u64,
    pub handle: Arc<EngineHandle>,
    pub command: EffectCommand,
    pub input: PathBuf,
    pub output: PathBuf,
    pub listener: Arc<dyn OnEditComplete>,
    pub token: CorrelationToken,
}

/// Worker loop: drain jobs until shutdown.
pub(super) fn run(engine: Arc<dyn Engine>, shared: Arc<Shared>, jobs: Receiver<Job>) {
    while let Ok(job) = jobs.recv() {
        match job {
            Job::Shutdown => break,
            Job::Execute(job) => execute_one(engine.as_ref(), &shared, job),
        }
    }
    tracing::debug!("Session worker exiting");
}

/// Run one edit and deliver its completion exactly once.
///
/// Ordering is load-bearing:
/// 1. the native call runs without the session lock held;
/// 2. the outcome settles session state under the lock (a generation
///    mismatch means `destroy()` started while we ran and the session must
///    not transition);
/// 3. the callback fires, off-lock, while the in-flight flag still holds
///    off both `destroy()` and the next `execute()` — so the handle is
///    alive for the whole callback;
/// 4. the handle capability drops and only then is quiesce signaled.
fn execute_one(engine: &dyn Engine, shared: &Shared, job: ExecuteJob) {
    let ExecuteJob {
        generation,
        handle,
        command,
        input,
        output,
        listener,
        token,
    } = job;

    // Skip the native call when destruction already started; the engine
    // call would be wasted work delaying the destroyer.
    let stale = shared.lock().generation != generation;
    let result = if stale {
        Err(Error::DestroyedSession)
    } else {
        engine.execute(&handle, &command, &input, &output)
    };

    let outcome = {
        let mut state = shared.lock();
        if state.generation != generation {
            Err(Error::Execution("session destroyed while executing".into()))
        } else {
            match result {
                Ok(()) => {
                    state.phase = SessionState::Completed;
                    Ok(())
                }
                Err(err) => {
                    state.phase = SessionState::Failed;
                    Err(err)
                }
            }
        }
    };

    match &outcome {
        Ok(()) => {
            tracing::debug!(%command, output = %output.display(), "Edit completed");
            listener.on_success(&output, token);
        }
        Err(err) => {
            tracing::warn!(%command, %err, "Edit failed");
            listener.on_error(err, token);
        }
    }

    // The callback has returned and may no longer reach the handle.
    drop(handle);
    drop(listener);

    let mut state = shared.lock();
    state.executing = false;
    shared.notify_idle();
    drop(state);
}
