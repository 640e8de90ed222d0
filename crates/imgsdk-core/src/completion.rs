//! The completion channel: exactly-once success/failure notification for
//! each accepted execution.
//!
//! The worker invokes [`OnEditComplete`] on its own thread. Callers that
//! must touch thread-bound state (a UI, typically) should hand the session
//! a [`CompletionQueue`] sender instead of a direct callback and drain the
//! paired receiver on their own schedule; the queue is the message-passing
//! form of the same exactly-once contract.

use std::path::{Path, PathBuf};

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

use crate::error::Error;

/// Opaque caller-supplied value echoed back with the completion, so a
/// caller can match outcomes to submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationToken(pub u64);

impl From<u64> for CorrelationToken {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Callback invoked exactly once per accepted `execute()`.
///
/// Runs on the session worker thread, after the session has already settled
/// its post-execution state; the callback observes a quiescent session but
/// must not call [`RenderSession::destroy`](crate::session::RenderSession::destroy)
/// from inside itself (destroy waits for the callback to return).
pub trait OnEditComplete: Send + Sync {
    /// The edit succeeded and the result was written to `output`.
    fn on_success(&self, output: &Path, token: CorrelationToken);

    /// The edit failed; `error` is the diagnostic.
    fn on_error(&self, error: &Error, token: CorrelationToken);
}

/// One terminal notification, as carried by a [`CompletionQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The edit succeeded; the result is at `output`.
    Success {
        output: PathBuf,
        token: CorrelationToken,
    },
    /// The edit failed with `diagnostic`.
    Failure {
        diagnostic: String,
        token: CorrelationToken,
    },
}

impl Completion {
    /// The correlation token this completion answers.
    pub fn token(&self) -> CorrelationToken {
        match self {
            Self::Success { token, .. } | Self::Failure { token, .. } => *token,
        }
    }
}

/// Queue adapter over [`OnEditComplete`].
///
/// The sender half is handed to `execute()` as the listener; the receiver
/// half is drained by the caller's own thread.
pub struct CompletionQueue {
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
}

impl CompletionQueue {
    /// Create an unbounded completion queue.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// The listener half, for passing to `execute()`.
    pub fn listener(&self) -> CompletionSender {
        CompletionSender {
            sender: self.sender.clone(),
        }
    }

    /// Block until the next completion arrives.
    ///
    /// Returns `None` once every sender is gone and the queue is empty.
    pub fn recv(&self) -> Option<Completion> {
        self.receiver.recv().ok()
    }

    /// Drain all completions currently queued, without blocking.
    pub fn drain(&self) -> Vec<Completion> {
        let mut out = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(completion) => out.push(completion),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return out,
            }
        }
    }
}

impl Default for CompletionQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Sender half of a [`CompletionQueue`].
#[derive(Clone)]
pub struct CompletionSender {
    sender: Sender<Completion>,
}

impl OnEditComplete for CompletionSender {
    fn on_success(&self, output: &Path, token: CorrelationToken) {
        let _ = self.sender.send(Completion::Success {
            output: output.to_path_buf(),
            token,
        });
    }

    fn on_error(&self, error: &Error, token: CorrelationToken) {
        let _ = self.sender.send(Completion::Failure {
            diagnostic: error.diagnostic(),
            token,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_carries_success_with_token() {
        let queue = CompletionQueue::new();
        let listener = queue.listener();

        listener.on_success(Path::new("/tmp/out.png"), CorrelationToken(7));

        let got = queue.drain();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].token(), CorrelationToken(7));
        match &got[0] {
            Completion::Success { output, .. } => {
                assert_eq!(output, Path::new("/tmp/out.png"));
            }
            other => panic!("unexpected completion: {other:?}"),
        }
    }

    #[test]
    fn queue_carries_failure_diagnostic() {
        let queue = CompletionQueue::new();
        let listener = queue.listener();

        listener.on_error(&Error::Execution("boom".into()), CorrelationToken(1));

        match queue.recv() {
            Some(Completion::Failure { diagnostic, token }) => {
                assert!(diagnostic.contains("boom"));
                assert_eq!(token, CorrelationToken(1));
            }
            other => panic!("unexpected completion: {other:?}"),
        }
    }

    #[test]
    fn drain_on_empty_queue_is_empty() {
        let queue = CompletionQueue::new();
        assert!(queue.drain().is_empty());
    }
}
