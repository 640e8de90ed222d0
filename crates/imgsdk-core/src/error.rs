//! Error types for imgsdk-core.

use thiserror::Error;

/// Result type for imgsdk-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in imgsdk-core.
#[derive(Debug, Error)]
pub enum Error {
    /// The native engine could not allocate an instance. Fatal to the
    /// session; the caller must not reuse it.
    #[error("engine initialization failed: {0}")]
    EngineInit(String),

    /// An effect command could not be parsed or validated. Recoverable;
    /// the caller may correct the spec and resubmit.
    #[error("malformed effect command ({field}): {reason}")]
    MalformedCommand {
        /// The offending field or syntax element.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Execution was requested before input path, output path and effect
    /// command were all set.
    #[error("session not configured: {0} is missing")]
    NotConfigured(&'static str),

    /// A command is already in flight on this session.
    #[error("an execution is already in flight")]
    AlreadyExecuting,

    /// The native engine reported a processing failure for a specific
    /// command. The session returns to its configured state and may retry.
    #[error("execution failed: {0}")]
    Execution(String),

    /// An operation was attempted on a destroyed session.
    #[error("session has been destroyed")]
    DestroyedSession,

    /// Failed to load the engine dynamic library.
    #[error("failed to load engine library: {0}")]
    LibraryLoad(#[from] libloading::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a `MalformedCommand` error naming the offending field.
    pub(crate) fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedCommand {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Diagnostic string suitable for completion-channel delivery.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}
