//! Error types for the game engine.

use bl_core::CoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a turn. Nothing is persisted when one is returned.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The story manifest does not exist.
    #[error("story not found: {0}")]
    StoryNotFound(String),

    /// A node referenced by the story does not exist.
    #[error("node not found: {story}/{node}")]
    NodeNotFound {
        /// Story id.
        story: String,
        /// Missing node id.
        node: String,
    },

    /// The session exists but no story has been started on it.
    #[error("session {0} has not started a story")]
    NotStarted(String),

    /// A store could not be read or written.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Story or session data could not be decoded.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Errors raised by story, session, and cache stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the key.
    #[error("no record for {0}")]
    Missing(String),

    /// A stored record could not be decoded or encoded.
    #[error("bad record {key}: {source}")]
    Record {
        /// Record key.
        key: String,
        /// Decoding error.
        #[source]
        source: CoreError,
    },

    /// The backend failed.
    #[error("backend: {0}")]
    Backend(String),
}

/// Errors raised by intent classifiers. The engine treats all of them as "unknown".
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The classifier is not usable with its current configuration.
    #[error("classifier not configured: {0}")]
    NotConfigured(String),

    /// The remote backend could not be reached or answered with an error.
    #[error("classifier request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with something that is not a classification.
    #[error("unexpected classifier response: {0}")]
    BadResponse(String),
}

/// Error returned by a hook subscriber. Logged by the bus, never fatal.
#[derive(Debug, Error)]
#[error("hook '{hook}' failed: {message}")]
pub struct HookError {
    /// Name of the failing hook.
    pub hook: String,
    /// What went wrong.
    pub message: String,
}

impl HookError {
    /// Create a hook error.
    pub fn new(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            hook: hook.into(),
            message: message.into(),
        }
    }
}

/// Reasons an intent correction is refused. Game state is untouched.
#[derive(Debug, Error)]
pub enum CorrectionError {
    /// No active session with that id.
    #[error("Session not found")]
    SessionNotFound,

    /// No previous input, or it is too old to correct.
    #[error("Correction window expired")]
    WindowExpired,

    /// The input differs from the last input of the session.
    #[error("Input mismatch")]
    InputMismatch,

    /// The chosen intent id has characters outside `[A-Za-z0-9_]`.
    #[error("Invalid intent ID format")]
    InvalidIntentId,

    /// The replayed turn failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
