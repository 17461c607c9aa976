use std::path::PathBuf;

/// Alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur when reading story data or session records.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A session id that is not a UUID.
    #[error("invalid session id: \"{0}\"")]
    InvalidSessionId(String),

    /// A file or directory could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        /// The offending file.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A serialized session record could not be decoded or encoded.
    #[error("session record: {0}")]
    SessionRecord(#[from] serde_json::Error),
}
