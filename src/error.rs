use thiserror::Error;

/// Errors that abort processing of a whole file or the run itself.
///
/// Record- and chunk-level failures are recovered inside the import loop and
/// surface only as counters; they never become an `ImportError`.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed input in {name}: {reason}")]
    MalformedInput { name: String, reason: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
