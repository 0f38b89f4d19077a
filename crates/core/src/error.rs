//! Unified error types for sitecache.

use tokio_rusqlite::rusqlite;

/// Unified error types for the sitecache worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input (e.g., a deferred submission that is not a POST).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unresolvable URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The network request was rejected before a response arrived.
    #[error("NETWORK_FAILURE: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// No cache entry found for the given request.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Writing a response into a partition failed.
    #[error("CACHE_WRITE_FAILED: {0}")]
    CacheWrite(String),

    /// A stored entry could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Static manifest population failed during install.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// Lifecycle transition not allowed from the current state.
    #[error("INVALID_STATE: cannot move from {from} to {to}")]
    InvalidState { from: String, to: String },
}

impl Error {
    /// Stable machine-readable code, the prefix of the display form.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Network(_) => "NETWORK_FAILURE",
            Error::FetchTimeout(_) => "FETCH_TIMEOUT",
            Error::CacheMiss(_) => "CACHE_MISS",
            Error::CacheWrite(_) => "CACHE_WRITE_FAILED",
            Error::CorruptEntry(_) | Error::Database(_) | Error::MigrationFailed(_) => "CACHE_ERROR",
            Error::InstallFailed(_) => "INSTALL_FAILED",
            Error::InvalidState { .. } => "INVALID_STATE",
        }
    }

    /// Whether the error came from the network rather than the cache.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::FetchTimeout(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
