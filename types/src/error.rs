use thiserror::Error;

/// HTTP status used when a peer failure carries no status of its own.
pub const UPSTREAM_UNAVAILABLE_STATUS: u16 = 502;

/// Failure taxonomy shared by the store backends, the proxy client and the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Bad input; the caller can correct it.
    #[error("{0}")]
    Validation(String),
    /// An identity-sensitive operation referenced an id that does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Backend failure. Fatal to the triggering request, never retried.
    #[error("store error: {0}")]
    Store(String),
    /// The peer was unreachable or answered with a non-2xx status.
    #[error("{message}")]
    PeerUnavailable { status: Option<u16>, message: String },
    /// No pooled connection became free within the acquire timeout. Safe to retry.
    #[error("connection pool exhausted after waiting {waited_ms}ms")]
    PoolExhausted { waited_ms: u64 },
    /// Invalid startup configuration. The process exits before serving.
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn store(err: impl std::fmt::Display) -> Self {
        Error::Store(err.to_string())
    }

    /// HTTP status this error is served with.
    ///
    /// `NotFound` maps to 500: reorder against an absent id has always answered
    /// with a server error and clients depend on that.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NotFound(_) | Error::Store(_) | Error::Configuration(_) => 500,
            Error::PeerUnavailable { status, .. } => status.unwrap_or(UPSTREAM_UNAVAILABLE_STATUS),
            Error::PoolExhausted { .. } => 503,
        }
    }

    /// Transient failures a caller may retry unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Error::PoolExhausted { .. })
    }
}
