//! Unified error type.

use thiserror::Error;

/// A boxed, thread-safe error, used where the concrete type belongs to the
/// application (handler failures, audit sink failures).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by wiretap's fallible operations.
///
/// Application-level outcomes (404, 422, etc.) are expressed by setting a
/// status on the [`Response`](crate::Response), not as `Error`s. This type
/// surfaces infrastructure failures and handler failures the application
/// wants the transport to treat as fatal for one request.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid socket address `{0}`")]
    Addr(String),

    #[error("handler failed: {0}")]
    Handler(BoxError),

    #[error("audit sink failed: {0}")]
    Sink(BoxError),

    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    /// Wraps an application error so a handler can return it with `?`.
    ///
    /// ```rust
    /// use wiretap::Error;
    ///
    /// let err = Error::handler("upstream unavailable");
    /// assert_eq!(err.to_string(), "handler failed: upstream unavailable");
    /// ```
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }
}
