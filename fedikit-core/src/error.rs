use thiserror::Error;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by every fedikit crate.
///
/// Transport failures propagate unchanged as [`Error::Transport`]; the only
/// reclassifications are the HTTP status mappings and the two documented
/// soft-fallbacks (non-JSON response body and malformed streaming payloads),
/// which never surface here at all.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A call chain was invoked without a terminal action, or resolved to
    /// nothing dispatchable. A local programming error, never retried.
    #[error("invalid call: {0}")]
    InvalidCall(String),

    /// The server returned a content type the serializer does not understand.
    /// Carries the declared type and the raw payload for diagnostics.
    #[error("unknown content type {content_type} returned from the server")]
    Deserialize { content_type: String, raw: String },

    /// HTTP 401.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// HTTP 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// HTTP 429, with the `X-RateLimit-*` headers when the server sent them.
    #[error("rate limited: {message}")]
    RateLimit {
        message: String,
        limit: Option<u64>,
        remaining: Option<u64>,
        reset: Option<String>,
    },

    /// Any other non-success HTTP status.
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    /// The media attachment did not finish processing within the deadline.
    /// Distinct from plain transport failure.
    #[error("timeout: {0}")]
    Timeout(String),

    /// A server-reported in-band error frame on a streaming connection.
    #[error("streaming error: {0}")]
    Streaming(String),

    /// Underlying transport failure, passed through unchanged.
    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Map an HTTP status code and server-reported message into the taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Error::Unauthorized(message),
            404 => Error::NotFound(message),
            429 => Error::RateLimit {
                message,
                limit: None,
                remaining: None,
                reset: None,
            },
            _ => Error::Http { status, message },
        }
    }
}
