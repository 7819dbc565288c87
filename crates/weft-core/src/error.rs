//! Error types shared across the framework.

use thiserror::Error;

use crate::{AttrError, MarkupError};

/// Errors that can abort a request while a chain is running.
///
/// Every failure propagates synchronously to the immediate caller; the core
/// performs no retries and installs no fallback body. A routing miss is not
/// an error - it is converted locally into a 405 terminal response.
#[derive(Debug, Error)]
pub enum WeftError {
    /// Programmer misuse of the markup serializer.
    #[error(transparent)]
    Markup(#[from] MarkupError),

    /// A stored attribute could not be coerced to the requested type.
    #[error(transparent)]
    Attr(#[from] AttrError),

    /// The raw request URI could not be parsed.
    #[error("invalid request URI: {0}")]
    InvalidUri(#[from] http::uri::InvalidUri),

    /// A response header name was not a valid token.
    #[error("invalid header name: {0}")]
    HeaderName(#[from] http::header::InvalidHeaderName),

    /// A response header value contained forbidden bytes.
    #[error("invalid header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),

    /// I/O failure from an action reading a backing resource or sink.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Failure raised by a user-supplied action or predicate.
    #[error("action failed: {0}")]
    Action(Box<dyn std::error::Error + Send + Sync>),
}

impl WeftError {
    /// Wrap a user error (or a plain message) for propagation through a chain.
    pub fn action(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        WeftError::Action(err.into())
    }
}
