//! Error types for the completion client.

use thiserror::Error;

/// Errors produced by a completion request.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Transport-level failure (DNS, TLS, connection reset, body decoding).
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    /// The request did not complete within the configured timeout.
    #[error("completion request timed out")]
    Timeout,
    /// The endpoint answered with a non-success status.
    #[error("completion endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
    /// The response carried no choices.
    #[error("completion response contained no choices")]
    NoChoices,
    /// The first choice carried no message content.
    #[error("completion response contained no message content")]
    MissingContent,
}

impl CompletionError {
    /// Classify a `reqwest` error, separating timeouts from other failures.
    #[must_use]
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}
