//! Per-attempt failures of a single credential.

use thiserror::Error;

/// Why one credential failed to produce a usable completion.
///
/// These never reach the HTTP caller: the gateway logs them and moves on to
/// the next credential.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection, TLS or body transfer failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The attempt exceeded its per-attempt deadline.
    #[error("request timed out")]
    Timeout,

    /// Provider answered with a non-success status.
    #[error("provider returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body for diagnostics.
        body: String,
    },

    /// Payload had no choice or no message content.
    #[error("malformed provider payload: {0}")]
    MalformedPayload(String),

    /// Reply content was empty or whitespace only.
    #[error("provider returned empty content")]
    EmptyContent,
}

impl ProviderError {
    /// Map a reqwest failure, keeping timeouts distinct.
    #[must_use]
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}
