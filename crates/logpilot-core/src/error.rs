//! Failure taxonomy for calls to the stats and answering services

use thiserror::Error;

/// Failure of a single request against a backend service
///
/// Callers never propagate these past the stats poller or the chat session:
/// the poller keeps its previous snapshot and the chat session shows a
/// fallback message.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Service unreachable, connection reset or request timed out
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    /// Service answered with a non-success HTTP status
    #[error("server failure ({status}): {body}")]
    Server { status: u16, body: String },

    /// Response body could not be decoded
    #[error("malformed response body: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint path could not be joined onto the base URL
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl FetchError {
    /// Short taxonomy label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(e) if e.is_timeout() => "timeout",
            FetchError::Transport(_) => "transport",
            FetchError::Server { .. } => "server",
            FetchError::Parse(_) => "parse",
            FetchError::InvalidUrl(_) => "config",
        }
    }

    /// Whether retrying later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Server { status, .. } => *status >= 500 || *status == 429,
            FetchError::Parse(_) | FetchError::InvalidUrl(_) => false,
        }
    }
}
