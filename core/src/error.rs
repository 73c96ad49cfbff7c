//! Error types for the request executor.
//!
//! # Design
//! Two kinds only. Any response outside the 2xx range becomes `Http` with
//! the status line and whatever body text could be captured. Everything else
//! (connection failures, aborts and timeouts, unparseable bodies) becomes
//! `Network`. Both are retried up to the caller's budget; the error from the
//! final attempt is what the caller sees.

use thiserror::Error;

/// Placeholder used when the body of an error response cannot be read.
pub const BODY_UNAVAILABLE: &str = "<response body unavailable>";

/// Terminal failure of a single `execute` call.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status} {status_text}: {body}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },

    /// The request never produced a usable response.
    ///
    /// `aborted` is set when the attempt was cancelled by its timeout or by
    /// the caller's `AbortSignal`.
    #[error("network error: {message}")]
    Network { message: String, aborted: bool },
}

impl FetchError {
    pub fn network(message: impl Into<String>) -> Self {
        FetchError::Network {
            message: message.into(),
            aborted: false,
        }
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        FetchError::Network {
            message: message.into(),
            aborted: true,
        }
    }

    /// Wrap a body decoding failure.
    pub fn parse(err: impl std::fmt::Display) -> Self {
        FetchError::network(format!("failed to parse response body: {err}"))
    }

    /// HTTP status code, if the server responded at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            FetchError::Network { .. } => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, FetchError::Network { aborted: true, .. })
    }
}
