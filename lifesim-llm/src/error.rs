//! Oracle error types.
//!
//! The `Display` text of each variant doubles as the inline failure marker
//! returned by the non-throwing [`OracleClient::call`](crate::OracleClient::call)
//! forms, so it is phrased for a human reading a degraded narrative.

use thiserror::Error;

/// Errors that can occur while talking to the oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Connection, TLS or timeout failure before a status was received.
    #[error("Oracle transport failed: {0}")]
    Transport(String),

    /// HTTP 429.
    #[error("HTTP 429")]
    RateLimited,

    /// HTTP 5xx.
    #[error("HTTP {status}")]
    Server {
        /// Status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Any other non-success status. Never retried.
    #[error("Error calling oracle API: {status} - {body}")]
    Rejected {
        /// Status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Structured output was not a JSON array or object.
    #[error("JSON validation failed: {0}")]
    SchemaValidation(String),

    /// A 200 response whose body did not have the chat-completions shape.
    #[error("Malformed oracle response: {0}")]
    MalformedBody(String),

    /// Every attempt failed with a retryable error.
    #[error("Failed after {attempts} attempts. Last error: {last_error}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// Rendering of the final error.
        last_error: String,
    },

    /// Client misconfiguration.
    #[error("Oracle configuration error: {0}")]
    Config(String),
}

impl OracleError {
    /// Rate limiting, server errors and transport failures.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RateLimited | Self::Server { .. })
    }

    /// Whether another attempt may succeed: transient failures plus bad
    /// output, which is retried with a corrective nudge.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_transient() || matches!(self, Self::SchemaValidation(_) | Self::MalformedBody(_))
    }
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            OracleError::Config(err.to_string())
        } else {
            OracleError::Transport(err.to_string())
        }
    }
}
