//! Error types for the LLM module

use thiserror::Error;

/// LLM module error types
#[derive(Error, Debug)]
pub enum LlmError {
    /// The provider rejected the request before any delta was produced.
    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    /// The delta stream stopped mid-sequence.
    #[error("stream aborted: {0}")]
    Stream(String),

    #[error("provider request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Whether this failure means the provider itself is down or overloaded,
    /// as opposed to a problem with this particular stream.
    pub fn is_provider_unavailable(&self) -> bool {
        match self {
            Self::Provider { status, .. } => matches!(status, 429 | 502 | 503),
            Self::Http(err) => err.is_connect(),
            _ => false,
        }
    }
}

/// Result type alias for LLM operations
pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_unavailable_classification() {
        let overloaded = LlmError::Provider {
            status: 503,
            message: "overloaded".to_string(),
        };
        let bad_request = LlmError::Provider {
            status: 400,
            message: "bad request".to_string(),
        };

        assert!(overloaded.is_provider_unavailable());
        assert!(!bad_request.is_provider_unavailable());
        assert!(!LlmError::Timeout.is_provider_unavailable());
    }
}
