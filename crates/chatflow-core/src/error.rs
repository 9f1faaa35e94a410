//! Error taxonomy for the streaming pipeline.

use chatflow_llm::LlmError;
use thiserror::Error;

/// Pipeline error kinds, each with a fixed HTTP status, a machine code, and a
/// user-facing message distinct from the internal detail.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Bad input, rejected before any side effect.
    #[error("{0}")]
    Validation(String),

    #[error("conversation '{0}' not found")]
    ConversationNotFound(String),

    /// The upstream stream stopped mid-sequence; any partial content has
    /// already been persisted with an interruption marker.
    #[error("response stream was interrupted")]
    StreamAbort(#[source] LlmError),

    #[error("chat provider is unavailable")]
    ProviderUnavailable(#[source] LlmError),

    #[error("response generation exceeded the time limit")]
    Timeout,

    /// Title generation failure. Always recovered by the caller, never
    /// surfaced to the end user.
    #[error("title generation failed: {0}")]
    Title(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ChatError {
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_) => 422,
            Self::ConversationNotFound(_) => 404,
            Self::ProviderUnavailable(_) => 503,
            Self::Timeout => 504,
            Self::StreamAbort(_) | Self::Title(_) | Self::Storage(_) => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ConversationNotFound(_) => "NOT_FOUND",
            Self::StreamAbort(_) => "STREAM_ERROR",
            Self::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            Self::Timeout => "TIMEOUT",
            Self::Title(_) | Self::Storage(_) => "ERROR",
        }
    }

    /// The fixed text shown to the end user. Internal detail stays in logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::ConversationNotFound(_) => "Conversation not found".to_string(),
            Self::StreamAbort(_) => {
                "Sorry, an error occurred while generating the response. Please try again."
                    .to_string()
            }
            Self::ProviderUnavailable(_) => {
                "The chat service is temporarily unavailable, try another model.".to_string()
            }
            Self::Timeout => "The response took too long to generate".to_string(),
            Self::Title(_) | Self::Storage(_) => "An error occurred".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code_mapping() {
        let abort = ChatError::StreamAbort(LlmError::Stream("gone".to_string()));
        assert_eq!(abort.status(), 500);
        assert_eq!(abort.code(), "STREAM_ERROR");

        let unavailable = ChatError::ProviderUnavailable(LlmError::Provider {
            status: 503,
            message: "down".to_string(),
        });
        assert_eq!(unavailable.status(), 503);
        assert_eq!(unavailable.code(), "PROVIDER_UNAVAILABLE");

        assert_eq!(ChatError::Timeout.status(), 504);
        assert_eq!(ChatError::Validation("bad".to_string()).status(), 422);
    }

    #[test]
    fn test_user_message_hides_internal_detail() {
        let abort = ChatError::StreamAbort(LlmError::Stream("tcp reset by peer".to_string()));
        assert!(!abort.user_message().contains("tcp"));
    }
}
