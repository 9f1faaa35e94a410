//! Stream events and their wire representation.

use serde::{Deserialize, Serialize};

/// Event emitted by the streaming pipeline to conversation subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A batch of response text, or the final full response when
    /// `is_complete` is set.
    Payload { content: String, is_complete: bool },
    /// Terminal user-facing failure notice.
    Error { message: String },
    /// A batch of title text, or the final cleaned title.
    Title { content: String, is_complete: bool },
}

impl StreamEvent {
    pub fn payload(content: impl Into<String>) -> Self {
        Self::Payload {
            content: content.into(),
            is_complete: false,
        }
    }

    pub fn completed(content: impl Into<String>) -> Self {
        Self::Payload {
            content: content.into(),
            is_complete: true,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn title(content: impl Into<String>, is_complete: bool) -> Self {
        Self::Title {
            content: content.into(),
            is_complete,
        }
    }

    /// Whether this is the last event for its channel/tag pair.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Payload { is_complete, .. } | Self::Title { is_complete, .. } => *is_complete,
            Self::Error { .. } => true,
        }
    }

    pub fn wire(&self) -> WireEvent {
        match self {
            Self::Payload {
                content,
                is_complete,
            } => WireEvent {
                content: content.clone(),
                is_complete: *is_complete,
                error: false,
                is_title: false,
            },
            Self::Error { message } => WireEvent {
                content: message.clone(),
                is_complete: true,
                error: true,
                is_title: false,
            },
            Self::Title {
                content,
                is_complete,
            } => WireEvent {
                content: content.clone(),
                is_complete: *is_complete,
                error: false,
                is_title: true,
            },
        }
    }
}

/// Flat wire shape consumed by channel subscribers. Field set and order are
/// fixed so serialized output is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    pub content: String,
    pub is_complete: bool,
    pub error: bool,
    pub is_title: bool,
}
