//! Chatflow LLM - upstream provider abstraction
//!
//! This crate provides:
//! - `LlmClient` trait over a streaming chat-completion provider
//! - OpenRouter client (OpenAI-compatible wire format)
//! - Free-tier model catalog with a TTL cache
//! - Deterministic mock client for pipeline tests

pub mod catalog;
pub mod client;
pub mod error;
pub mod mock_client;
pub mod openrouter;

pub use catalog::{ModelCatalog, ModelEntry};
pub use client::{
    ChatMessage, ChatRequest, ChunkStream, FinishReason, LlmClient, Role, StreamChunk,
    collect_text,
};
pub use error::{LlmError, Result};
pub use mock_client::{MockLlmClient, MockStep};
pub use openrouter::{DEFAULT_MODEL, OpenRouterClient};
