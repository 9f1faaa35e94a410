//! Chatflow Core - streaming response orchestration
//!
//! This crate drives one chat exchange end to end: it consumes the provider's
//! token stream, re-batches deltas under dual count/time thresholds, fans
//! every flush out to the live SSE connection and the per-conversation
//! broadcast channel, persists partial and final assistant content, and
//! conditionally runs a second, independently throttled title stream.

pub mod batcher;
pub mod context;
pub mod error;
pub mod events;
pub mod hub;
pub mod orchestrator;
pub mod title;
pub mod writer;

pub use batcher::{DeltaBatcher, FlushProfile};
pub use error::ChatError;
pub use events::{StreamEvent, WireEvent};
pub use hub::BroadcastHub;
pub use orchestrator::{
    MAX_MESSAGE_LEN, StreamConfig, StreamOrchestrator, StreamOutcome, StreamRequest,
};
pub use writer::{ChannelEventWriter, EventWriter, SseFrame, WriterClosed};
