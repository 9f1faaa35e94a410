//! Per-conversation broadcast channels.

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::events::StreamEvent;

const CHANNEL_CAPACITY: usize = 256;

/// Registry of per-conversation broadcast channels. Publishing is
/// fire-and-forget: a publish with no subscribers is dropped, a slow
/// subscriber lags without blocking the publisher, and ordering per channel
/// follows emission order.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    channels: DashMap<String, broadcast::Sender<StreamEvent>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// The channel key for one conversation.
    pub fn channel_name(conversation_id: &str) -> String {
        format!("chat.{}", conversation_id)
    }

    pub fn publish(&self, channel: &str, event: StreamEvent) {
        let sender = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        let _ = sender.send(event);
    }

    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<StreamEvent> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}
