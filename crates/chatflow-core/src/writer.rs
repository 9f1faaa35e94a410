//! Live response writer abstraction.
//!
//! The pipeline writes server-sent-event frames through an explicit
//! `EventWriter` with a flush contract; there is no ambient output buffer.
//! Writer failure means the client went away - it is never fatal to the
//! pipeline, which still persists and broadcasts.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// One server-sent-event frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// `data: <json>` payload frame.
    Data(serde_json::Value),
    /// Comment-only frame keeping an idle connection open.
    Keepalive,
}

impl SseFrame {
    pub fn render(&self) -> String {
        match self {
            Self::Data(value) => format!("data: {}\n\n", value),
            Self::Keepalive => ":\n\n".to_string(),
        }
    }
}

/// The originating connection closed; nothing further can be delivered.
#[derive(Debug, Error)]
#[error("client connection closed")]
pub struct WriterClosed;

/// Sink for SSE frames. `flush` pushes everything written so far to the
/// transport; callers flush after every frame to guarantee timely delivery.
#[async_trait]
pub trait EventWriter: Send {
    async fn write(&mut self, frame: SseFrame) -> Result<(), WriterClosed>;
    async fn flush(&mut self) -> Result<(), WriterClosed>;
}

/// Writer backed by an mpsc channel whose receiver feeds the HTTP response
/// body. Frames buffer locally until `flush`, then leave as one body chunk.
pub struct ChannelEventWriter {
    tx: mpsc::Sender<String>,
    buffer: String,
}

impl ChannelEventWriter {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self {
            tx,
            buffer: String::new(),
        }
    }
}

#[async_trait]
impl EventWriter for ChannelEventWriter {
    async fn write(&mut self, frame: SseFrame) -> Result<(), WriterClosed> {
        self.buffer.push_str(&frame.render());
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), WriterClosed> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::take(&mut self.buffer);
        self.tx.send(chunk).await.map_err(|_| WriterClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_frame_grammar() {
        let frame = SseFrame::Data(json!({"status": "streaming"}));
        assert_eq!(frame.render(), "data: {\"status\":\"streaming\"}\n\n");
    }

    #[test]
    fn test_keepalive_frame_grammar() {
        assert_eq!(SseFrame::Keepalive.render(), ":\n\n");
    }

    #[tokio::test]
    async fn test_channel_writer_delivers_on_flush() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut writer = ChannelEventWriter::new(tx);

        writer.write(SseFrame::Keepalive).await.unwrap();
        assert!(rx.try_recv().is_err());

        writer.flush().await.unwrap();
        assert_eq!(rx.try_recv().unwrap(), ":\n\n");
    }

    #[tokio::test]
    async fn test_channel_writer_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let mut writer = ChannelEventWriter::new(tx);

        writer.write(SseFrame::Keepalive).await.unwrap();
        assert!(writer.flush().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_flush_is_a_no_op() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let mut writer = ChannelEventWriter::new(tx);

        // Nothing buffered, so the closed receiver is never touched.
        assert!(writer.flush().await.is_ok());
    }
}
