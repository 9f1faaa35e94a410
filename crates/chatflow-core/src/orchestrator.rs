//! The streaming response pipeline.
//!
//! One orchestrator instance is shared across requests; each request is
//! driven by a single worker task that owns its assistant message for the
//! lifetime of the stream. The provider delta stream is the only suspension
//! point besides the keepalive tick, and every exit path - completion,
//! abort, timeout - runs the same explicit persistence step, so partial
//! output is never lost to an unwind.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tracing::{error, info, warn};

use chatflow_llm::{ChatMessage, ChatRequest, LlmClient, LlmError, ModelCatalog};
use chatflow_storage::{Message, MessageRole, Storage};

use crate::batcher::{DeltaBatcher, FlushProfile};
use crate::context::build_context;
use crate::error::ChatError;
use crate::events::StreamEvent;
use crate::hub::BroadcastHub;
use crate::title;
use crate::writer::{EventWriter, SseFrame};

/// Upper bound on inbound message length, in characters.
pub const MAX_MESSAGE_LEN: usize = 4000;

/// Suffix appended to partial assistant content after a mid-stream failure.
pub const INTERRUPTION_MARKER: &str = "\n\n[The response was interrupted due to an error]";

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(5);
const STREAM_TIMEOUT: Duration = Duration::from_secs(180);

/// Tunables of one pipeline run. Defaults match production behavior; tests
/// shrink the intervals.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub keepalive_interval: Duration,
    /// Wall-clock ceiling for the whole main stream.
    pub stream_timeout: Duration,
    pub main_profile: FlushProfile,
    pub title_profile: FlushProfile,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: KEEPALIVE_INTERVAL,
            stream_timeout: STREAM_TIMEOUT,
            main_profile: FlushProfile::main(),
            title_profile: FlushProfile::title(),
        }
    }
}

/// Inbound streaming-chat request.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub message: String,
    pub model: Option<String>,
}

/// Summary of a completed pipeline run.
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    pub conversation_id: String,
    pub model: String,
    pub content: String,
    pub title: Option<String>,
}

enum StreamEnd {
    Completed,
    Failed(LlmError),
}

/// Drives one chat exchange: user message persistence, context assembly,
/// the batched delta loop fanning out to writer and broadcast channel,
/// finalization, and the conditional title sub-stream.
pub struct StreamOrchestrator {
    storage: Arc<Storage>,
    llm: Arc<dyn LlmClient>,
    catalog: Arc<ModelCatalog>,
    hub: Arc<BroadcastHub>,
    config: StreamConfig,
}

impl StreamOrchestrator {
    pub fn new(
        storage: Arc<Storage>,
        llm: Arc<dyn LlmClient>,
        catalog: Arc<ModelCatalog>,
        hub: Arc<BroadcastHub>,
    ) -> Self {
        Self {
            storage,
            llm,
            catalog,
            hub,
            config: StreamConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Reject bad input before any side effect.
    pub fn validate_message(message: &str) -> Result<(), ChatError> {
        if message.trim().is_empty() {
            return Err(ChatError::Validation(
                "The message cannot be empty.".to_string(),
            ));
        }
        if message.chars().count() > MAX_MESSAGE_LEN {
            return Err(ChatError::Validation(format!(
                "The message cannot exceed {} characters.",
                MAX_MESSAGE_LEN
            )));
        }
        Ok(())
    }

    /// Run the full pipeline for one inbound message.
    pub async fn stream_message(
        &self,
        conversation_id: &str,
        request: StreamRequest,
        writer: &mut dyn EventWriter,
    ) -> Result<StreamOutcome, ChatError> {
        Self::validate_message(&request.message)?;

        let conversation = self
            .storage
            .conversations
            .get(conversation_id)?
            .ok_or_else(|| ChatError::ConversationNotFound(conversation_id.to_string()))?;

        let channel = BroadcastHub::channel_name(conversation_id);

        let user_message = Message::new(conversation_id, MessageRole::User, &request.message);
        self.storage.messages.upsert(&user_message)?;

        let history = self.storage.messages.list(conversation_id)?;
        let context = build_context(&history);

        let model = self
            .catalog
            .resolve(conversation.model.as_deref().or(request.model.as_deref()))
            .await;

        // Created empty up front; exclusively owned by this worker until the
        // stream ends one way or another.
        let mut assistant_message = Message::new(conversation_id, MessageRole::Assistant, "");
        self.storage.messages.upsert(&assistant_message)?;

        info!(
            conversation_id,
            model = %model,
            history_len = history.len(),
            "starting response stream"
        );

        let chat_request = ChatRequest::new(model.clone(), context);
        let (full, end) = self
            .drive_main_stream(conversation_id, &channel, chat_request, writer)
            .await;

        match end {
            StreamEnd::Completed => {
                assistant_message.content = full.clone();
                self.storage.messages.upsert(&assistant_message)?;
                self.hub.publish(&channel, StreamEvent::completed(full.clone()));

                let title = self.refresh_title(conversation_id, &channel).await;

                Ok(StreamOutcome {
                    conversation_id: conversation_id.to_string(),
                    model,
                    content: full,
                    title,
                })
            }
            StreamEnd::Failed(cause) => {
                let had_output = !full.is_empty();
                if had_output {
                    assistant_message.content = format!("{}{}", full, INTERRUPTION_MARKER);
                    self.storage.messages.upsert(&assistant_message)?;
                }

                let chat_error = classify_stream_error(cause, had_output);
                error!(
                    conversation_id,
                    error = %chat_error,
                    partial_chars = full.len(),
                    "response stream failed"
                );
                self.hub
                    .publish(&channel, StreamEvent::error(chat_error.user_message()));

                Err(chat_error)
            }
        }
    }

    /// The batched delta loop. Returns the accumulated full text together
    /// with how the stream ended; the caller owns persistence and terminal
    /// events so they run on every path.
    async fn drive_main_stream(
        &self,
        conversation_id: &str,
        channel: &str,
        request: ChatRequest,
        writer: &mut dyn EventWriter,
    ) -> (String, StreamEnd) {
        let mut batcher = DeltaBatcher::new(self.config.main_profile);
        let mut stream = self.llm.chat_stream(request);

        let mut keepalive = interval_at(
            Instant::now() + self.config.keepalive_interval,
            self.config.keepalive_interval,
        );
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let deadline = sleep(self.config.stream_timeout);
        tokio::pin!(deadline);

        let mut writer_alive = true;

        let end = loop {
            tokio::select! {
                _ = &mut deadline => break StreamEnd::Failed(LlmError::Timeout),
                _ = keepalive.tick() => {
                    write_frame(writer, &mut writer_alive, conversation_id, SseFrame::Keepalive)
                        .await;
                }
                next = stream.next() => match next {
                    None => break StreamEnd::Completed,
                    Some(Ok(chunk)) => {
                        if let Some(flushed) = batcher.push(&chunk.text) {
                            self.hub.publish(channel, StreamEvent::payload(flushed));
                            write_frame(
                                writer,
                                &mut writer_alive,
                                conversation_id,
                                SseFrame::Data(json!({"status": "streaming"})),
                            )
                            .await;
                        }
                    }
                    Some(Err(cause)) => break StreamEnd::Failed(cause),
                },
            }
        };

        if matches!(end, StreamEnd::Completed)
            && let Some(rest) = batcher.take_pending()
        {
            self.hub.publish(channel, StreamEvent::payload(rest));
        }

        (batcher.full().to_string(), end)
    }

    /// Title refresh around the main stream's completion. Failures are
    /// logged and swallowed; the conversation's activity timestamp is bumped
    /// on every branch that does not update the title itself.
    async fn refresh_title(&self, conversation_id: &str, channel: &str) -> Option<String> {
        match self.try_refresh_title(conversation_id, channel).await {
            Ok(title) => title,
            Err(cause) => {
                warn!(conversation_id, error = %cause, "title generation failed");
                if let Err(touch_error) = self.storage.conversations.touch(conversation_id) {
                    warn!(
                        conversation_id,
                        error = %touch_error,
                        "failed to bump conversation activity"
                    );
                }
                None
            }
        }
    }

    async fn try_refresh_title(
        &self,
        conversation_id: &str,
        channel: &str,
    ) -> Result<Option<String>, ChatError> {
        let conversation = self
            .storage
            .conversations
            .get(conversation_id)?
            .ok_or_else(|| ChatError::ConversationNotFound(conversation_id.to_string()))?;
        let message_count = self.storage.messages.count(conversation_id)?;

        if !title::should_generate(&conversation, message_count) {
            self.storage.conversations.touch(conversation_id)?;
            return Ok(None);
        }

        let recent = self
            .storage
            .messages
            .last_n(conversation_id, title::TITLE_CONTEXT_MESSAGES)?;
        let context = title::enrich_short_context(&title::title_context(&recent));

        let model = self.catalog.resolve(None).await;
        let request = ChatRequest::new(model, vec![ChatMessage::user(title::title_prompt(&context))])
            .with_temperature(0.5);

        let mut batcher = DeltaBatcher::new(self.config.title_profile);
        let mut stream = self.llm.chat_stream(request);

        while let Some(item) = stream.next().await {
            let chunk = item.map_err(|cause| ChatError::Title(cause.to_string()))?;
            if let Some(flushed) = batcher.push(&chunk.text) {
                self.hub.publish(channel, StreamEvent::title(flushed, false));
                if let Some(delay) = batcher.pacing_delay() {
                    sleep(delay).await;
                }
            }
        }

        if let Some(rest) = batcher.take_pending() {
            self.hub.publish(channel, StreamEvent::title(rest, false));
        }

        let cleaned = title::clean_title(batcher.full());
        if cleaned.is_empty() {
            return Ok(None);
        }

        self.storage.conversations.set_title(conversation_id, &cleaned)?;
        info!(conversation_id, title = %cleaned, "conversation title updated");
        self.hub
            .publish(channel, StreamEvent::title(cleaned.clone(), true));

        Ok(Some(cleaned))
    }
}

/// Write one frame and flush it. A dead client downgrades the writer to a
/// no-op for the rest of the stream; generation and broadcasting continue
/// for the other subscribers.
async fn write_frame(
    writer: &mut dyn EventWriter,
    alive: &mut bool,
    conversation_id: &str,
    frame: SseFrame,
) {
    if !*alive {
        return;
    }

    let delivered = match writer.write(frame).await {
        Ok(()) => writer.flush().await,
        Err(closed) => Err(closed),
    };

    if delivered.is_err() {
        warn!(
            conversation_id,
            "client connection closed, continuing stream for channel subscribers"
        );
        *alive = false;
    }
}

fn classify_stream_error(cause: LlmError, had_output: bool) -> ChatError {
    if matches!(cause, LlmError::Timeout) {
        return ChatError::Timeout;
    }
    if !had_output && cause.is_provider_unavailable() {
        return ChatError::ProviderUnavailable(cause);
    }
    ChatError::StreamAbort(cause)
}
