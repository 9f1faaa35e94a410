//! Deterministic mock LLM client for pipeline and reliability tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::time::{Duration, sleep};

use crate::catalog::ModelEntry;
use crate::client::{ChatRequest, ChunkStream, FinishReason, LlmClient, StreamChunk};
use crate::error::{LlmError, Result};

/// Scripted step of a mock delta stream.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub delay_ms: u64,
    pub kind: MockStepKind,
}

#[derive(Debug, Clone)]
pub enum MockStepKind {
    /// Yield one text delta.
    Delta(String),
    /// Abort the stream with an error.
    Abort(String),
    /// Fail as an overloaded provider (HTTP 503) before any delta.
    Unavailable(String),
}

impl MockStep {
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Delta(text.into()),
        }
    }

    pub fn abort(message: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Abort(message.into()),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Unavailable(message.into()),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// A deterministic mock LLM client. Each `chat_stream` call consumes the next
/// scripted stream; with no script left it completes immediately with no
/// deltas. All received requests are recorded for assertions.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    scripts: Mutex<VecDeque<Vec<MockStep>>>,
    requests: Mutex<Vec<ChatRequest>>,
    models: Vec<ModelEntry>,
    model_fetches: AtomicUsize,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_models(mut self, models: Vec<ModelEntry>) -> Self {
        self.models = models;
        self
    }

    /// Queue the script for the next `chat_stream` call.
    pub fn push_stream(&self, steps: Vec<MockStep>) {
        self.scripts.lock().unwrap().push_back(steps);
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of `list_models` calls served.
    pub fn model_fetches(&self) -> usize {
        self.model_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn chat_stream(&self, request: ChatRequest) -> ChunkStream {
        self.requests.lock().unwrap().push(request);
        let steps = self.scripts.lock().unwrap().pop_front().unwrap_or_default();

        Box::pin(async_stream::stream! {
            for step in steps {
                if step.delay_ms > 0 {
                    sleep(Duration::from_millis(step.delay_ms)).await;
                }

                match step.kind {
                    MockStepKind::Delta(text) => yield Ok(StreamChunk::text(text)),
                    MockStepKind::Abort(message) => {
                        yield Err(LlmError::Stream(message));
                        return;
                    }
                    MockStepKind::Unavailable(message) => {
                        yield Err(LlmError::Provider {
                            status: 503,
                            message,
                        });
                        return;
                    }
                }
            }

            yield Ok(StreamChunk::final_chunk(FinishReason::Stop));
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelEntry>> {
        self.model_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.models.clone())
    }
}
