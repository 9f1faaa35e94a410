//! OpenRouter LLM provider (OpenAI-compatible wire format)

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::catalog::ModelEntry;
use crate::client::{ChatMessage, ChatRequest, ChunkStream, FinishReason, LlmClient, StreamChunk};
use crate::error::{LlmError, Result};

/// Fallback model when the requested one is absent from the free catalog.
pub const DEFAULT_MODEL: &str = "meta-llama/llama-3.2-11b-vision-instruct:free";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenRouter client
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenRouterClient {
    /// Create a new OpenRouter client
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
        }
    }

    /// Set custom base URL (for API-compatible services)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    presence_penalty: f32,
    frequency_penalty: f32,
    top_p: f32,
    stream: bool,
}

// Streaming types

#[derive(Deserialize, Debug)]
struct WireStreamResponse {
    choices: Vec<WireStreamChoice>,
}

#[derive(Deserialize, Debug)]
struct WireStreamChoice {
    delta: WireStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct WireStreamDelta {
    content: Option<String>,
}

// Model listing types

#[derive(Deserialize)]
struct WireModelsResponse {
    data: Vec<serde_json::Value>,
}

fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::MaxTokens,
        _ => FinishReason::Error,
    }
}

/// Extract a model entry from one element of the provider listing. Entries
/// that are null or lack an id are dropped, matching the provider's habit of
/// interleaving placeholder rows.
fn parse_model_entry(raw: &serde_json::Value) -> Option<ModelEntry> {
    let id = raw.get("id")?.as_str()?.to_string();
    Some(ModelEntry {
        id,
        name: raw
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        context_length: raw
            .get("context_length")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
        max_completion_tokens: raw
            .pointer("/top_provider/max_completion_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
    })
}

async fn response_to_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    // Truncate error body to keep logs and user-facing errors bounded.
    const MAX_ERROR_BODY: usize = 512;
    let message = if body.len() > MAX_ERROR_BODY {
        format!("{}... [truncated]", &body[..MAX_ERROR_BODY])
    } else {
        body
    };

    LlmError::Provider { status, message }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    fn provider(&self) -> &str {
        "openrouter"
    }

    fn chat_stream(&self, request: ChatRequest) -> ChunkStream {
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let base_url = self.base_url.clone();

        Box::pin(async_stream::stream! {
            let body = WireRequest {
                model: &request.model,
                messages: &request.messages,
                temperature: request.temperature,
                max_tokens: request.max_tokens,
                presence_penalty: request.presence_penalty,
                frequency_penalty: request.frequency_penalty,
                top_p: request.top_p,
                stream: true,
            };

            let response = match client
                .post(format!("{}/chat/completions", base_url))
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(LlmError::Http(e));
                    return;
                }
            };

            if !response.status().is_success() {
                yield Err(response_to_error(response).await);
                return;
            }

            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(LlmError::Stream(format!("stream error: {}", e)));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Process complete SSE events from buffer
                while let Some(pos) = buffer.find("\n\n") {
                    let event_str = buffer[..pos].to_string();
                    buffer = buffer[pos + 2..].to_string();

                    for line in event_str.lines() {
                        if let Some(data) = line.strip_prefix("data: ") {
                            if data.trim() == "[DONE]" {
                                continue;
                            }

                            let parsed: WireStreamResponse = match serde_json::from_str(data) {
                                Ok(p) => p,
                                Err(_) => continue,
                            };

                            for choice in parsed.choices {
                                if let Some(reason) = choice.finish_reason {
                                    yield Ok(StreamChunk::final_chunk(parse_finish_reason(&reason)));
                                    continue;
                                }

                                if let Some(content) = choice.delta.content
                                    && !content.is_empty()
                                {
                                    yield Ok(StreamChunk::text(content));
                                }
                            }
                        }
                    }
                }
            }

            // Salvage a trailing event that lacks its \n\n terminator, e.g.
            // when the connection drops right after the last chunk.
            let remaining = buffer.trim();
            if !remaining.is_empty() {
                for line in remaining.lines() {
                    if let Some(data) = line.strip_prefix("data: ") {
                        if data.trim() == "[DONE]" || data.trim().is_empty() {
                            continue;
                        }
                        if let Ok(parsed) = serde_json::from_str::<WireStreamResponse>(data) {
                            for choice in parsed.choices {
                                if let Some(content) = choice.delta.content
                                    && !content.is_empty()
                                {
                                    yield Ok(StreamChunk::text(content));
                                }
                            }
                        }
                    }
                }
            }
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelEntry>> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(response_to_error(response).await);
        }

        let listing: WireModelsResponse = response.json().await?;
        Ok(listing.data.iter().filter_map(parse_model_entry).collect())
    }
}
