use std::convert::Infallible;

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{ApiError, AppState};
use chatflow_core::{ChannelEventWriter, SseFrame, StreamOrchestrator, StreamRequest};

const FRAME_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Deserialize)]
pub struct StreamMessageRequest {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
}

// POST /api/conversations/{id}/messages - long-lived text/event-stream body.
//
// Failures before the stream opens return plain JSON with a mapped status;
// anything after that travels as the terminal SSE data frame.
pub async fn stream_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StreamMessageRequest>,
) -> Result<Response, ApiError> {
    StreamOrchestrator::validate_message(&request.message)?;
    if state.storage.conversations.get(&id)?.is_none() {
        return Err(ApiError::not_found("Conversation"));
    }

    let (tx, rx) = mpsc::channel::<String>(FRAME_CHANNEL_CAPACITY);
    let orchestrator = state.orchestrator.clone();
    let stream_request = StreamRequest {
        message: request.message,
        model: request.model,
    };

    // The worker outlives the response body on purpose: a client that
    // disconnects stops receiving frames, while generation, persistence and
    // channel broadcasting run to completion for the other subscribers.
    tokio::spawn(async move {
        let mut writer = ChannelEventWriter::new(tx.clone());
        let terminal = match orchestrator
            .stream_message(&id, stream_request, &mut writer)
            .await
        {
            Ok(_) => json!({"status": "ok"}),
            Err(error) => json!({"error": error.user_message(), "code": error.code()}),
        };
        let _ = tx.send(SseFrame::Data(terminal).render()).await;
    });

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(body)
        .map_err(|error| ApiError::internal(error.to_string()))
}
