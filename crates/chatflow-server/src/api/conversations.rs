use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use chatflow_storage::{Conversation, Message};

#[derive(Debug, Deserialize, Default)]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

// POST /api/conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    Json(request): Json<CreateConversationRequest>,
) -> Result<Json<Conversation>, ApiError> {
    let conversation = Conversation::new(request.model);
    state.storage.conversations.create(&conversation)?;
    Ok(Json(conversation))
}

// GET /api/conversations/{id}/messages
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessagesResponse>, ApiError> {
    if state.storage.conversations.get(&id)?.is_none() {
        return Err(ApiError::not_found("Conversation"));
    }

    let messages = state.storage.messages.list(&id)?;
    Ok(Json(MessagesResponse { messages }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_state;

    #[tokio::test]
    async fn test_create_then_list_messages() {
        let (_guard, state) = test_state();

        let created = create_conversation(
            State(state.clone()),
            Json(CreateConversationRequest {
                model: Some("vendor/model:free".to_string()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(created.0.model.as_deref(), Some("vendor/model:free"));

        let listed = list_messages(State(state), Path(created.0.id.clone()))
            .await
            .unwrap();
        assert!(listed.0.messages.is_empty());
    }

    #[tokio::test]
    async fn test_list_messages_for_unknown_conversation_is_404() {
        let (_guard, state) = test_state();

        let error = list_messages(State(state), Path("missing".to_string()))
            .await
            .unwrap_err();
        assert_eq!(error.status, axum::http::StatusCode::NOT_FOUND);
    }
}
