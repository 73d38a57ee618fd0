//! Conversation REST handlers.
//!
//! Endpoints:
//! - GET    /api/conversations               - List the owner's conversations
//! - POST   /api/conversations               - Start a new empty conversation
//! - GET    /api/conversations/{id}/messages - Stored messages, oldest first
//! - POST   /api/conversations/{id}/rename   - Rename a conversation
//! - DELETE /api/conversations/{id}          - Delete a conversation and its messages

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shopchat_core::render::render_markdown;
use shopchat_types::chat::{ChatMessage, Conversation, MessageRole};

use crate::http::error::AppError;
use crate::http::extractors::OwnerId;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for renaming a conversation.
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

/// A stored message as served to the page.
///
/// Assistant messages carry their rendered HTML alongside the raw text.
#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessage> for MessageView {
    fn from(message: ChatMessage) -> Self {
        let html = (message.role == MessageRole::Assistant)
            .then(|| render_markdown(&message.content));
        Self {
            id: message.id,
            role: message.role,
            content: message.content,
            html,
            created_at: message.created_at,
        }
    }
}

/// Parse a UUID from a path parameter, returning a 400 error on invalid format.
pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    s.parse::<Uuid>()
        .map_err(|_| AppError::Validation(format!("Invalid conversation id: {s}")))
}

/// GET /api/conversations - List conversations, most recently active first.
pub async fn list_conversations(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
) -> Result<Json<ApiResponse<Vec<Conversation>>>, AppError> {
    let start = Instant::now();

    let conversations = state
        .chat_service
        .list_for(owner_id, state.config.max_conversations_per_user)
        .await?;

    Ok(Json(
        ApiResponse::timed(conversations, start).with_link("self", "/api/conversations"),
    ))
}

/// POST /api/conversations - Start a new "New Chat" conversation.
pub async fn create_conversation(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
) -> Result<Json<ApiResponse<Conversation>>, AppError> {
    let start = Instant::now();

    let conversation = state.chat_service.start_conversation(owner_id).await?;
    let messages = format!("/api/conversations/{}/messages", conversation.id);
    let chat = format!("/ws/chat/{}", conversation.id);

    Ok(Json(
        ApiResponse::timed(conversation, start)
            .with_link("messages", &messages)
            .with_link("chat", &chat),
    ))
}

/// GET /api/conversations/{id}/messages - Messages of an owned conversation.
pub async fn get_messages(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<MessageView>>>, AppError> {
    let start = Instant::now();
    let conversation_id = parse_uuid(&id)?;

    state
        .chat_service
        .conversation_for(owner_id, &conversation_id)
        .await?;
    let messages = state.chat_service.messages(&conversation_id).await?;
    let views = messages.into_iter().map(MessageView::from).collect();

    Ok(Json(ApiResponse::timed(views, start)))
}

/// POST /api/conversations/{id}/rename - Rename an owned conversation.
pub async fn rename_conversation(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<String>,
    Json(body): Json<RenameRequest>,
) -> Result<Json<ApiResponse<Conversation>>, AppError> {
    let start = Instant::now();
    let conversation_id = parse_uuid(&id)?;

    let conversation = state
        .chat_service
        .rename(owner_id, &conversation_id, &body.title)
        .await?;

    Ok(Json(ApiResponse::timed(conversation, start)))
}

/// DELETE /api/conversations/{id} - Delete an owned conversation.
pub async fn delete_conversation(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let conversation_id = parse_uuid(&id)?;

    state
        .chat_service
        .delete_for(owner_id, &conversation_id)
        .await?;

    Ok(Json(ApiResponse::timed(
        serde_json::json!({ "deleted": conversation_id }),
        start,
    )))
}
