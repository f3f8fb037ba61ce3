//! Messaging endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use taskyflow_common::AppResult;
use taskyflow_core::{ConversationSummary, MessageView, SendMessageInput};
use taskyflow_db::entities::conversation;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Create messaging router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_conversations))
        .route("/conversations", post(start_conversation))
        .route(
            "/conversations/{conversation_id}/messages",
            get(list_messages).post(send_message),
        )
        .route("/conversations/{conversation_id}/read", post(mark_conversation_read))
        .route("/messages/{message_id}/read", post(mark_message_read))
        .route("/messages/{message_id}", delete(delete_message))
        .route("/unread/count", get(get_unread_count))
}

/// Conversation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: String,
    pub created_at: String,
    pub last_message_at: Option<String>,
}

impl From<conversation::Model> for ConversationResponse {
    fn from(c: conversation::Model) -> Self {
        Self {
            id: c.id,
            created_at: c.created_at.to_rfc3339(),
            last_message_at: c.last_message_at.map(|d| d.to_rfc3339()),
        }
    }
}

/// List the user's conversations, most recent first.
async fn list_conversations(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ConversationSummary>>> {
    let conversations = state.messaging_service.list_conversations(&user.id).await?;
    Ok(ApiResponse::ok(conversations))
}

/// Start conversation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationRequest {
    pub user_id: String,
}

/// Open (or reuse) a direct conversation with another user.
async fn start_conversation(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<StartConversationRequest>,
) -> AppResult<ApiResponse<ConversationResponse>> {
    let conversation = state
        .messaging_service
        .start_conversation(&user.id, &req.user_id)
        .await?;
    Ok(ApiResponse::ok(conversation.into()))
}

/// List messages query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesQuery {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub since_id: Option<String>,
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    20
}

/// Get messages in a conversation, oldest first.
async fn list_messages(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Query(query): Query<ListMessagesQuery>,
) -> AppResult<ApiResponse<Vec<MessageView>>> {
    let messages = state
        .messaging_service
        .get_messages(
            &user.id,
            &conversation_id,
            query.limit.min(100),
            query.since_id.as_deref(),
            query.until_id.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(messages))
}

/// Send message request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub body: String,
}

/// Post a message to a conversation.
async fn send_message(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<ApiResponse<MessageView>> {
    let message = state
        .messaging_service
        .send(&user.id, &conversation_id, SendMessageInput { body: req.body })
        .await?;
    Ok(ApiResponse::ok(MessageView::new(message, false)))
}

/// Mark conversation read response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkConversationReadResponse {
    pub read_count: u64,
}

/// Mark every message in a conversation as read.
async fn mark_conversation_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> AppResult<ApiResponse<MarkConversationReadResponse>> {
    let read_count = state
        .messaging_service
        .mark_conversation_read(&user.id, &conversation_id)
        .await?;
    Ok(ApiResponse::ok(MarkConversationReadResponse { read_count }))
}

/// Mark message read response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkMessageReadResponse {
    /// `false` if the message was already read or is the caller's own.
    pub marked: bool,
}

/// Mark one message as read.
async fn mark_message_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> AppResult<ApiResponse<MarkMessageReadResponse>> {
    let marked = state
        .messaging_service
        .mark_message_read(&user.id, &message_id)
        .await?;
    Ok(ApiResponse::ok(MarkMessageReadResponse { marked }))
}

/// Delete a message.
async fn delete_message(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> AppResult<ApiResponse<MessageView>> {
    tracing::info!(user = %user.id, message = %message_id, "Deleting message");

    let message = state
        .messaging_service
        .delete_message(&user.id, &message_id)
        .await?;
    Ok(ApiResponse::ok(MessageView::new(message, false)))
}

/// Unread count response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCountResponse {
    pub count: u64,
}

/// Get the total number of unread messages.
async fn get_unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UnreadCountResponse>> {
    let count = state.messaging_service.unread_total(&user.id).await?;
    Ok(ApiResponse::ok(UnreadCountResponse { count }))
}
