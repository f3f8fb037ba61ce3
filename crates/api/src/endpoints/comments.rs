//! Comment endpoints.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use taskyflow_common::AppResult;
use taskyflow_core::{
    CommentView, CreateCommentInput, UpdateCommentInput,
    thread::{ThreadEntry, flatten},
};
use taskyflow_db::entities::comment;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Comment response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub todo_id: String,
    pub user_id: String,
    pub parent_comment_id: Option<String>,
    pub body: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<comment::Model> for CommentResponse {
    fn from(c: comment::Model) -> Self {
        Self {
            id: c.id,
            todo_id: c.todo_id,
            user_id: c.user_id,
            parent_comment_id: c.parent_comment_id,
            body: c.body,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.map(|d| d.to_rfc3339()),
        }
    }
}

/// Create comment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub todo_id: String,
    pub body: String,
    pub parent_comment_id: Option<String>,
}

/// Post a comment or a reply.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let input = CreateCommentInput {
        todo_id: req.todo_id,
        body: req.body,
        parent_comment_id: req.parent_comment_id,
    };

    let comment = state.comment_service.create(&user.id, input).await?;
    Ok(ApiResponse::ok(comment.into()))
}

/// Comment tree request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeRequest {
    pub todo_id: String,
}

/// Get the threaded discussion on a todo.
///
/// Comments come back flat in thread pre-order, each with its `depth`, so
/// arbitrarily deep reply chains stay shallow on the wire.
async fn tree(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TreeRequest>,
) -> AppResult<ApiResponse<Vec<ThreadEntry<CommentView>>>> {
    let tree = state.comment_service.tree(&user.id, &req.todo_id).await?;
    Ok(ApiResponse::ok(flatten(&tree)))
}

/// Edit comment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentRequest {
    pub comment_id: String,
    pub body: String,
}

/// Edit a comment.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateCommentRequest>,
) -> AppResult<ApiResponse<CommentResponse>> {
    let comment = state
        .comment_service
        .update(&user.id, &req.comment_id, UpdateCommentInput { body: req.body })
        .await?;
    Ok(ApiResponse::ok(comment.into()))
}

/// Delete comment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCommentRequest {
    pub comment_id: String,
}

/// Delete a comment.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<DeleteCommentRequest>,
) -> AppResult<ApiResponse<()>> {
    state
        .comment_service
        .delete(&user.id, &req.comment_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/tree", post(tree))
        .route("/update", post(update))
        .route("/delete", post(delete))
}
