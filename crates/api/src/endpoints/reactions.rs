//! Reaction endpoints.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use taskyflow_common::AppResult;
use taskyflow_core::ReactionSummary;
use taskyflow_db::entities::reaction::{self, ReactionTargetType};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Reaction response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionResponse {
    pub id: String,
    pub user_id: String,
    pub target_type: ReactionTargetType,
    pub target_id: String,
    pub emoji: String,
    pub created_at: String,
}

impl From<reaction::Model> for ReactionResponse {
    fn from(r: reaction::Model) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            target_type: r.target_type,
            target_id: r.target_id,
            emoji: r.emoji,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

/// Toggle reaction request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleReactionRequest {
    pub target_type: ReactionTargetType,
    pub target_id: String,
    pub emoji: String,
}

/// Toggle reaction response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleReactionResponse {
    /// `false` when an existing reaction was removed.
    pub added: bool,
    pub reaction: ReactionResponse,
}

/// Add a reaction, or remove it if already present.
async fn toggle(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ToggleReactionRequest>,
) -> AppResult<ApiResponse<ToggleReactionResponse>> {
    let outcome = state
        .reaction_service
        .toggle(&user.id, req.target_type, &req.target_id, &req.emoji)
        .await?;

    Ok(ApiResponse::ok(ToggleReactionResponse {
        added: outcome.added,
        reaction: outcome.reaction.into(),
    }))
}

/// Reaction summary request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub target_type: ReactionTargetType,
    pub target_id: String,
}

/// Get reaction counts on a target.
async fn summary(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SummaryRequest>,
) -> AppResult<ApiResponse<Vec<ReactionSummary>>> {
    let summary = state
        .reaction_service
        .summary(&user.id, req.target_type, &req.target_id)
        .await?;
    Ok(ApiResponse::ok(summary))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/toggle", post(toggle))
        .route("/summary", post(summary))
}
