//! Meta endpoints.

use axum::{Router, extract::State, routing::post};
use serde::Serialize;

use crate::{middleware::AppState, response::ApiResponse};

/// Server metadata response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaResponse {
    pub name: String,
    pub description: Option<String>,
    pub version: String,
}

/// Get server metadata.
async fn meta(State(state): State<AppState>) -> ApiResponse<MetaResponse> {
    ApiResponse::ok(MetaResponse {
        name: state.instance.name,
        description: state.instance.description,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(meta))
}
