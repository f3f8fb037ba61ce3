//! API endpoints.

mod auth;
mod comments;
mod messaging;
mod meta;
mod notifications;
mod reactions;
mod todos;
mod users;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .nest("/meta", meta::router())
        .nest("/todos", todos::router())
        .nest("/comments", comments::router())
        .nest("/reactions", reactions::router())
        .nest("/messaging", messaging::router())
        .nest("/notifications", notifications::router())
}
