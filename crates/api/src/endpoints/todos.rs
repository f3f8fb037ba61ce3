//! Todo endpoints.

use axum::{Json, Router, extract::State, routing::post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskyflow_common::AppResult;
use taskyflow_core::{CreateTodoInput, UpdateTodoInput};
use taskyflow_db::entities::todo::{self, TodoPriority, TodoStatus, TodoVisibility};

use crate::{extractors::AuthUser, middleware::AppState, nullable, response::ApiResponse};

/// Todo response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    pub visibility: TodoVisibility,
    pub due_date: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<todo::Model> for TodoResponse {
    fn from(t: todo::Model) -> Self {
        Self {
            id: t.id,
            user_id: t.user_id,
            title: t.title,
            description: t.description,
            status: t.status,
            priority: t.priority,
            visibility: t.visibility,
            due_date: t.due_date.map(|d| d.to_rfc3339()),
            created_at: t.created_at.to_rfc3339(),
            updated_at: t.updated_at.map(|d| d.to_rfc3339()),
        }
    }
}

/// Create todo request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    pub visibility: Option<TodoVisibility>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Create a todo.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateTodoRequest>,
) -> AppResult<ApiResponse<TodoResponse>> {
    let input = CreateTodoInput {
        title: req.title,
        description: req.description,
        status: req.status,
        priority: req.priority,
        visibility: req.visibility,
        due_date: req.due_date,
    };

    let todo = state.todo_service.create(&user.id, input).await?;
    Ok(ApiResponse::ok(todo.into()))
}

/// Request naming a single todo.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoIdRequest {
    pub todo_id: String,
}

/// Show a todo.
async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TodoIdRequest>,
) -> AppResult<ApiResponse<TodoResponse>> {
    let todo = state.todo_service.get_visible(&user.id, &req.todo_id).await?;
    Ok(ApiResponse::ok(todo.into()))
}

/// List own todos request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTodosRequest {
    pub status: Option<TodoStatus>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

/// List public todos request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTodosRequest {
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub until_id: Option<String>,
}

const fn default_limit() -> u64 {
    20
}

const MAX_LIMIT: u64 = 100;

/// List the current user's todos, newest first.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ListTodosRequest>,
) -> AppResult<ApiResponse<Vec<TodoResponse>>> {
    let todos = state
        .todo_service
        .list_own(
            &user.id,
            req.status,
            req.limit.min(MAX_LIMIT),
            req.until_id.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(todos.into_iter().map(Into::into).collect()))
}

/// List public todos from all users, newest first.
async fn public(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<PublicTodosRequest>,
) -> AppResult<ApiResponse<Vec<TodoResponse>>> {
    let todos = state
        .todo_service
        .list_public(req.limit.min(MAX_LIMIT), req.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(todos.into_iter().map(Into::into).collect()))
}

/// Update todo request. Absent fields are left unchanged; `null` clears the
/// optional ones.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    pub todo_id: String,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable::double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    pub visibility: Option<TodoVisibility>,
    #[serde(default, deserialize_with = "nullable::double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

/// Update a todo.
async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateTodoRequest>,
) -> AppResult<ApiResponse<TodoResponse>> {
    let input = UpdateTodoInput {
        title: req.title,
        description: req.description,
        status: req.status,
        priority: req.priority,
        visibility: req.visibility,
        due_date: req.due_date,
    };

    let todo = state
        .todo_service
        .update(&user.id, &req.todo_id, input)
        .await?;
    Ok(ApiResponse::ok(todo.into()))
}

/// Delete a todo.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<TodoIdRequest>,
) -> AppResult<ApiResponse<()>> {
    state.todo_service.delete(&user.id, &req.todo_id).await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create))
        .route("/show", post(show))
        .route("/list", post(list))
        .route("/public", post(public))
        .route("/update", post(update))
        .route("/delete", post(delete))
}
