//! Todo repository.

use std::sync::Arc;

use crate::entities::{
    Todo,
    todo::{self, TodoStatus, TodoVisibility},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use taskyflow_common::{AppError, AppResult};

/// Todo repository for database operations.
#[derive(Clone)]
pub struct TodoRepository {
    db: Arc<DatabaseConnection>,
}

impl TodoRepository {
    /// Create a new todo repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a todo by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<todo::Model>> {
        Todo::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a todo by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<todo::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::TodoNotFound(id.to_string()))
    }

    /// Create a new todo.
    pub async fn create(&self, model: todo::ActiveModel) -> AppResult<todo::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a todo.
    pub async fn update(&self, model: todo::ActiveModel) -> AppResult<todo::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a todo. Comments go with it through the foreign key.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Todo::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a user's todos, newest first (paginated).
    pub async fn find_by_user(
        &self,
        user_id: &str,
        status: Option<TodoStatus>,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<todo::Model>> {
        let mut query = Todo::find()
            .filter(todo::Column::UserId.eq(user_id))
            .order_by_desc(todo::Column::Id);

        if let Some(status) = status {
            query = query.filter(todo::Column::Status.eq(status));
        }

        if let Some(id) = until_id {
            query = query.filter(todo::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get public todos from everyone, newest first (paginated).
    pub async fn find_public(
        &self,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<todo::Model>> {
        let mut query = Todo::find()
            .filter(todo::Column::Visibility.eq(TodoVisibility::Public))
            .order_by_desc(todo::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(todo::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
