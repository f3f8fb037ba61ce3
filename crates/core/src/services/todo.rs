//! Todo service.

use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::Deserialize;
use taskyflow_common::{AppError, AppResult, IdGenerator};
use taskyflow_db::{
    entities::{
        reaction::ReactionTargetType,
        todo::{self, TodoPriority, TodoStatus, TodoVisibility},
    },
    repositories::{CommentRepository, ReactionRepository, TodoRepository},
};
use validator::Validate;

/// Todo service for business logic.
#[derive(Clone)]
pub struct TodoService {
    todo_repo: TodoRepository,
    comment_repo: CommentRepository,
    reaction_repo: ReactionRepository,
    id_gen: IdGenerator,
}

/// Input for creating a todo.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTodoInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    pub visibility: Option<TodoVisibility>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Input for updating a todo. `None` leaves a field unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTodoInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,

    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    pub visibility: Option<TodoVisibility>,

    /// `Some(None)` clears the due date.
    pub due_date: Option<Option<DateTime<Utc>>>,
}

const MAX_DESCRIPTION_CHARS: usize = 5000;

impl TodoService {
    /// Create a new todo service.
    #[must_use]
    pub const fn new(
        todo_repo: TodoRepository,
        comment_repo: CommentRepository,
        reaction_repo: ReactionRepository,
    ) -> Self {
        Self {
            todo_repo,
            comment_repo,
            reaction_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a todo owned by `user_id`.
    pub async fn create(&self, user_id: &str, input: CreateTodoInput) -> AppResult<todo::Model> {
        input.validate()?;

        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("title must not be blank".to_string()));
        }

        let model = todo::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            title: Set(title),
            description: Set(input.description.filter(|d| !d.trim().is_empty())),
            status: Set(input.status.unwrap_or_default()),
            priority: Set(input.priority.unwrap_or_default()),
            visibility: Set(input.visibility.unwrap_or_default()),
            due_date: Set(input.due_date.map(Into::into)),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let todo = self.todo_repo.create(model).await?;
        tracing::debug!(todo_id = %todo.id, user_id = %user_id, "Todo created");
        Ok(todo)
    }

    /// Get a todo the user is allowed to see.
    ///
    /// A private todo owned by someone else is reported as not found.
    pub async fn get_visible(&self, user_id: &str, todo_id: &str) -> AppResult<todo::Model> {
        let todo = self.todo_repo.get_by_id(todo_id).await?;
        if !todo.is_visible_to(user_id) {
            return Err(AppError::TodoNotFound(todo_id.to_string()));
        }
        Ok(todo)
    }

    /// List the user's own todos.
    pub async fn list_own(
        &self,
        user_id: &str,
        status: Option<TodoStatus>,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<todo::Model>> {
        self.todo_repo
            .find_by_user(user_id, status, limit, until_id)
            .await
    }

    /// List public todos from everyone.
    pub async fn list_public(
        &self,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<todo::Model>> {
        self.todo_repo.find_public(limit, until_id).await
    }

    /// Update a todo. Owner only.
    pub async fn update(
        &self,
        user_id: &str,
        todo_id: &str,
        input: UpdateTodoInput,
    ) -> AppResult<todo::Model> {
        input.validate()?;

        let todo = self.get_owned(user_id, todo_id).await?;
        let mut active: todo::ActiveModel = todo.into();

        if let Some(title) = input.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(AppError::Validation("title must not be blank".to_string()));
            }
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            if description
                .as_ref()
                .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_CHARS)
            {
                return Err(AppError::Validation("description is too long".to_string()));
            }
            active.description = Set(description.filter(|d| !d.trim().is_empty()));
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        if let Some(priority) = input.priority {
            active.priority = Set(priority);
        }
        if let Some(visibility) = input.visibility {
            active.visibility = Set(visibility);
        }
        if let Some(due_date) = input.due_date {
            active.due_date = Set(due_date.map(Into::into));
        }

        active.updated_at = Set(Some(Utc::now().into()));

        self.todo_repo.update(active).await
    }

    /// Delete a todo with its discussion. Owner only.
    pub async fn delete(&self, user_id: &str, todo_id: &str) -> AppResult<()> {
        let todo = self.get_owned(user_id, todo_id).await?;

        // Reactions are polymorphic and have no foreign key to cascade on
        let comment_ids = self.comment_repo.find_ids_by_todo(&todo.id).await?;
        self.reaction_repo
            .delete_by_targets(ReactionTargetType::Comment, &comment_ids)
            .await?;
        self.reaction_repo
            .delete_by_targets(ReactionTargetType::Todo, std::slice::from_ref(&todo.id))
            .await?;

        self.todo_repo.delete(&todo.id).await?;
        tracing::debug!(todo_id = %todo.id, "Todo deleted");
        Ok(())
    }

    async fn get_owned(&self, user_id: &str, todo_id: &str) -> AppResult<todo::Model> {
        let todo = self.get_visible(user_id, todo_id).await?;
        if todo.user_id != user_id {
            return Err(AppError::Forbidden(
                "Only the owner can change this todo".to_string(),
            ));
        }
        Ok(todo)
    }
}
