//! Reaction repository.

use std::sync::Arc;

use crate::entities::{
    Reaction,
    reaction::{self, ReactionTargetType},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use taskyflow_common::{AppError, AppResult};

/// Reaction repository for database operations.
#[derive(Clone)]
pub struct ReactionRepository {
    db: Arc<DatabaseConnection>,
}

impl ReactionRepository {
    /// Create a new reaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a specific reaction by a user on a target with an emoji.
    pub async fn find(
        &self,
        user_id: &str,
        target_type: ReactionTargetType,
        target_id: &str,
        emoji: &str,
    ) -> AppResult<Option<reaction::Model>> {
        Reaction::find()
            .filter(reaction::Column::UserId.eq(user_id))
            .filter(reaction::Column::TargetType.eq(target_type))
            .filter(reaction::Column::TargetId.eq(target_id))
            .filter(reaction::Column::Emoji.eq(emoji))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new reaction.
    pub async fn create(&self, model: reaction::ActiveModel) -> AppResult<reaction::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a reaction by ID.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Reaction::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get all reactions on a target in the order they were added.
    pub async fn find_by_target(
        &self,
        target_type: ReactionTargetType,
        target_id: &str,
    ) -> AppResult<Vec<reaction::Model>> {
        Reaction::find()
            .filter(reaction::Column::TargetType.eq(target_type))
            .filter(reaction::Column::TargetId.eq(target_id))
            .order_by_asc(reaction::Column::CreatedAt)
            .order_by_asc(reaction::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete every reaction on the given targets.
    pub async fn delete_by_targets(
        &self,
        target_type: ReactionTargetType,
        target_ids: &[String],
    ) -> AppResult<u64> {
        if target_ids.is_empty() {
            return Ok(0);
        }

        let result = Reaction::delete_many()
            .filter(reaction::Column::TargetType.eq(target_type))
            .filter(reaction::Column::TargetId.is_in(target_ids.to_vec()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
