//! Message read marker repository.

use std::collections::HashSet;
use std::sync::Arc;

use crate::entities::{MessageRead, message_read};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use taskyflow_common::{AppError, AppResult};

/// Read marker repository for database operations.
#[derive(Clone)]
pub struct MessageReadRepository {
    db: Arc<DatabaseConnection>,
}

impl MessageReadRepository {
    /// Create a new read marker repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the marker for a (message, user) pair.
    pub async fn find(
        &self,
        message_id: &str,
        user_id: &str,
    ) -> AppResult<Option<message_read::Model>> {
        MessageRead::find()
            .filter(message_read::Column::MessageId.eq(message_id))
            .filter(message_read::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a marker. Fails if one already exists for the pair.
    pub async fn create(
        &self,
        model: message_read::ActiveModel,
    ) -> AppResult<message_read::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Ids among `message_ids` that `user_id` has read.
    pub async fn find_read_message_ids(
        &self,
        user_id: &str,
        message_ids: &[String],
    ) -> AppResult<HashSet<String>> {
        if message_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows = MessageRead::find()
            .filter(message_read::Column::UserId.eq(user_id))
            .filter(message_read::Column::MessageId.is_in(message_ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|r| r.message_id).collect())
    }
}
