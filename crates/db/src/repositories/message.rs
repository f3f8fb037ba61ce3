//! Direct message repository.

use std::sync::Arc;

use crate::entities::{Message, message};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use taskyflow_common::{AppError, AppResult};

/// Message repository for database operations.
#[derive(Clone)]
pub struct MessageRepository {
    db: Arc<DatabaseConnection>,
}

impl MessageRepository {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new message.
    pub async fn create(&self, model: message::ActiveModel) -> AppResult<message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a message by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<message::Model>> {
        Message::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a message by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<message::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message {id}")))
    }

    /// Get messages in a conversation, oldest first (paginated).
    ///
    /// `until_id` returns the page just before that message, so a client can
    /// walk back through history.
    pub async fn find_by_conversation(
        &self,
        conversation_id: &str,
        limit: u64,
        since_id: Option<&str>,
        until_id: Option<&str>,
    ) -> AppResult<Vec<message::Model>> {
        let mut query = Message::find().filter(message::Column::ConversationId.eq(conversation_id));

        if let Some(id) = since_id {
            query = query.filter(message::Column::Id.gt(id));
        }

        if let Some(id) = until_id {
            let mut page = query
                .filter(message::Column::Id.lt(id))
                .order_by_desc(message::Column::Id)
                .limit(limit)
                .all(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            page.reverse();
            return Ok(page);
        }

        query
            .order_by_asc(message::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the latest message in a conversation.
    pub async fn find_latest_in_conversation(
        &self,
        conversation_id: &str,
    ) -> AppResult<Option<message::Model>> {
        Message::find()
            .filter(message::Column::ConversationId.eq(conversation_id))
            .order_by_desc(message::Column::Id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get live messages in the given conversations that `user_id` did not send.
    ///
    /// These are the only messages that can be unread for that user.
    pub async fn find_unread_candidates(
        &self,
        conversation_ids: &[String],
        user_id: &str,
    ) -> AppResult<Vec<message::Model>> {
        if conversation_ids.is_empty() {
            return Ok(vec![]);
        }

        Message::find()
            .filter(message::Column::ConversationId.is_in(conversation_ids.to_vec()))
            .filter(message::Column::SenderId.ne(user_id))
            .filter(message::Column::DeletedAt.is_null())
            .order_by_asc(message::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Soft-delete a message.
    pub async fn soft_delete(
        &self,
        model: message::Model,
        at: sea_orm::prelude::DateTimeWithTimeZone,
    ) -> AppResult<message::Model> {
        let mut active: message::ActiveModel = model.into();
        active.deleted_at = Set(Some(at));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_message(id: &str, sender_id: &str) -> message::Model {
        message::Model {
            id: id.to_string(),
            conversation_id: "conv1".to_string(),
            sender_id: sender_id.to_string(),
            body: "hello".to_string(),
            created_at: Utc::now().into(),
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_until_id_page_is_returned_oldest_first() {
        // Database returns newest-first for the backwards page
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_message("m3", "alice"),
                    create_test_message("m2", "bob"),
                ]])
                .into_connection(),
        );

        let repo = MessageRepository::new(db);
        let page = repo
            .find_by_conversation("conv1", 2, None, Some("m4"))
            .await
            .unwrap();

        let ids: Vec<_> = page.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m3"]);
    }

    #[tokio::test]
    async fn test_unread_candidates_empty_input() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = MessageRepository::new(db);
        let result = repo.find_unread_candidates(&[], "alice").await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<message::Model>::new()])
                .into_connection(),
        );

        let repo = MessageRepository::new(db);
        assert!(matches!(
            repo.get_by_id("m404").await,
            Err(AppError::NotFound(_))
        ));
    }
}
