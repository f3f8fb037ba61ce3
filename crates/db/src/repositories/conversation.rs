//! Conversation repository.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::{
    Conversation, ConversationParticipant, conversation, conversation_participant,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
    sea_query::{NullOrdering, Order},
};
use taskyflow_common::{AppError, AppResult};

/// Conversation repository for database operations.
#[derive(Clone)]
pub struct ConversationRepository {
    db: Arc<DatabaseConnection>,
}

impl ConversationRepository {
    /// Create a new conversation repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a conversation by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<conversation::Model>> {
        Conversation::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a conversation by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<conversation::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ConversationNotFound(id.to_string()))
    }

    /// Create a new conversation.
    pub async fn create(&self, model: conversation::ActiveModel) -> AppResult<conversation::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Add a participant to a conversation.
    pub async fn add_participant(
        &self,
        model: conversation_participant::ActiveModel,
    ) -> AppResult<conversation_participant::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the user ids taking part in a conversation, in join order.
    pub async fn find_participant_ids(&self, conversation_id: &str) -> AppResult<Vec<String>> {
        let participants = ConversationParticipant::find()
            .filter(conversation_participant::Column::ConversationId.eq(conversation_id))
            .order_by_asc(conversation_participant::Column::CreatedAt)
            .order_by_asc(conversation_participant::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(participants.into_iter().map(|p| p.user_id).collect())
    }

    /// Get participants for several conversations, grouped by conversation id.
    pub async fn find_participant_ids_for(
        &self,
        conversation_ids: &[String],
    ) -> AppResult<HashMap<String, Vec<String>>> {
        if conversation_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let participants = ConversationParticipant::find()
            .filter(
                conversation_participant::Column::ConversationId.is_in(conversation_ids.to_vec()),
            )
            .order_by_asc(conversation_participant::Column::CreatedAt)
            .order_by_asc(conversation_participant::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
        for p in participants {
            grouped.entry(p.conversation_id).or_default().push(p.user_id);
        }
        Ok(grouped)
    }

    /// Check whether a user takes part in a conversation.
    pub async fn is_participant(&self, conversation_id: &str, user_id: &str) -> AppResult<bool> {
        let count = ConversationParticipant::find()
            .filter(conversation_participant::Column::ConversationId.eq(conversation_id))
            .filter(conversation_participant::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(count > 0)
    }

    /// Get a user's conversations, most recently active first.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<conversation::Model>> {
        let ids = self.find_conversation_ids_for_user(user_id).await?;
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Conversation::find()
            .filter(conversation::Column::Id.is_in(ids))
            .order_by_with_nulls(
                conversation::Column::LastMessageAt,
                Order::Desc,
                NullOrdering::Last,
            )
            .order_by_desc(conversation::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the conversation whose participants are exactly these two users.
    pub async fn find_direct(
        &self,
        user_id: &str,
        partner_id: &str,
    ) -> AppResult<Option<conversation::Model>> {
        let ids = self.find_conversation_ids_for_user(user_id).await?;
        let grouped = self.find_participant_ids_for(&ids).await?;

        let found = grouped.into_iter().find_map(|(conversation_id, members)| {
            let is_pair = members.len() == 2
                && members.iter().any(|m| m == user_id)
                && members.iter().any(|m| m == partner_id);
            is_pair.then_some(conversation_id)
        });

        match found {
            Some(id) => self.find_by_id(&id).await,
            None => Ok(None),
        }
    }

    /// Record that a message was just posted.
    pub async fn touch(
        &self,
        model: conversation::Model,
        at: sea_orm::prelude::DateTimeWithTimeZone,
    ) -> AppResult<conversation::Model> {
        let mut active: conversation::ActiveModel = model.into();
        active.last_message_at = Set(Some(at));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_conversation_ids_for_user(&self, user_id: &str) -> AppResult<Vec<String>> {
        let rows = ConversationParticipant::find()
            .filter(conversation_participant::Column::UserId.eq(user_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|p| p.conversation_id).collect())
    }
}
