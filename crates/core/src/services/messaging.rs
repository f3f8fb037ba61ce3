//! Messaging service.
//!
//! Direct conversations between users, with per-user read markers. Which
//! messages count as unread is decided by [`crate::read_state`].

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{Set, prelude::DateTimeWithTimeZone};
use serde::{Deserialize, Serialize};
use taskyflow_common::{AppError, AppResult, IdGenerator};
use taskyflow_db::{
    entities::{conversation, conversation_participant, message, message_read},
    repositories::{
        ConversationRepository, MessageReadRepository, MessageRepository, UserRepository,
    },
};
use validator::Validate;

use super::{notification::NotificationService, user::UserSummary};
use crate::read_state;

/// Messaging service for business logic.
#[derive(Clone)]
pub struct MessagingService {
    conversation_repo: ConversationRepository,
    message_repo: MessageRepository,
    message_read_repo: MessageReadRepository,
    user_repo: UserRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

/// Input for sending a message.
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageInput {
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
}

/// A message as seen by one viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub conversation_id: String,
    /// User who sent the message.
    pub sender_id: String,
    /// `None` once the message is deleted.
    pub body: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    /// Set once the sender deleted the message.
    pub is_deleted: bool,
    /// Whether the viewer has a read marker for this message.
    pub is_read: bool,
}

impl MessageView {
    /// Builds the view, hiding the body of a deleted message.
    #[must_use]
    pub fn new(message: message::Model, is_read: bool) -> Self {
        let is_deleted = message.is_deleted();
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            body: (!is_deleted).then_some(message.body),
            created_at: message.created_at,
            is_deleted,
            is_read,
        }
    }
}

/// A conversation in the viewer's list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub created_at: DateTimeWithTimeZone,
    /// Time of the newest message; `None` before the first one.
    pub last_message_at: Option<DateTimeWithTimeZone>,
    /// Everyone in the conversation, viewer included.
    pub participants: Vec<UserSummary>,
    pub last_message: Option<MessageView>,
    /// Messages from others the viewer has not marked read.
    pub unread_count: u64,
}

impl MessagingService {
    /// Create a new messaging service.
    #[must_use]
    pub const fn new(
        conversation_repo: ConversationRepository,
        message_repo: MessageRepository,
        message_read_repo: MessageReadRepository,
        user_repo: UserRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            conversation_repo,
            message_repo,
            message_read_repo,
            user_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Open a two-party conversation, reusing an existing one.
    pub async fn start_conversation(
        &self,
        user_id: &str,
        partner_id: &str,
    ) -> AppResult<conversation::Model> {
        if user_id == partner_id {
            return Err(AppError::BadRequest(
                "Cannot start a conversation with yourself".to_string(),
            ));
        }
        self.user_repo.get_by_id(partner_id).await?;

        if let Some(existing) = self
            .conversation_repo
            .find_direct(user_id, partner_id)
            .await?
        {
            return Ok(existing);
        }

        let now: DateTimeWithTimeZone = Utc::now().into();
        let conversation = self
            .conversation_repo
            .create(conversation::ActiveModel {
                id: Set(self.id_gen.generate()),
                created_at: Set(now),
                last_message_at: Set(None),
            })
            .await?;

        for member in [user_id, partner_id] {
            self.conversation_repo
                .add_participant(conversation_participant::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    conversation_id: Set(conversation.id.clone()),
                    user_id: Set(member.to_string()),
                    created_at: Set(now),
                })
                .await?;
        }

        tracing::info!(conversation_id = %conversation.id, "Conversation started");
        Ok(conversation)
    }

    /// Post a message and notify the other participants.
    pub async fn send(
        &self,
        user_id: &str,
        conversation_id: &str,
        input: SendMessageInput,
    ) -> AppResult<message::Model> {
        input.validate()?;

        let body = input.body.trim().to_string();
        if body.is_empty() {
            return Err(AppError::Validation("body must not be blank".to_string()));
        }

        let conversation = self.get_as_participant(user_id, conversation_id).await?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let message = self
            .message_repo
            .create(message::ActiveModel {
                id: Set(self.id_gen.generate()),
                conversation_id: Set(conversation.id.clone()),
                sender_id: Set(user_id.to_string()),
                body: Set(body),
                created_at: Set(now),
                deleted_at: Set(None),
            })
            .await?;

        self.conversation_repo.touch(conversation, now).await?;
        tracing::debug!(message_id = %message.id, conversation_id = %message.conversation_id, "Message sent");

        self.notification_service
            .notify_message(user_id, &message)
            .await;

        Ok(message)
    }

    /// List the user's conversations, most recent first.
    pub async fn list_conversations(&self, user_id: &str) -> AppResult<Vec<ConversationSummary>> {
        let conversations = self.conversation_repo.find_by_user(user_id).await?;
        if conversations.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = conversations.iter().map(|c| c.id.clone()).collect();
        let members = self.conversation_repo.find_participant_ids_for(&ids).await?;

        let mut user_ids: Vec<String> = members.values().flatten().cloned().collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let users: HashMap<String, UserSummary> = self
            .user_repo
            .find_by_ids(&user_ids)
            .await?
            .iter()
            .map(|u| (u.id.clone(), UserSummary::from(u)))
            .collect();

        let candidates = self
            .message_repo
            .find_unread_candidates(&ids, user_id)
            .await?;
        let read_ids = self.read_ids_for(user_id, &candidates).await?;
        let unread = read_state::unread_by_conversation(&candidates, user_id, &read_ids);

        let mut summaries = Vec::with_capacity(conversations.len());
        for c in conversations {
            let last_message = match self.message_repo.find_latest_in_conversation(&c.id).await? {
                Some(m) => {
                    let is_read = self
                        .message_read_repo
                        .find(&m.id, user_id)
                        .await?
                        .is_some();
                    Some(MessageView::new(m, is_read))
                }
                None => None,
            };

            let participants: Vec<UserSummary> = members
                .get(&c.id)
                .map(|ids| ids.iter().filter_map(|id| users.get(id).cloned()).collect())
                .unwrap_or_default();

            summaries.push(ConversationSummary {
                unread_count: unread.get(&c.id).copied().unwrap_or(0),
                id: c.id,
                created_at: c.created_at,
                last_message_at: c.last_message_at,
                participants,
                last_message,
            });
        }

        Ok(summaries)
    }

    /// Get messages in a conversation, oldest first, with read flags.
    pub async fn get_messages(
        &self,
        user_id: &str,
        conversation_id: &str,
        limit: u64,
        since_id: Option<&str>,
        until_id: Option<&str>,
    ) -> AppResult<Vec<MessageView>> {
        self.get_as_participant(user_id, conversation_id).await?;

        let messages = self
            .message_repo
            .find_by_conversation(conversation_id, limit, since_id, until_id)
            .await?;
        let read_ids = self.read_ids_for(user_id, &messages).await?;
        let flags = read_state::read_flags(&messages, &read_ids);

        Ok(messages
            .into_iter()
            .zip(flags)
            .map(|(m, (_, is_read))| MessageView::new(m, is_read))
            .collect())
    }

    /// Mark one message as read.
    ///
    /// Returns `true` if a marker was written. Marking again, or marking
    /// one's own message, succeeds without writing.
    pub async fn mark_message_read(&self, user_id: &str, message_id: &str) -> AppResult<bool> {
        let message = self.message_repo.get_by_id(message_id).await?;
        if !self
            .conversation_repo
            .is_participant(&message.conversation_id, user_id)
            .await?
        {
            return Err(AppError::NotFound(format!("Message {message_id}")));
        }

        let already_marked = self
            .message_read_repo
            .find(&message.id, user_id)
            .await?
            .is_some();
        if !read_state::needs_marker(&message, user_id, already_marked) {
            return Ok(false);
        }

        self.insert_marker(&message.id, user_id).await
    }

    /// Mark every unread message in a conversation as read.
    ///
    /// Returns the number of markers written.
    pub async fn mark_conversation_read(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> AppResult<u64> {
        let conversation = self.get_as_participant(user_id, conversation_id).await?;

        let candidates = self
            .message_repo
            .find_unread_candidates(std::slice::from_ref(&conversation.id), user_id)
            .await?;
        let read_ids = self.read_ids_for(user_id, &candidates).await?;

        let mut written = 0;
        for m in candidates
            .iter()
            .filter(|m| read_state::is_unread(m, user_id, &read_ids))
        {
            if self.insert_marker(&m.id, user_id).await? {
                written += 1;
            }
        }

        tracing::debug!(conversation_id = %conversation.id, written, "Conversation marked read");
        Ok(written)
    }

    /// Total unread messages across all of the user's conversations.
    pub async fn unread_total(&self, user_id: &str) -> AppResult<u64> {
        let conversations = self.conversation_repo.find_by_user(user_id).await?;
        let ids: Vec<String> = conversations.into_iter().map(|c| c.id).collect();

        let candidates = self
            .message_repo
            .find_unread_candidates(&ids, user_id)
            .await?;
        let read_ids = self.read_ids_for(user_id, &candidates).await?;

        Ok(read_state::unread_count(&candidates, user_id, &read_ids))
    }

    /// Soft-delete a message. Sender only.
    pub async fn delete_message(
        &self,
        user_id: &str,
        message_id: &str,
    ) -> AppResult<message::Model> {
        let message = self.message_repo.get_by_id(message_id).await?;
        if message.sender_id != user_id {
            return Err(AppError::Forbidden(
                "Only the sender can delete this message".to_string(),
            ));
        }
        if message.is_deleted() {
            return Ok(message);
        }

        let deleted = self
            .message_repo
            .soft_delete(message, Utc::now().into())
            .await?;
        tracing::debug!(message_id = %deleted.id, "Message deleted");
        Ok(deleted)
    }

    async fn get_as_participant(
        &self,
        user_id: &str,
        conversation_id: &str,
    ) -> AppResult<conversation::Model> {
        let conversation = self.conversation_repo.get_by_id(conversation_id).await?;
        if !self
            .conversation_repo
            .is_participant(&conversation.id, user_id)
            .await?
        {
            return Err(AppError::Forbidden(
                "Not a participant in this conversation".to_string(),
            ));
        }
        Ok(conversation)
    }

    async fn read_ids_for(
        &self,
        user_id: &str,
        messages: &[message::Model],
    ) -> AppResult<HashSet<String>> {
        let ids: Vec<String> = messages.iter().map(|m| m.id.clone()).collect();
        self.message_read_repo
            .find_read_message_ids(user_id, &ids)
            .await
    }

    /// Write a read marker. A concurrent writer that got there first counts
    /// as success.
    async fn insert_marker(&self, message_id: &str, user_id: &str) -> AppResult<bool> {
        let model = message_read::ActiveModel {
            id: Set(self.id_gen.generate()),
            message_id: Set(message_id.to_string()),
            user_id: Set(user_id.to_string()),
            read_at: Set(Utc::now().into()),
        };

        match self.message_read_repo.create(model).await {
            Ok(_) => Ok(true),
            Err(e) => {
                if self.message_read_repo.find(message_id, user_id).await?.is_some() {
                    tracing::debug!(message_id = %message_id, "Read marker already written");
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }
}
