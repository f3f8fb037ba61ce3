//! Notification service.
//!
//! Owns the durable side of fan-out: it resolves the target of an authored
//! event, plans recipients with [`crate::fanout`], and writes one row per
//! recipient. Fan-out is best-effort. Lookups or inserts that fail are
//! logged and skipped, and the `notify_*` methods never return an error, so
//! the action that triggered them always stands on its own.

use sea_orm::Set;
use taskyflow_common::{AppError, AppResult, IdGenerator};
use taskyflow_db::{
    entities::{
        comment, message,
        notification::{self, NotificationType},
        reaction::ReactionTargetType,
    },
    repositories::{
        CommentRepository, ConversationRepository, MessageRepository, NotificationRepository,
        TodoRepository, UserRepository,
    },
};

use crate::fanout::{NotificationEvent, PlannedNotification, ReactionTarget};

/// Name used when the actor cannot be looked up.
const UNKNOWN_ACTOR: &str = "Someone";

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    user_repo: UserRepository,
    todo_repo: TodoRepository,
    comment_repo: CommentRepository,
    message_repo: MessageRepository,
    conversation_repo: ConversationRepository,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(
        notification_repo: NotificationRepository,
        user_repo: UserRepository,
        todo_repo: TodoRepository,
        comment_repo: CommentRepository,
        message_repo: MessageRepository,
        conversation_repo: ConversationRepository,
    ) -> Self {
        Self {
            notification_repo,
            user_repo,
            todo_repo,
            comment_repo,
            message_repo,
            conversation_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Notify about a new comment or reply.
    pub async fn notify_comment(
        &self,
        actor_id: &str,
        comment: &comment::Model,
    ) -> Vec<notification::Model> {
        match self.try_notify_comment(actor_id, comment).await {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!(error = %e, comment_id = %comment.id, "Comment fan-out failed");
                vec![]
            }
        }
    }

    /// Notify about a new reaction.
    pub async fn notify_reaction(
        &self,
        actor_id: &str,
        target_type: ReactionTargetType,
        target_id: &str,
        emoji: &str,
    ) -> Vec<notification::Model> {
        match self
            .try_notify_reaction(actor_id, target_type, target_id, emoji)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!(error = %e, target_id = %target_id, "Reaction fan-out failed");
                vec![]
            }
        }
    }

    /// Notify every other participant about a new message.
    pub async fn notify_message(
        &self,
        actor_id: &str,
        message: &message::Model,
    ) -> Vec<notification::Model> {
        match self.try_notify_message(actor_id, message).await {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!(error = %e, message_id = %message.id, "Message fan-out failed");
                vec![]
            }
        }
    }

    async fn try_notify_comment(
        &self,
        actor_id: &str,
        comment: &comment::Model,
    ) -> AppResult<Vec<notification::Model>> {
        let Some(todo) = self.todo_repo.find_by_id(&comment.todo_id).await? else {
            return Ok(vec![]);
        };

        match comment.parent_comment_id.as_deref() {
            None => Ok(self
                .deliver(actor_id, NotificationEvent::Comment { todo: &todo })
                .await),
            Some(parent_id) => {
                let Some(parent) = self.comment_repo.find_by_id(parent_id).await? else {
                    return Ok(vec![]);
                };
                Ok(self
                    .deliver(
                        actor_id,
                        NotificationEvent::Reply {
                            todo: &todo,
                            parent: &parent,
                        },
                    )
                    .await)
            }
        }
    }

    async fn try_notify_reaction(
        &self,
        actor_id: &str,
        target_type: ReactionTargetType,
        target_id: &str,
        emoji: &str,
    ) -> AppResult<Vec<notification::Model>> {
        match target_type {
            ReactionTargetType::Todo => {
                let Some(todo) = self.todo_repo.find_by_id(target_id).await? else {
                    return Ok(vec![]);
                };
                let event = NotificationEvent::Reaction {
                    target: ReactionTarget::Todo(&todo),
                    emoji,
                };
                Ok(self.deliver(actor_id, event).await)
            }
            ReactionTargetType::Comment => {
                let Some(comment) = self.comment_repo.find_by_id(target_id).await? else {
                    return Ok(vec![]);
                };
                let Some(todo) = self.todo_repo.find_by_id(&comment.todo_id).await? else {
                    return Ok(vec![]);
                };
                let event = NotificationEvent::Reaction {
                    target: ReactionTarget::Comment {
                        comment: &comment,
                        todo: &todo,
                    },
                    emoji,
                };
                Ok(self.deliver(actor_id, event).await)
            }
            ReactionTargetType::Message => {
                let Some(message) = self.message_repo.find_by_id(target_id).await? else {
                    return Ok(vec![]);
                };
                if message.is_deleted() {
                    return Ok(vec![]);
                }
                let event = NotificationEvent::Reaction {
                    target: ReactionTarget::Message(&message),
                    emoji,
                };
                Ok(self.deliver(actor_id, event).await)
            }
        }
    }

    async fn try_notify_message(
        &self,
        actor_id: &str,
        message: &message::Model,
    ) -> AppResult<Vec<notification::Model>> {
        let participant_ids = self
            .conversation_repo
            .find_participant_ids(&message.conversation_id)
            .await?;

        let event = NotificationEvent::Message {
            message,
            participant_ids: &participant_ids,
        };
        Ok(self.deliver(actor_id, event).await)
    }

    /// Write one notification per planned recipient, skipping failures.
    async fn deliver(
        &self,
        actor_id: &str,
        event: NotificationEvent<'_>,
    ) -> Vec<notification::Model> {
        if event.recipients(actor_id).is_empty() {
            return vec![];
        }

        let actor_name = self.actor_name(actor_id).await;
        let planned = event.plan(actor_id, &actor_name);

        let mut created = Vec::with_capacity(planned.len());
        for p in planned {
            let recipient = p.recipient_user_id.clone();
            match self.insert(actor_id, p).await {
                Ok(n) => created.push(n),
                Err(e) => tracing::warn!(
                    error = %e,
                    recipient_user_id = %recipient,
                    "Failed to create notification"
                ),
            }
        }

        tracing::debug!(
            actor_id = %actor_id,
            notification_type = ?event.notification_type(),
            count = created.len(),
            "Fan-out complete"
        );
        created
    }

    async fn actor_name(&self, actor_id: &str) -> String {
        match self.user_repo.find_by_id(actor_id).await {
            Ok(Some(user)) => user.display_name().to_string(),
            Ok(None) => UNKNOWN_ACTOR.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, actor_id = %actor_id, "Failed to load actor");
                UNKNOWN_ACTOR.to_string()
            }
        }
    }

    async fn insert(
        &self,
        actor_id: &str,
        planned: PlannedNotification,
    ) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            recipient_user_id: Set(planned.recipient_user_id),
            actor_user_id: Set(actor_id.to_string()),
            notification_type: Set(planned.notification_type),
            title: Set(planned.title),
            message: Set(planned.message),
            related_id: Set(planned.related_id),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        };

        self.notification_repo.create(model).await
    }

    /// Get notifications for a user.
    pub async fn get_notifications(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
        types: Option<&[NotificationType]>,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_recipient(user_id, limit, until_id, unread_only, types)
            .await
    }

    /// Mark a notification as read.
    pub async fn mark_as_read(&self, user_id: &str, notification_id: &str) -> AppResult<()> {
        let notification = self.get_own(user_id, notification_id).await?;
        self.notification_repo.mark_as_read(notification).await
    }

    /// Mark all notifications as read for a user.
    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(user_id).await
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    /// Delete a notification.
    pub async fn delete(&self, user_id: &str, notification_id: &str) -> AppResult<()> {
        let notification = self.get_own(user_id, notification_id).await?;
        self.notification_repo.delete(&notification.id).await
    }

    /// Delete all notifications for a user.
    pub async fn delete_all(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.delete_all_for_user(user_id).await
    }

    async fn get_own(&self, user_id: &str, notification_id: &str) -> AppResult<notification::Model> {
        // Someone else's notification looks the same as a missing one
        self.notification_repo
            .find_by_id(notification_id)
            .await?
            .filter(|n| n.recipient_user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("Notification {notification_id}")))
    }
}
