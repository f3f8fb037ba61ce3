//! Reaction service.

use chrono::Utc;
use sea_orm::Set;
use serde::Serialize;
use taskyflow_common::{AppError, AppResult, IdGenerator};
use taskyflow_db::{
    entities::reaction::{self, ReactionTargetType},
    repositories::{
        CommentRepository, ConversationRepository, MessageRepository, ReactionRepository,
        TodoRepository,
    },
};

use super::notification::NotificationService;

/// Longest accepted emoji or shortcode, in characters.
const MAX_EMOJI_CHARS: usize = 32;

/// Reaction service for business logic.
#[derive(Clone)]
pub struct ReactionService {
    reaction_repo: ReactionRepository,
    todo_repo: TodoRepository,
    comment_repo: CommentRepository,
    message_repo: MessageRepository,
    conversation_repo: ConversationRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

/// Result of a toggle.
#[derive(Debug, Clone)]
pub struct ToggleOutcome {
    /// `true` if a reaction was added, `false` if one was removed.
    pub added: bool,
    /// The reaction that was added or removed.
    pub reaction: reaction::Model,
}

/// Reactions on a target grouped by emoji.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionSummary {
    pub emoji: String,
    /// Number of users who reacted with this emoji.
    pub count: u64,
    /// Whether the viewer is one of them.
    pub reacted_by_me: bool,
}

/// Trim an emoji and check that it is usable as a reaction.
pub fn normalize_emoji(raw: &str) -> AppResult<String> {
    let emoji = raw.trim();
    let len = emoji.chars().count();

    if len == 0 || len > MAX_EMOJI_CHARS {
        return Err(AppError::Validation(format!(
            "emoji must be 1 to {MAX_EMOJI_CHARS} characters"
        )));
    }
    if emoji.chars().any(char::is_whitespace) {
        return Err(AppError::Validation(
            "emoji must not contain whitespace".to_string(),
        ));
    }

    Ok(emoji.to_string())
}

/// Group reactions by emoji, keeping the order each emoji was first used.
#[must_use]
pub fn summarize(reactions: &[reaction::Model], viewer_id: &str) -> Vec<ReactionSummary> {
    let mut summary: Vec<ReactionSummary> = Vec::new();

    for r in reactions {
        let mine = r.user_id == viewer_id;
        match summary.iter_mut().find(|s| s.emoji == r.emoji) {
            Some(entry) => {
                entry.count += 1;
                entry.reacted_by_me |= mine;
            }
            None => summary.push(ReactionSummary {
                emoji: r.emoji.clone(),
                count: 1,
                reacted_by_me: mine,
            }),
        }
    }

    summary
}

impl ReactionService {
    /// Create a new reaction service.
    #[must_use]
    pub const fn new(
        reaction_repo: ReactionRepository,
        todo_repo: TodoRepository,
        comment_repo: CommentRepository,
        message_repo: MessageRepository,
        conversation_repo: ConversationRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            reaction_repo,
            todo_repo,
            comment_repo,
            message_repo,
            conversation_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add the reaction, or remove it if the user already left the same one.
    pub async fn toggle(
        &self,
        user_id: &str,
        target_type: ReactionTargetType,
        target_id: &str,
        emoji: &str,
    ) -> AppResult<ToggleOutcome> {
        let emoji = normalize_emoji(emoji)?;
        self.ensure_target_visible(user_id, target_type, target_id)
            .await?;

        if let Some(existing) = self
            .reaction_repo
            .find(user_id, target_type, target_id, &emoji)
            .await?
        {
            self.reaction_repo.delete(&existing.id).await?;
            tracing::debug!(reaction_id = %existing.id, "Reaction removed");
            return Ok(ToggleOutcome {
                added: false,
                reaction: existing,
            });
        }

        let model = reaction::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            target_type: Set(target_type),
            target_id: Set(target_id.to_string()),
            emoji: Set(emoji.clone()),
            created_at: Set(Utc::now().into()),
        };
        let reaction = match self.reaction_repo.create(model).await {
            Ok(reaction) => reaction,
            Err(e) => {
                // An identical toggle may have inserted first; its request
                // already notified the owner.
                let Some(existing) = self
                    .reaction_repo
                    .find(user_id, target_type, target_id, &emoji)
                    .await?
                else {
                    return Err(e);
                };
                tracing::debug!(reaction_id = %existing.id, "Reaction already added");
                return Ok(ToggleOutcome {
                    added: true,
                    reaction: existing,
                });
            }
        };
        tracing::debug!(reaction_id = %reaction.id, target_id = %target_id, "Reaction added");

        self.notification_service
            .notify_reaction(user_id, target_type, target_id, &reaction.emoji)
            .await;

        Ok(ToggleOutcome {
            added: true,
            reaction,
        })
    }

    /// Summarize the reactions on a target for a viewer.
    pub async fn summary(
        &self,
        user_id: &str,
        target_type: ReactionTargetType,
        target_id: &str,
    ) -> AppResult<Vec<ReactionSummary>> {
        self.ensure_target_visible(user_id, target_type, target_id)
            .await?;
        let reactions = self
            .reaction_repo
            .find_by_target(target_type, target_id)
            .await?;
        Ok(summarize(&reactions, user_id))
    }

    async fn ensure_target_visible(
        &self,
        user_id: &str,
        target_type: ReactionTargetType,
        target_id: &str,
    ) -> AppResult<()> {
        match target_type {
            ReactionTargetType::Todo => {
                let todo = self.todo_repo.get_by_id(target_id).await?;
                if !todo.is_visible_to(user_id) {
                    return Err(AppError::TodoNotFound(target_id.to_string()));
                }
            }
            ReactionTargetType::Comment => {
                let comment = self.comment_repo.get_by_id(target_id).await?;
                let todo = self.todo_repo.get_by_id(&comment.todo_id).await?;
                if !todo.is_visible_to(user_id) {
                    return Err(AppError::CommentNotFound(target_id.to_string()));
                }
            }
            ReactionTargetType::Message => {
                let message = self.message_repo.get_by_id(target_id).await?;
                let member = self
                    .conversation_repo
                    .is_participant(&message.conversation_id, user_id)
                    .await?;
                if !member || message.is_deleted() {
                    return Err(AppError::NotFound(format!("Message {target_id}")));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;
    use taskyflow_db::{
        entities::{
            notification::{self, NotificationType},
            todo::{self, TodoPriority, TodoStatus, TodoVisibility},
            user,
        },
        repositories::{NotificationRepository, UserRepository},
    };

    fn empty() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
    }

    fn test_todo(owner: &str) -> todo::Model {
        todo::Model {
            id: "t1".to_string(),
            user_id: owner.to_string(),
            title: "Water plants".to_string(),
            description: None,
            status: TodoStatus::Pending,
            priority: TodoPriority::Medium,
            visibility: TodoVisibility::Public,
            due_date: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_reaction(id: &str, user_id: &str, emoji: &str) -> reaction::Model {
        reaction::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            target_type: ReactionTargetType::Todo,
            target_id: "t1".to_string(),
            emoji: emoji.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            username_lower: id.to_string(),
            name: None,
            password_hash: String::new(),
            token: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    struct Dbs {
        reaction: MockDatabase,
        todo: MockDatabase,
        notif_todo: MockDatabase,
        notif_user: MockDatabase,
        notif: MockDatabase,
    }

    impl Default for Dbs {
        fn default() -> Self {
            Self {
                reaction: empty(),
                todo: empty(),
                notif_todo: empty(),
                notif_user: empty(),
                notif: empty(),
            }
        }
    }

    fn service(dbs: Dbs) -> ReactionService {
        let conn = |db: MockDatabase| Arc::new(db.into_connection());
        let notification_service = NotificationService::new(
            NotificationRepository::new(conn(dbs.notif)),
            UserRepository::new(conn(dbs.notif_user)),
            TodoRepository::new(conn(dbs.notif_todo)),
            CommentRepository::new(conn(empty())),
            MessageRepository::new(conn(empty())),
            ConversationRepository::new(conn(empty())),
        );
        ReactionService::new(
            ReactionRepository::new(conn(dbs.reaction)),
            TodoRepository::new(conn(dbs.todo)),
            CommentRepository::new(conn(empty())),
            MessageRepository::new(conn(empty())),
            ConversationRepository::new(conn(empty())),
            notification_service,
        )
    }

    #[test]
    fn test_normalize_emoji() {
        assert_eq!(normalize_emoji("  👍 ").unwrap(), "👍");
        assert_eq!(normalize_emoji(":party:").unwrap(), ":party:");
        assert!(normalize_emoji("   ").is_err());
        assert!(normalize_emoji("a b").is_err());
        assert!(normalize_emoji(&"x".repeat(33)).is_err());
        assert!(normalize_emoji(&"x".repeat(32)).is_ok());
    }

    #[test]
    fn test_summarize_keeps_first_use_order() {
        let reactions = vec![
            test_reaction("r1", "bob", "🎉"),
            test_reaction("r2", "alice", "👍"),
            test_reaction("r3", "carol", "🎉"),
        ];

        let summary = summarize(&reactions, "alice");

        assert_eq!(
            summary,
            vec![
                ReactionSummary {
                    emoji: "🎉".to_string(),
                    count: 2,
                    reacted_by_me: false,
                },
                ReactionSummary {
                    emoji: "👍".to_string(),
                    count: 1,
                    reacted_by_me: true,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_toggle_adds_and_notifies_owner() {
        let created = test_reaction("r1", "bob", "👍");
        let notification = notification::Model {
            id: "n1".to_string(),
            recipient_user_id: "alice".to_string(),
            actor_user_id: "bob".to_string(),
            notification_type: NotificationType::Reaction,
            title: "New reaction".to_string(),
            message: "bob reacted 👍 to your todo \"Water plants\"".to_string(),
            related_id: Some("t1".to_string()),
            is_read: false,
            created_at: Utc::now().into(),
        };

        let service = service(Dbs {
            todo: empty().append_query_results([[test_todo("alice")]]),
            reaction: empty()
                .append_query_results([Vec::<reaction::Model>::new()])
                .append_query_results([[created]]),
            notif_todo: empty().append_query_results([[test_todo("alice")]]),
            notif_user: empty().append_query_results([[test_user("bob")]]),
            notif: empty().append_query_results([[notification]]),
        });

        let outcome = service
            .toggle("bob", ReactionTargetType::Todo, "t1", " 👍 ")
            .await
            .unwrap();

        assert!(outcome.added);
        assert_eq!(outcome.reaction.emoji, "👍");
    }

    #[tokio::test]
    async fn test_toggle_own_todo_sends_nothing() {
        // Owner reacting to their own todo has no recipients, so no user
        // lookup or insert is queued
        let service = service(Dbs {
            todo: empty().append_query_results([[test_todo("alice")]]),
            reaction: empty()
                .append_query_results([Vec::<reaction::Model>::new()])
                .append_query_results([[test_reaction("r1", "alice", "👍")]]),
            notif_todo: empty().append_query_results([[test_todo("alice")]]),
            ..Default::default()
        });

        let outcome = service
            .toggle("alice", ReactionTargetType::Todo, "t1", "👍")
            .await
            .unwrap();

        assert!(outcome.added);
    }

    #[tokio::test]
    async fn test_toggle_losing_insert_race_returns_existing() {
        // Nothing is queued for the notification side: the concurrent
        // request that won the insert sends it
        let service = service(Dbs {
            todo: empty().append_query_results([[test_todo("alice")]]),
            reaction: empty()
                .append_query_results([Vec::<reaction::Model>::new()])
                .append_query_errors([sea_orm::DbErr::Custom("duplicate key".to_string())])
                .append_query_results([[test_reaction("r0", "bob", "👍")]]),
            ..Default::default()
        });

        let outcome = service
            .toggle("bob", ReactionTargetType::Todo, "t1", "👍")
            .await
            .unwrap();

        assert!(outcome.added);
        assert_eq!(outcome.reaction.id, "r0");
    }

    #[tokio::test]
    async fn test_toggle_insert_failure_without_row_is_an_error() {
        let service = service(Dbs {
            todo: empty().append_query_results([[test_todo("alice")]]),
            reaction: empty()
                .append_query_results([Vec::<reaction::Model>::new()])
                .append_query_errors([sea_orm::DbErr::Custom("connection reset".to_string())])
                .append_query_results([Vec::<reaction::Model>::new()]),
            ..Default::default()
        });

        let result = service
            .toggle("bob", ReactionTargetType::Todo, "t1", "👍")
            .await;

        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_toggle_removes_existing() {
        let service = service(Dbs {
            todo: empty().append_query_results([[test_todo("alice")]]),
            reaction: empty()
                .append_query_results([[test_reaction("r1", "bob", "👍")]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }]),
            ..Default::default()
        });

        let outcome = service
            .toggle("bob", ReactionTargetType::Todo, "t1", "👍")
            .await
            .unwrap();

        assert!(!outcome.added);
        assert_eq!(outcome.reaction.id, "r1");
    }

    #[tokio::test]
    async fn test_toggle_rejects_bad_emoji_before_lookup() {
        let service = service(Dbs::default());

        let result = service
            .toggle("bob", ReactionTargetType::Todo, "t1", "two words")
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
