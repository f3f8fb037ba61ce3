//! Comment service.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{Set, prelude::DateTimeWithTimeZone};
use serde::{Deserialize, Serialize};
use taskyflow_common::{AppError, AppResult, IdGenerator};
use taskyflow_db::{
    entities::{comment, reaction::ReactionTargetType, todo},
    repositories::{CommentRepository, ReactionRepository, TodoRepository, UserRepository},
};
use validator::Validate;

use super::{notification::NotificationService, user::UserSummary};
use crate::thread::{ThreadNode, Threaded, build_tree};

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    todo_repo: TodoRepository,
    user_repo: UserRepository,
    reaction_repo: ReactionRepository,
    notification_service: NotificationService,
    id_gen: IdGenerator,
}

/// Input for posting a comment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    pub todo_id: String,

    #[validate(length(min = 1, max = 2000))]
    pub body: String,

    /// Comment being replied to, on the same todo.
    pub parent_comment_id: Option<String>,
}

/// Input for editing a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentInput {
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
}

/// A comment as shown in a thread, with its author resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub todo_id: String,
    /// Author id.
    pub user_id: String,
    /// Comment this one replies to.
    pub parent_comment_id: Option<String>,
    pub body: String,
    pub created_at: DateTimeWithTimeZone,
    /// Set when the body was edited.
    pub updated_at: Option<DateTimeWithTimeZone>,
    /// `None` when the author account no longer exists.
    pub author: Option<UserSummary>,
}

impl Threaded for CommentView {
    fn thread_id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_comment_id.as_deref()
    }
}

impl CommentView {
    fn new(comment: comment::Model, author: Option<UserSummary>) -> Self {
        Self {
            id: comment.id,
            todo_id: comment.todo_id,
            user_id: comment.user_id,
            parent_comment_id: comment.parent_comment_id,
            body: comment.body,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            author,
        }
    }
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        todo_repo: TodoRepository,
        user_repo: UserRepository,
        reaction_repo: ReactionRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            comment_repo,
            todo_repo,
            user_repo,
            reaction_repo,
            notification_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Post a comment or reply and fan out notifications.
    pub async fn create(
        &self,
        user_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<comment::Model> {
        input.validate()?;

        let body = input.body.trim().to_string();
        if body.is_empty() {
            return Err(AppError::Validation("body must not be blank".to_string()));
        }

        let todo = self.get_visible_todo(user_id, &input.todo_id).await?;

        if let Some(parent_id) = input.parent_comment_id.as_deref() {
            let parent = self.comment_repo.get_by_id(parent_id).await?;
            if parent.todo_id != todo.id {
                return Err(AppError::BadRequest(
                    "Parent comment belongs to a different todo".to_string(),
                ));
            }
        }

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            todo_id: Set(todo.id),
            user_id: Set(user_id.to_string()),
            parent_comment_id: Set(input.parent_comment_id),
            body: Set(body),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let comment = self.comment_repo.create(model).await?;
        tracing::debug!(comment_id = %comment.id, todo_id = %comment.todo_id, "Comment created");

        self.notification_service
            .notify_comment(user_id, &comment)
            .await;

        Ok(comment)
    }

    /// Get the discussion on a todo as a forest of threads.
    pub async fn tree(
        &self,
        user_id: &str,
        todo_id: &str,
    ) -> AppResult<Vec<ThreadNode<CommentView>>> {
        let todo = self.get_visible_todo(user_id, todo_id).await?;
        let comments = self.comment_repo.find_by_todo(&todo.id).await?;
        if comments.is_empty() {
            return Ok(vec![]);
        }

        let mut author_ids: Vec<String> = comments.iter().map(|c| c.user_id.clone()).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<String, UserSummary> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .iter()
            .map(|u| (u.id.clone(), UserSummary::from(u)))
            .collect();

        let views = comments
            .into_iter()
            .map(|c| {
                let author = authors.get(&c.user_id).cloned();
                CommentView::new(c, author)
            })
            .collect();

        Ok(build_tree(views))
    }

    /// Edit a comment. Author only.
    pub async fn update(
        &self,
        user_id: &str,
        comment_id: &str,
        input: UpdateCommentInput,
    ) -> AppResult<comment::Model> {
        input.validate()?;

        let body = input.body.trim().to_string();
        if body.is_empty() {
            return Err(AppError::Validation("body must not be blank".to_string()));
        }

        let comment = self.comment_repo.get_by_id(comment_id).await?;
        if comment.user_id != user_id {
            return Err(AppError::Forbidden(
                "Only the author can edit this comment".to_string(),
            ));
        }

        let mut active: comment::ActiveModel = comment.into();
        active.body = Set(body);
        active.updated_at = Set(Some(Utc::now().into()));

        self.comment_repo.update(active).await
    }

    /// Delete a comment. Allowed for its author and the todo owner.
    ///
    /// Replies stay in place and drop out of the thread view.
    pub async fn delete(&self, user_id: &str, comment_id: &str) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        if comment.user_id != user_id {
            let todo = self.todo_repo.get_by_id(&comment.todo_id).await?;
            if todo.user_id != user_id {
                return Err(AppError::Forbidden(
                    "Only the author or todo owner can delete this comment".to_string(),
                ));
            }
        }

        self.reaction_repo
            .delete_by_targets(ReactionTargetType::Comment, std::slice::from_ref(&comment.id))
            .await?;
        self.comment_repo.delete(&comment.id).await?;

        tracing::debug!(comment_id = %comment.id, "Comment deleted");
        Ok(())
    }

    async fn get_visible_todo(&self, user_id: &str, todo_id: &str) -> AppResult<todo::Model> {
        let todo = self.todo_repo.get_by_id(todo_id).await?;
        if !todo.is_visible_to(user_id) {
            return Err(AppError::TodoNotFound(todo_id.to_string()));
        }
        Ok(todo)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::thread::flatten;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;
    use taskyflow_db::{
        entities::{
            notification::{self, NotificationType},
            todo::{TodoPriority, TodoStatus, TodoVisibility},
            user,
        },
        repositories::{ConversationRepository, MessageRepository, NotificationRepository},
    };

    fn empty() -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
    }

    fn test_todo(owner: &str, visibility: TodoVisibility) -> todo::Model {
        todo::Model {
            id: "t1".to_string(),
            user_id: owner.to_string(),
            title: "Plan trip".to_string(),
            description: None,
            status: TodoStatus::Pending,
            priority: TodoPriority::Medium,
            visibility,
            due_date: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_comment(id: &str, author: &str, parent: Option<&str>) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            todo_id: "t1".to_string(),
            user_id: author.to_string(),
            parent_comment_id: parent.map(str::to_string),
            body: format!("comment {id}"),
            created_at: Utc::now().into(),
            updated_at: None,
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

    fn test_notification(recipient: &str) -> notification::Model {
        notification::Model {
            id: "n1".to_string(),
            recipient_user_id: recipient.to_string(),
            actor_user_id: "bob".to_string(),
            notification_type: NotificationType::Comment,
            title: "New comment".to_string(),
            message: "bob commented on \"Plan trip\"".to_string(),
            related_id: Some("t1".to_string()),
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    struct Dbs {
        comment: MockDatabase,
        todo: MockDatabase,
        user: MockDatabase,
        reaction: MockDatabase,
        notif_todo: MockDatabase,
        notif_comment: MockDatabase,
        notif_user: MockDatabase,
        notif: MockDatabase,
    }

    impl Default for Dbs {
        fn default() -> Self {
            Self {
                comment: empty(),
                todo: empty(),
                user: empty(),
                reaction: empty(),
                notif_todo: empty(),
                notif_comment: empty(),
                notif_user: empty(),
                notif: empty(),
            }
        }
    }

    fn service(dbs: Dbs) -> CommentService {
        let conn = |db: MockDatabase| Arc::new(db.into_connection());
        let notification_service = NotificationService::new(
            NotificationRepository::new(conn(dbs.notif)),
            UserRepository::new(conn(dbs.notif_user)),
            TodoRepository::new(conn(dbs.notif_todo)),
            CommentRepository::new(conn(dbs.notif_comment)),
            MessageRepository::new(conn(empty())),
            ConversationRepository::new(conn(empty())),
        );
        CommentService::new(
            CommentRepository::new(conn(dbs.comment)),
            TodoRepository::new(conn(dbs.todo)),
            UserRepository::new(conn(dbs.user)),
            ReactionRepository::new(conn(dbs.reaction)),
            notification_service,
        )
    }

    #[tokio::test]
    async fn test_create_comment_notifies_owner() {
        let todo = test_todo("alice", TodoVisibility::Public);
        let service = service(Dbs {
            todo: empty().append_query_results([[todo.clone()]]),
            comment: empty().append_query_results([[test_comment("c1", "bob", None)]]),
            notif_todo: empty().append_query_results([[todo]]),
            notif_user: empty().append_query_results([[test_user("bob")]]),
            notif: empty().append_query_results([[test_notification("alice")]]),
            ..Default::default()
        });

        let comment = service
            .create(
                "bob",
                CreateCommentInput {
                    todo_id: "t1".to_string(),
                    body: "Looks good".to_string(),
                    parent_comment_id: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(comment.id, "c1");
    }

    #[tokio::test]
    async fn test_create_on_private_todo_of_other_user() {
        let service = service(Dbs {
            todo: empty().append_query_results([[test_todo("alice", TodoVisibility::Private)]]),
            ..Default::default()
        });

        let result = service
            .create(
                "bob",
                CreateCommentInput {
                    todo_id: "t1".to_string(),
                    body: "hello".to_string(),
                    parent_comment_id: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::TodoNotFound(_))));
    }

    #[tokio::test]
    async fn test_reply_parent_must_be_on_same_todo() {
        let mut parent = test_comment("c0", "alice", None);
        parent.todo_id = "other".to_string();

        let service = service(Dbs {
            todo: empty().append_query_results([[test_todo("alice", TodoVisibility::Public)]]),
            comment: empty().append_query_results([[parent]]),
            ..Default::default()
        });

        let result = service
            .create(
                "bob",
                CreateCommentInput {
                    todo_id: "t1".to_string(),
                    body: "reply".to_string(),
                    parent_comment_id: Some("c0".to_string()),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_tree_nests_replies_with_authors() {
        let service = service(Dbs {
            todo: empty().append_query_results([[test_todo("alice", TodoVisibility::Private)]]),
            comment: empty().append_query_results([vec![
                test_comment("c1", "alice", None),
                test_comment("c2", "alice", Some("c1")),
                test_comment("c3", "alice", None),
            ]]),
            user: empty().append_query_results([[test_user("alice")]]),
            ..Default::default()
        });

        let tree = service.tree("alice", "t1").await.unwrap();

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].item.id, "c1");
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].item.id, "c2");
        assert_eq!(
            tree[0].item.author.as_ref().map(|a| a.username.as_str()),
            Some("alice")
        );
        assert_eq!(tree[1].item.id, "c3");

        let json = serde_json::to_value(flatten(&tree)).unwrap();
        assert_eq!(json[0]["author"]["displayName"], "alice");
        assert_eq!(json[1]["parentCommentId"], "c1");
        assert_eq!(json[1]["depth"], 1);
        assert_eq!(json[2]["id"], "c3");
        assert_eq!(json[2]["depth"], 0);
    }

    #[tokio::test]
    async fn test_update_by_non_author_is_forbidden() {
        let service = service(Dbs {
            comment: empty().append_query_results([[test_comment("c1", "bob", None)]]),
            ..Default::default()
        });

        let result = service
            .update(
                "alice",
                "c1",
                UpdateCommentInput {
                    body: "edited".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_todo_owner_can_delete_any_comment() {
        let exec = || MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        };
        let service = service(Dbs {
            comment: empty()
                .append_query_results([[test_comment("c1", "bob", None)]])
                .append_exec_results([exec()]),
            todo: empty().append_query_results([[test_todo("alice", TodoVisibility::Public)]]),
            reaction: empty().append_exec_results([exec()]),
            ..Default::default()
        });

        assert!(service.delete("alice", "c1").await.is_ok());
    }

    #[tokio::test]
    async fn test_stranger_cannot_delete_comment() {
        let service = service(Dbs {
            comment: empty().append_query_results([[test_comment("c1", "bob", None)]]),
            todo: empty().append_query_results([[test_todo("alice", TodoVisibility::Public)]]),
            ..Default::default()
        });

        let result = service.delete("carol", "c1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
