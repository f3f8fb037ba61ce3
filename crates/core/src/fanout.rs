//! Notification fan-out planning.
//!
//! Turns an authored event into the list of notifications to write: who gets
//! one, and what it says. Nothing here touches the database; the
//! [`NotificationService`](crate::services::NotificationService) resolves the
//! targets and performs the inserts.

use taskyflow_db::entities::{comment, message, notification::NotificationType, todo};

/// Longest message excerpt carried in a notification.
pub const MESSAGE_PREVIEW_CHARS: usize = 80;

/// The entity a reaction was attached to.
#[derive(Debug, Clone, Copy)]
pub enum ReactionTarget<'a> {
    /// A todo, owned by its creator.
    Todo(&'a todo::Model),
    /// A comment, together with the todo it sits on.
    Comment {
        /// The comment reacted to.
        comment: &'a comment::Model,
        /// Todo the comment belongs to.
        todo: &'a todo::Model,
    },
    /// A direct message.
    Message(&'a message::Model),
}

impl ReactionTarget<'_> {
    /// Owner of the todo, author of the comment, or sender of the message.
    #[must_use]
    pub fn owner_id(&self) -> &str {
        match self {
            Self::Todo(todo) => &todo.user_id,
            Self::Comment { comment, .. } => &comment.user_id,
            Self::Message(message) => &message.sender_id,
        }
    }
}

/// An authored event that may notify other users.
#[derive(Debug, Clone, Copy)]
pub enum NotificationEvent<'a> {
    /// A top-level comment on a todo.
    Comment {
        /// Todo that was commented on.
        todo: &'a todo::Model,
    },
    /// A reply to an existing comment.
    Reply {
        /// Todo the thread belongs to.
        todo: &'a todo::Model,
        /// Comment being replied to.
        parent: &'a comment::Model,
    },
    /// An emoji reaction.
    Reaction {
        /// What was reacted to.
        target: ReactionTarget<'a>,
        /// Normalized emoji.
        emoji: &'a str,
    },
    /// A new direct message.
    Message {
        /// The message just sent.
        message: &'a message::Model,
        /// Everyone in the conversation, sender included.
        participant_ids: &'a [String],
    },
}

/// Title and body of a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    /// Short heading, e.g. `New reply`.
    pub title: String,
    /// Rendered body text.
    pub message: String,
}

/// One notification ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNotification {
    /// User who will see the notification.
    pub recipient_user_id: String,
    /// Kind of event.
    pub notification_type: NotificationType,
    /// Short heading.
    pub title: String,
    /// Rendered body text.
    pub message: String,
    /// Todo or conversation the client should open.
    pub related_id: Option<String>,
}

impl NotificationEvent<'_> {
    /// Stored notification type.
    #[must_use]
    pub const fn notification_type(&self) -> NotificationType {
        match self {
            Self::Comment { .. } => NotificationType::Comment,
            Self::Reply { .. } => NotificationType::Reply,
            Self::Reaction { .. } => NotificationType::Reaction,
            Self::Message { .. } => NotificationType::Message,
        }
    }

    /// Distinct recipients in first-seen order, never including the actor.
    #[must_use]
    pub fn recipients(&self, actor_id: &str) -> Vec<String> {
        let candidates: Vec<&str> = match self {
            Self::Comment { todo } => vec![todo.user_id.as_str()],
            Self::Reply { parent, .. } => vec![parent.user_id.as_str()],
            Self::Reaction { target, .. } => vec![target.owner_id()],
            Self::Message {
                participant_ids, ..
            } => participant_ids.iter().map(String::as_str).collect(),
        };

        let mut recipients: Vec<String> = Vec::with_capacity(candidates.len());
        for id in candidates {
            if id != actor_id && !recipients.iter().any(|r| r == id) {
                recipients.push(id.to_string());
            }
        }
        recipients
    }

    /// Render the notification text for an actor's display name.
    #[must_use]
    pub fn compose(&self, actor_name: &str) -> NotificationContent {
        match self {
            Self::Comment { todo } => NotificationContent {
                title: "New comment".to_string(),
                message: format!("{actor_name} commented on \"{}\"", todo.title),
            },
            Self::Reply { todo, .. } => NotificationContent {
                title: "New reply".to_string(),
                message: format!(
                    "{actor_name} replied to your comment on \"{}\"",
                    todo.title
                ),
            },
            Self::Reaction { target, emoji } => {
                let what = match target {
                    ReactionTarget::Todo(todo) => format!("your todo \"{}\"", todo.title),
                    ReactionTarget::Comment { todo, .. } => {
                        format!("your comment on \"{}\"", todo.title)
                    }
                    ReactionTarget::Message(_) => "your message".to_string(),
                };
                NotificationContent {
                    title: "New reaction".to_string(),
                    message: format!("{actor_name} reacted {emoji} to {what}"),
                }
            }
            Self::Message { message, .. } => NotificationContent {
                title: "New message".to_string(),
                message: format!("{actor_name}: {}", preview(&message.body)),
            },
        }
    }

    /// Id the client should open: the todo, or the conversation for messages.
    #[must_use]
    pub fn related_id(&self) -> Option<String> {
        match self {
            Self::Comment { todo } | Self::Reply { todo, .. } => Some(todo.id.clone()),
            Self::Reaction { target, .. } => match target {
                ReactionTarget::Todo(todo) | ReactionTarget::Comment { todo, .. } => {
                    Some(todo.id.clone())
                }
                ReactionTarget::Message(message) => Some(message.conversation_id.clone()),
            },
            Self::Message { message, .. } => Some(message.conversation_id.clone()),
        }
    }

    /// Every notification this event produces.
    #[must_use]
    pub fn plan(&self, actor_id: &str, actor_name: &str) -> Vec<PlannedNotification> {
        let recipients = self.recipients(actor_id);
        if recipients.is_empty() {
            return vec![];
        }

        let content = self.compose(actor_name);
        let related_id = self.related_id();
        let notification_type = self.notification_type();

        recipients
            .into_iter()
            .map(|recipient_user_id| PlannedNotification {
                recipient_user_id,
                notification_type,
                title: content.title.clone(),
                message: content.message.clone(),
                related_id: related_id.clone(),
            })
            .collect()
    }
}

/// First [`MESSAGE_PREVIEW_CHARS`] characters of a body, on one line.
#[must_use]
pub fn preview(body: &str) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MESSAGE_PREVIEW_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(MESSAGE_PREVIEW_CHARS - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use taskyflow_db::entities::todo::{TodoPriority, TodoStatus, TodoVisibility};

    fn todo(owner: &str) -> todo::Model {
        todo::Model {
            id: "todo1".to_string(),
            user_id: owner.to_string(),
            title: "Ship v1".to_string(),
            description: None,
            status: TodoStatus::Pending,
            priority: TodoPriority::High,
            visibility: TodoVisibility::Public,
            due_date: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn comment(id: &str, author: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            todo_id: "todo1".to_string(),
            user_id: author.to_string(),
            parent_comment_id: None,
            body: "looks good".to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn message(sender: &str, body: &str) -> message::Model {
        message::Model {
            id: "m1".to_string(),
            conversation_id: "conv1".to_string(),
            sender_id: sender.to_string(),
            body: body.to_string(),
            created_at: Utc::now().into(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_comment_notifies_owner() {
        let todo = todo("owner");
        let event = NotificationEvent::Comment { todo: &todo };

        let planned = event.plan("alice", "Alice");

        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].recipient_user_id, "owner");
        assert_eq!(planned[0].notification_type, NotificationType::Comment);
        assert_eq!(planned[0].message, "Alice commented on \"Ship v1\"");
        assert_eq!(planned[0].related_id.as_deref(), Some("todo1"));
    }

    #[test]
    fn test_owner_commenting_on_own_todo_notifies_nobody() {
        let todo = todo("owner");
        let event = NotificationEvent::Comment { todo: &todo };

        assert!(event.plan("owner", "Owner").is_empty());
    }

    #[test]
    fn test_reply_notifies_parent_author_only() {
        let todo = todo("owner");
        let parent = comment("c1", "bob");
        let event = NotificationEvent::Reply {
            todo: &todo,
            parent: &parent,
        };

        let planned = event.plan("alice", "Alice");

        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].recipient_user_id, "bob");
        assert_eq!(planned[0].notification_type, NotificationType::Reply);
        assert_eq!(planned[0].title, "New reply");
    }

    #[test]
    fn test_reply_to_own_comment_notifies_nobody() {
        let todo = todo("owner");
        let parent = comment("c1", "alice");
        let event = NotificationEvent::Reply {
            todo: &todo,
            parent: &parent,
        };

        assert!(event.recipients("alice").is_empty());
    }

    #[test]
    fn test_reacting_to_own_todo_produces_nothing() {
        let todo = todo("owner");
        let event = NotificationEvent::Reaction {
            target: ReactionTarget::Todo(&todo),
            emoji: "👍",
        };

        assert!(event.plan("owner", "Owner").is_empty());
    }

    #[test]
    fn test_reacting_to_someone_elses_todo_notifies_owner_once() {
        let todo = todo("owner");
        let event = NotificationEvent::Reaction {
            target: ReactionTarget::Todo(&todo),
            emoji: "👍",
        };

        let planned = event.plan("alice", "Alice");

        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].recipient_user_id, "owner");
        assert_eq!(planned[0].message, "Alice reacted 👍 to your todo \"Ship v1\"");
    }

    #[test]
    fn test_reaction_on_comment_goes_to_comment_author() {
        let todo = todo("owner");
        let c = comment("c1", "bob");
        let event = NotificationEvent::Reaction {
            target: ReactionTarget::Comment {
                comment: &c,
                todo: &todo,
            },
            emoji: ":tada:",
        };

        let planned = event.plan("alice", "Alice");

        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].recipient_user_id, "bob");
        assert_eq!(planned[0].related_id.as_deref(), Some("todo1"));
    }

    #[test]
    fn test_reaction_on_message_links_conversation() {
        let m = message("bob", "hi");
        let event = NotificationEvent::Reaction {
            target: ReactionTarget::Message(&m),
            emoji: "❤️",
        };

        let planned = event.plan("alice", "Alice");

        assert_eq!(planned[0].recipient_user_id, "bob");
        assert_eq!(planned[0].related_id.as_deref(), Some("conv1"));
        assert_eq!(planned[0].message, "Alice reacted ❤️ to your message");
    }

    #[test]
    fn test_message_in_three_party_conversation_notifies_two() {
        let m = message("alice", "standup in 5");
        let participants = vec!["alice".to_string(), "bob".to_string(), "carol".to_string()];
        let event = NotificationEvent::Message {
            message: &m,
            participant_ids: &participants,
        };

        let planned = event.plan("alice", "Alice");

        assert_eq!(planned.len(), participants.len() - 1);
        let recipients: Vec<_> = planned.iter().map(|p| p.recipient_user_id.as_str()).collect();
        assert_eq!(recipients, vec!["bob", "carol"]);
        assert!(planned.iter().all(|p| p.message == "Alice: standup in 5"));
    }

    #[test]
    fn test_duplicate_participants_are_deduplicated() {
        let m = message("alice", "hi");
        let participants = vec!["bob".to_string(), "bob".to_string(), "alice".to_string()];
        let event = NotificationEvent::Message {
            message: &m,
            participant_ids: &participants,
        };

        assert_eq!(event.recipients("alice"), vec!["bob".to_string()]);
    }

    #[test]
    fn test_preview_truncates_long_bodies() {
        let long = "x".repeat(200);
        let p = preview(&long);

        assert_eq!(p.chars().count(), MESSAGE_PREVIEW_CHARS);
        assert!(p.ends_with('…'));
        assert_eq!(preview("line one\nline   two"), "line one line two");
    }
}
