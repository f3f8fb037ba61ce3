//! Business logic services.

#![allow(missing_docs)]

pub mod comment;
pub mod messaging;
pub mod notification;
pub mod reaction;
pub mod todo;
pub mod user;

pub use comment::{CommentService, CommentView, CreateCommentInput, UpdateCommentInput};
pub use messaging::{ConversationSummary, MessageView, MessagingService, SendMessageInput};
pub use notification::NotificationService;
pub use reaction::{ReactionService, ReactionSummary, ToggleOutcome, normalize_emoji};
pub use todo::{CreateTodoInput, TodoService, UpdateTodoInput};
pub use user::{CreateUserInput, UpdateUserInput, UserService, UserSummary};
