//! Database repositories.

mod comment;
mod conversation;
mod message;
mod message_read;
mod notification;
mod reaction;
mod todo;
mod user;

pub use comment::CommentRepository;
pub use conversation::ConversationRepository;
pub use message::MessageRepository;
pub use message_read::MessageReadRepository;
pub use notification::NotificationRepository;
pub use reaction::ReactionRepository;
pub use todo::TodoRepository;
pub use user::UserRepository;
