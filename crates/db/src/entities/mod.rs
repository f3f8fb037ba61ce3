//! Database entities.

#![allow(missing_docs)]

pub mod comment;
pub mod conversation;
pub mod conversation_participant;
pub mod message;
pub mod message_read;
pub mod notification;
pub mod reaction;
pub mod todo;
pub mod user;

pub use comment::Entity as Comment;
pub use conversation::Entity as Conversation;
pub use conversation_participant::Entity as ConversationParticipant;
pub use message::Entity as Message;
pub use message_read::Entity as MessageRead;
pub use notification::Entity as Notification;
pub use reaction::Entity as Reaction;
pub use todo::Entity as Todo;
pub use user::Entity as User;
