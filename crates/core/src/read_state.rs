//! Conversation read-tracking.
//!
//! A message can only be unread for a viewer who did not send it. The
//! sender's own messages are left out of unread counts entirely, and so are
//! soft-deleted messages.

use std::collections::{HashMap, HashSet};

use taskyflow_db::entities::message;

/// Whether the viewer has a read marker for each message.
#[must_use]
pub fn read_flags(
    messages: &[message::Model],
    read_ids: &HashSet<String>,
) -> Vec<(String, bool)> {
    messages
        .iter()
        .map(|m| (m.id.clone(), read_ids.contains(&m.id)))
        .collect()
}

/// Whether `message` counts as unread for `viewer_id`.
#[must_use]
pub fn is_unread(message: &message::Model, viewer_id: &str, read_ids: &HashSet<String>) -> bool {
    message.sender_id != viewer_id && !message.is_deleted() && !read_ids.contains(&message.id)
}

/// Number of unread messages for `viewer_id`.
#[must_use]
pub fn unread_count(
    messages: &[message::Model],
    viewer_id: &str,
    read_ids: &HashSet<String>,
) -> u64 {
    messages
        .iter()
        .filter(|m| is_unread(m, viewer_id, read_ids))
        .count() as u64
}

/// Unread counts keyed by conversation id. Conversations with nothing unread
/// are absent.
#[must_use]
pub fn unread_by_conversation(
    messages: &[message::Model],
    viewer_id: &str,
    read_ids: &HashSet<String>,
) -> HashMap<String, u64> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for m in messages.iter().filter(|m| is_unread(m, viewer_id, read_ids)) {
        *counts.entry(m.conversation_id.clone()).or_default() += 1;
    }
    counts
}

/// Whether marking `message` read for `viewer_id` should write a marker.
///
/// Never for the sender, and never twice.
#[must_use]
pub fn needs_marker(message: &message::Model, viewer_id: &str, already_marked: bool) -> bool {
    message.sender_id != viewer_id && !already_marked
}
