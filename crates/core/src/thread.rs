//! Comment thread assembly.
//!
//! Comments are stored flat with a plain `parent_comment_id` back-reference.
//! [`build_tree`] turns one todo's comments into a forest of roots with nested
//! replies, in a single pass plus an id lookup built fresh per call.

use std::collections::HashMap;

use serde::Serialize;
use taskyflow_db::entities::comment;

/// Something that can be placed in a reply thread.
pub trait Threaded {
    /// Unique id of this item.
    fn thread_id(&self) -> &str;

    /// Id of the item this one replies to, if any.
    fn parent_id(&self) -> Option<&str>;
}

impl Threaded for comment::Model {
    fn thread_id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_comment_id.as_deref()
    }
}

/// An item together with its direct replies.
///
/// Dropping and comparing nodes walk the subtree with a heap stack, so a
/// reply chain of any depth is safe to hold. Nested nodes are not
/// serialized directly; [`flatten`] turns a forest into [`ThreadEntry`]
/// rows for the wire.
#[derive(Debug)]
pub struct ThreadNode<T> {
    /// The threaded item itself.
    pub item: T,
    /// Direct replies, in input order.
    pub replies: Vec<ThreadNode<T>>,
}

impl<T> Drop for ThreadNode<T> {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

impl<T: PartialEq> PartialEq for ThreadNode<T> {
    fn eq(&self, other: &Self) -> bool {
        pre_order(std::slice::from_ref(self)).eq(pre_order(std::slice::from_ref(other)))
    }
}

impl<T: Eq> Eq for ThreadNode<T> {}

/// One item of a flattened thread.
///
/// Rows come in pre-order, so an item always follows its parent and the
/// subtrees of its earlier siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadEntry<T> {
    /// The threaded item itself.
    #[serde(flatten)]
    pub item: T,
    /// Nesting level, 0 for roots.
    pub depth: usize,
}

/// Walk a forest in pre-order, yielding each item with its depth.
pub fn pre_order<T>(forest: &[ThreadNode<T>]) -> impl Iterator<Item = (usize, &T)> {
    let mut stack: Vec<(usize, &ThreadNode<T>)> = forest.iter().rev().map(|n| (0, n)).collect();
    std::iter::from_fn(move || {
        let (depth, node) = stack.pop()?;
        stack.extend(node.replies.iter().rev().map(|r| (depth + 1, r)));
        Some((depth, &node.item))
    })
}

/// Flatten a forest into pre-order rows.
#[must_use]
pub fn flatten<T: Clone>(forest: &[ThreadNode<T>]) -> Vec<ThreadEntry<T>> {
    pre_order(forest)
        .map(|(depth, item)| ThreadEntry {
            item: item.clone(),
            depth,
        })
        .collect()
}

/// Assemble a flat, thread-ordered list into a reply forest.
///
/// `items` must already be sorted the way siblings should appear (oldest
/// first for comments). Roots and every `replies` list keep that order.
///
/// An item whose parent is not in `items` is dropped, and so is everything
/// beneath it. Self-references and parent cycles can never reach a root, so
/// they are dropped the same way. Depth is unbounded: nodes are assembled
/// iteratively, never by recursion.
#[must_use]
pub fn build_tree<T: Threaded>(items: Vec<T>) -> Vec<ThreadNode<T>> {
    let n = items.len();
    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];

    {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(n);
        for (i, item) in items.iter().enumerate() {
            index.entry(item.thread_id()).or_insert(i);
        }

        for (i, item) in items.iter().enumerate() {
            match item.parent_id() {
                None => roots.push(i),
                Some(parent) => match index.get(parent) {
                    Some(&p) if p != i => children[p].push(i),
                    _ => tracing::debug!(
                        id = %item.thread_id(),
                        parent_id = %parent,
                        "Dropping reply whose parent is not in the thread"
                    ),
                },
            }
        }
    }

    // Pre-order walk from the roots; everything unreachable stays out.
    let mut order = Vec::with_capacity(n);
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(i) = stack.pop() {
        order.push(i);
        stack.extend(children[i].iter().rev().copied());
    }

    // Children come after their parent in pre-order, so building in reverse
    // finishes every reply before the node that holds it.
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut built: Vec<Option<ThreadNode<T>>> = (0..n).map(|_| None).collect();
    for &i in order.iter().rev() {
        let Some(item) = slots[i].take() else {
            continue;
        };
        let replies = children[i]
            .iter()
            .filter_map(|&c| built[c].take())
            .collect();
        built[i] = Some(ThreadNode { item, replies });
    }

    roots.into_iter().filter_map(|r| built[r].take()).collect()
}
