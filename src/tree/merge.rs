//! Merging of subtrees fetched in different rounds or invocations
//!
//! Precedence: the newer value wins for the node itself and its counters. A
//! resolved children list is never replaced by a placeholder; when both sides
//! are resolved the newer list decides membership and order, and each child is
//! merged with its older counterpart so deeper resolved subtrees survive.

use crate::tree::node::{Children, NodeTree};
use crate::types::NodeId;
use std::collections::HashMap;

/// Merge a newer view of one node into an older one.
pub fn merge(old: NodeTree, new: NodeTree) -> NodeTree {
    let (children, next_cursor) = match (old.children, new.children) {
        (Children::Resolved(old_children), Children::Resolved(new_children)) => (
            Children::Resolved(merge_forest(old_children, new_children)),
            new.next_cursor,
        ),
        (Children::Resolved(old_children), _) => {
            (Children::Resolved(old_children), old.next_cursor)
        }
        (_, new_children) => (new_children, new.next_cursor),
    };

    NodeTree {
        node: new.node,
        children,
        child_count: new.child_count.or(old.child_count),
        next_cursor,
        matched: new.matched,
    }
}

/// Merge two forests; membership and order come from `new`.
pub fn merge_forest(old: Vec<NodeTree>, new: Vec<NodeTree>) -> Vec<NodeTree> {
    let mut previous: HashMap<NodeId, NodeTree> = old
        .into_iter()
        .map(|tree| (tree.id().clone(), tree))
        .collect();

    new.into_iter()
        .map(|tree| match previous.remove(tree.id()) {
            Some(old_tree) => merge(old_tree, tree),
            None => tree,
        })
        .collect()
}
