//! Tree assembly from flat build maps
//!
//! Pure and total: ids missing from `nodes_by_id` are omitted, and an id is
//! emitted at most once per assembly so malformed child maps cannot produce
//! duplicates or infinite recursion.

use crate::tree::context::ChildList;
use crate::tree::node::{Children, NodeTree};
use crate::types::NodeId;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Assemble the forest rooted at `root_ids`.
///
/// A node listed in `children_of` gets a resolved children list in bucket
/// order; every other node keeps the children state it was inserted with.
pub fn assemble(
    root_ids: &[NodeId],
    children_of: &IndexMap<NodeId, ChildList>,
    nodes_by_id: &IndexMap<NodeId, NodeTree>,
) -> Vec<NodeTree> {
    let mut emitted = HashSet::new();
    assemble_level(root_ids, children_of, nodes_by_id, &mut emitted)
}

fn assemble_level(
    ids: &[NodeId],
    children_of: &IndexMap<NodeId, ChildList>,
    nodes_by_id: &IndexMap<NodeId, NodeTree>,
    emitted: &mut HashSet<NodeId>,
) -> Vec<NodeTree> {
    let mut level = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(seed) = nodes_by_id.get(id) else {
            continue;
        };
        if !emitted.insert(id.clone()) {
            continue;
        }

        let mut tree = seed.clone();
        if let Some(list) = children_of.get(id) {
            tree.children =
                Children::Resolved(assemble_level(&list.ids, children_of, nodes_by_id, emitted));
            tree.next_cursor = list.next_cursor.clone();
        }
        level.push(tree);
    }
    level
}

/// Replace child counts with the number of leaves present below each branch.
///
/// Returns the leaf total of the forest. Server counts on leaves are cleared,
/// since they describe the full hierarchy rather than the assembled subset.
pub fn apply_leaf_counts(forest: &mut [NodeTree]) -> u64 {
    forest
        .iter_mut()
        .map(|tree| match &mut tree.children {
            Children::Resolved(children) if !children.is_empty() => {
                let leaves = apply_leaf_counts(children);
                tree.child_count = Some(leaves);
                leaves
            }
            _ => {
                tree.child_count = None;
                1
            }
        })
        .sum()
}
