//! Per-invocation build context
//!
//! Owns the node-by-id and parent-to-children maps for exactly one builder
//! invocation. Nothing outside that invocation holds a reference to it.

use crate::tree::assembler;
use crate::tree::merge::merge;
use crate::tree::node::NodeTree;
use crate::types::{Node, NodeId};
use indexmap::IndexMap;

/// Fetched children of one parent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildList {
    pub ids: Vec<NodeId>,
    /// Cursor for the next page when the parent has more children
    pub next_cursor: Option<String>,
}

impl ChildList {
    pub fn new(ids: Vec<NodeId>, next_cursor: Option<String>) -> Self {
        Self { ids, next_cursor }
    }
}

#[derive(Debug, Default)]
pub struct BuildContext {
    nodes_by_id: IndexMap<NodeId, NodeTree>,
    children_of: IndexMap<NodeId, ChildList>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes_by_id.contains_key(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&NodeTree> {
        self.nodes_by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes_by_id.is_empty()
    }

    pub fn nodes_by_id(&self) -> &IndexMap<NodeId, NodeTree> {
        &self.nodes_by_id
    }

    pub fn children_of(&self) -> &IndexMap<NodeId, ChildList> {
        &self.children_of
    }

    /// Insert or overwrite a node in place; a second fetch of the same id is
    /// merged into the first rather than duplicated.
    pub fn insert(&mut self, tree: NodeTree) {
        let id = tree.id().clone();
        match self.nodes_by_id.swap_remove_full(&id) {
            Some((index, _, old)) => {
                let merged = merge(old, tree);
                let (last, _) = self.nodes_by_id.insert_full(id, merged);
                self.nodes_by_id.swap_indices(index, last);
            }
            None => {
                self.nodes_by_id.insert(id, tree);
            }
        }
    }

    pub fn insert_node(&mut self, node: Node) {
        self.insert(NodeTree::from_node(node));
    }

    /// Insert a node and append it to its parent's bucket.
    pub fn insert_linked(&mut self, node: Node) {
        let parent = node.parent_id.clone();
        let id = node.id.clone();
        self.insert_node(node);
        if let Some(parent) = parent {
            self.link(parent, id);
        }
    }

    /// Append a child id to a parent's bucket unless it is already there.
    pub fn link(&mut self, parent: NodeId, child: NodeId) {
        let list = self.children_of.entry(parent).or_default();
        if !list.ids.contains(&child) {
            list.ids.push(child);
        }
    }

    /// Replace the whole children list of a parent.
    pub fn set_children(&mut self, parent: NodeId, children: ChildList) {
        self.children_of.insert(parent, children);
    }

    /// Guarantee a (possibly empty) children entry for a parent.
    pub fn ensure_children(&mut self, parent: NodeId) {
        self.children_of.entry(parent).or_default();
    }

    /// Mark a node as a direct search hit.
    pub fn mark_matched(&mut self, id: &NodeId) {
        if let Some(tree) = self.nodes_by_id.get_mut(id) {
            tree.matched = true;
        }
    }

    /// Ids of nodes without a parent, in first-seen order
    pub fn root_ids(&self) -> Vec<NodeId> {
        self.nodes_by_id
            .values()
            .filter(|tree| tree.node.is_root())
            .map(|tree| tree.id().clone())
            .collect()
    }

    /// Follow parent links from `id` and return the ancestors root-first.
    ///
    /// Returns `None` when the chain has a gap or loops back on itself.
    pub fn ancestor_path(&self, id: &NodeId) -> Option<Vec<NodeId>> {
        let mut path = Vec::new();
        let mut current = self.nodes_by_id.get(id)?;
        while let Some(parent_id) = &current.node.parent_id {
            if path.len() >= self.nodes_by_id.len() || path.contains(parent_id) {
                return None;
            }
            path.push(parent_id.clone());
            current = self.nodes_by_id.get(parent_id)?;
        }
        path.reverse();
        Some(path)
    }

    pub fn assemble(&self, root_ids: &[NodeId]) -> Vec<NodeTree> {
        assembler::assemble(root_ids, &self.children_of, &self.nodes_by_id)
    }
}
