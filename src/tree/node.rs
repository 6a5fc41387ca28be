//! Tree node values handed to the rendering layer

use crate::types::{Node, NodeId};
use serde::Serialize;

/// Children state of a tree node
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "items", rename_all = "lowercase")]
pub enum Children {
    /// No children, or not expandable
    Unknown,
    /// Children exist but have not been fetched yet
    Loading,
    /// Fully fetched, in display order
    Resolved(Vec<NodeTree>),
}

impl Children {
    /// Placeholder state implied by a server child count
    pub fn from_child_count(child_count: Option<u64>) -> Self {
        match child_count {
            Some(count) if count > 0 => Children::Loading,
            _ => Children::Unknown,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Children::Resolved(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Children::Loading)
    }

    pub fn resolved(&self) -> Option<&[NodeTree]> {
        match self {
            Children::Resolved(children) => Some(children),
            _ => None,
        }
    }
}

/// A node decorated with its children state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTree {
    #[serde(flatten)]
    pub node: Node,
    pub children: Children,
    /// Server count while browsing, matched-leaf count while searching
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_count: Option<u64>,
    /// Cursor for the next page of children, when more exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Set on direct search hits
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub matched: bool,
}

impl NodeTree {
    /// Wrap a fetched node, placing a loading placeholder when the server
    /// reports children.
    ///
    /// Co-returned `children` are stripped from the node; callers that want
    /// them link them through a build context instead.
    pub fn from_node(mut node: Node) -> Self {
        node.children = None;
        let child_count = node.child_count();
        Self {
            children: Children::from_child_count(child_count),
            child_count,
            next_cursor: None,
            matched: false,
            node,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.node.id
    }

    pub fn has_more_children(&self) -> bool {
        self.next_cursor.is_some()
    }
}

/// Ids of a forest in pre-order
pub fn preorder_ids(forest: &[NodeTree]) -> Vec<NodeId> {
    let mut ids = Vec::new();
    collect_preorder(forest, &mut ids);
    ids
}

fn collect_preorder(forest: &[NodeTree], ids: &mut Vec<NodeId>) {
    for tree in forest {
        ids.push(tree.id().clone());
        if let Children::Resolved(children) = &tree.children {
            collect_preorder(children, ids);
        }
    }
}

/// Ids whose children are resolved, i.e. the expansion set that reveals
/// everything present in the forest.
pub fn expansion_set(forest: &[NodeTree]) -> Vec<NodeId> {
    let mut ids = Vec::new();
    collect_expanded(forest, &mut ids);
    ids
}

fn collect_expanded(forest: &[NodeTree], ids: &mut Vec<NodeId>) {
    for tree in forest {
        if let Children::Resolved(children) = &tree.children {
            ids.push(tree.id().clone());
            collect_expanded(children, ids);
        }
    }
}

/// Find a node anywhere in the forest
pub fn find<'a>(forest: &'a [NodeTree], id: &NodeId) -> Option<&'a NodeTree> {
    for tree in forest {
        if tree.id() == id {
            return Some(tree);
        }
        if let Children::Resolved(children) = &tree.children {
            if let Some(found) = find(children, id) {
                return Some(found);
            }
        }
    }
    None
}
