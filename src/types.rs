//! Core value types shared by sources, the cache, and the tree builders.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Stable identifier of a hierarchy node
///
/// Remote stores use either numeric or string ids; both compare and hash by value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Int(i64),
    Str(String),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Int(id) => write!(f, "{}", id),
            NodeId::Str(id) => f.write_str(id),
        }
    }
}

impl From<i64> for NodeId {
    fn from(id: i64) -> Self {
        NodeId::Int(id)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId::Str(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId::Str(id)
    }
}

impl std::str::FromStr for NodeId {
    type Err = std::convert::Infallible;

    /// Numeric text parses as `Int`, anything else is kept as `Str`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(id) => NodeId::Int(id),
            Err(_) => NodeId::Str(s.to_string()),
        })
    }
}

/// Server-side aggregates attached to a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_count: Option<u64>,
}

/// One entity of the hierarchy as returned by a node source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregates: Option<Aggregates>,
    /// Descendants co-returned by the search endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
    /// Domain fields this crate never interprets
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            name: name.into(),
            aggregates: None,
            children: None,
            payload: Map::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<NodeId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_child_count(mut self, child_count: u64) -> Self {
        self.aggregates = Some(Aggregates {
            child_count: Some(child_count),
        });
        self
    }

    /// Server-reported child count, if aggregates were requested
    pub fn child_count(&self) -> Option<u64> {
        self.aggregates.as_ref().and_then(|a| a.child_count)
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Filter accepted by the list and search endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_ids: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
}

impl NodeFilter {
    /// Root-level nodes only
    pub fn roots() -> Self {
        Self {
            root: Some(true),
            ..Self::default()
        }
    }

    /// Immediate children of one parent
    pub fn children_of(parent_id: NodeId) -> Self {
        Self {
            parent_ids: vec![parent_id],
            ..Self::default()
        }
    }

    /// Whether a node satisfies this filter
    pub fn matches(&self, node: &Node) -> bool {
        if let Some(root) = self.root {
            if node.is_root() != root {
                return false;
            }
        }
        if !self.parent_ids.is_empty() {
            match &node.parent_id {
                Some(parent) if self.parent_ids.contains(parent) => {}
                _ => return false,
            }
        }
        if let Some(prefix) = &self.name_prefix {
            if !node.name.starts_with(prefix.as_str()) {
                return false;
            }
        }
        self.metadata.iter().all(|(key, expected)| {
            node.payload
                .get("metadata")
                .and_then(|m| m.get(key))
                .and_then(Value::as_str)
                .map(|actual| actual == expected)
                .unwrap_or(false)
        })
    }
}

/// Page parameters for the list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl PageRequest {
    pub fn first(limit: u32) -> Self {
        Self { limit, cursor: None }
    }

    pub fn after(limit: u32, cursor: String) -> Self {
        Self {
            limit,
            cursor: Some(cursor),
        }
    }
}

/// One page of list results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePage {
    pub items: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Remote endpoint kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    List,
    Search,
    Retrieve,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::List => f.write_str("list"),
            Endpoint::Search => f.write_str("search"),
            Endpoint::Retrieve => f.write_str("retrieve"),
        }
    }
}
