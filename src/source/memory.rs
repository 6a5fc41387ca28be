//! In-memory node source
//!
//! Holds a whole hierarchy in memory and answers the three endpoints with the
//! same semantics as the remote store: offset cursors, child-count aggregates,
//! silent omission of unknown ids. Hidden ids model permission gaps. Call
//! counters and failure injection make it the fixture of choice for tests.

use crate::error::SourceError;
use crate::source::NodeSource;
use crate::types::{Aggregates, Endpoint, Node, NodeFilter, NodeId, NodePage, PageRequest};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::trace;

#[derive(Default)]
struct MemoryState {
    nodes: IndexMap<NodeId, Node>,
    hidden: HashSet<NodeId>,
    failing: HashSet<Endpoint>,
}

#[derive(Default)]
pub struct InMemorySource {
    state: RwLock<MemoryState>,
    co_return_children: bool,
    list_calls: AtomicUsize,
    search_calls: AtomicUsize,
    retrieve_calls: AtomicUsize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Fixture {
    Bare(Vec<Node>),
    Wrapped { nodes: Vec<Node> },
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let source = Self::new();
        for node in nodes {
            source.insert(node);
        }
        source
    }

    /// Load a JSON fixture: either an array of nodes or `{ "nodes": [...] }`.
    pub fn from_fixture(path: &Path) -> Result<Self, SourceError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SourceError::Unavailable(format!("Failed to read fixture {:?}: {}", path, e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, SourceError> {
        let fixture: Fixture =
            serde_json::from_str(raw).map_err(|e| SourceError::Decode(e.to_string()))?;
        let nodes = match fixture {
            Fixture::Bare(nodes) => nodes,
            Fixture::Wrapped { nodes } => nodes,
        };
        Ok(Self::from_nodes(nodes))
    }

    /// Return search hits nested under a matching parent hit.
    pub fn with_co_returned_children(mut self) -> Self {
        self.co_return_children = true;
        self
    }

    pub fn insert(&self, node: Node) {
        self.state.write().nodes.insert(node.id.clone(), node);
    }

    /// Make a node invisible to every endpoint.
    pub fn hide(&self, id: impl Into<NodeId>) {
        self.state.write().hidden.insert(id.into());
    }

    /// Make every call to `endpoint` fail until `recover` is called.
    pub fn fail_on(&self, endpoint: Endpoint) {
        self.state.write().failing.insert(endpoint);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.state.write().failing.remove(&endpoint);
    }

    /// Number of calls made to `endpoint`
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.counter(endpoint).load(Ordering::SeqCst)
    }

    fn counter(&self, endpoint: Endpoint) -> &AtomicUsize {
        match endpoint {
            Endpoint::List => &self.list_calls,
            Endpoint::Search => &self.search_calls,
            Endpoint::Retrieve => &self.retrieve_calls,
        }
    }

    fn enter(&self, endpoint: Endpoint) -> Result<(), SourceError> {
        self.counter(endpoint).fetch_add(1, Ordering::SeqCst);
        if self.state.read().failing.contains(&endpoint) {
            return Err(SourceError::Unavailable(format!(
                "{} endpoint is failing",
                endpoint
            )));
        }
        Ok(())
    }
}

impl MemoryState {
    fn visible(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .values()
            .filter(move |node| !self.hidden.contains(&node.id))
    }

    fn child_counts(&self) -> HashMap<NodeId, u64> {
        let mut counts = HashMap::new();
        for node in self.visible() {
            if let Some(parent) = &node.parent_id {
                *counts.entry(parent.clone()).or_insert(0) += 1;
            }
        }
        counts
    }

    fn annotated(&self, node: &Node, counts: &HashMap<NodeId, u64>) -> Node {
        let mut node = node.clone();
        node.children = None;
        node.aggregates = Some(Aggregates {
            child_count: Some(counts.get(&node.id).copied().unwrap_or(0)),
        });
        node
    }
}

fn text_matches(node: &Node, needle: &str) -> bool {
    if node.name.to_lowercase().contains(needle) {
        return true;
    }
    node.payload
        .get("description")
        .and_then(Value::as_str)
        .map(|d| d.to_lowercase().contains(needle))
        .unwrap_or(false)
}

/// Move hits whose parent is also a hit under that parent's `children`.
fn nest_hits(hits: Vec<Node>) -> Vec<Node> {
    let hit_ids: HashSet<NodeId> = hits.iter().map(|n| n.id.clone()).collect();
    let (nested, mut top): (Vec<Node>, Vec<Node>) = hits.into_iter().partition(|node| {
        node.parent_id
            .as_ref()
            .map(|p| hit_ids.contains(p))
            .unwrap_or(false)
    });

    let mut by_parent: IndexMap<NodeId, Vec<Node>> = IndexMap::new();
    for node in nested {
        if let Some(parent) = node.parent_id.clone() {
            by_parent.entry(parent).or_default().push(node);
        }
    }

    // Only one level is nested; deeper hits stay attached to their own parent.
    let mut orphans = Vec::new();
    for (parent, children) in by_parent {
        match top.iter_mut().find(|n| n.id == parent) {
            Some(hit) => hit.children.get_or_insert_with(Vec::new).extend(children),
            None => orphans.extend(children),
        }
    }
    top.extend(orphans);
    top
}

#[async_trait]
impl NodeSource for InMemorySource {
    async fn list(&self, filter: &NodeFilter, page: &PageRequest) -> Result<NodePage, SourceError> {
        self.enter(Endpoint::List)?;
        let offset = match &page.cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| SourceError::Status {
                    code: 400,
                    message: format!("Invalid cursor: {}", cursor),
                })?,
            None => 0,
        };
        let limit = page.limit.max(1) as usize;

        let state = self.state.read();
        let counts = state.child_counts();
        let matching: Vec<&Node> = state.visible().filter(|n| filter.matches(n)).collect();
        let items: Vec<Node> = matching
            .iter()
            .skip(offset)
            .take(limit)
            .map(|n| state.annotated(n, &counts))
            .collect();
        let end = offset.saturating_add(limit);
        let next_cursor = (end < matching.len()).then(|| end.to_string());

        trace!(offset, returned = items.len(), total = matching.len(), "In-memory list");
        Ok(NodePage { items, next_cursor })
    }

    async fn search(
        &self,
        query: &str,
        filter: &NodeFilter,
        limit: u32,
    ) -> Result<Vec<Node>, SourceError> {
        self.enter(Endpoint::Search)?;
        let needle = query.trim().to_lowercase();

        let state = self.state.read();
        let counts = state.child_counts();
        let hits: Vec<Node> = state
            .visible()
            .filter(|n| filter.matches(n) && text_matches(n, &needle))
            .take(limit as usize)
            .map(|n| state.annotated(n, &counts))
            .collect();

        Ok(if self.co_return_children {
            nest_hits(hits)
        } else {
            hits
        })
    }

    async fn retrieve(&self, ids: &[NodeId]) -> Result<Vec<Node>, SourceError> {
        self.enter(Endpoint::Retrieve)?;
        let state = self.state.read();
        let counts = state.child_counts();
        let mut seen = HashSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert((*id).clone()))
            .filter(|id| !state.hidden.contains(*id))
            .filter_map(|id| state.nodes.get(id))
            .map(|n| state.annotated(n, &counts))
            .collect())
    }

    fn source_name(&self) -> &str {
        "memory"
    }
}
