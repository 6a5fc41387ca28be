//! Shared test utilities for integration tests
//!
//! Fixture hierarchies and a source wrapper that can hold a children request
//! open until the test releases it.

use arbor::error::SourceError;
use arbor::source::{InMemorySource, NodeSource};
use arbor::types::{Node, NodeFilter, NodeId, NodePage, PageRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;

pub fn ids(raw: &[i64]) -> Vec<NodeId> {
    raw.iter().map(|&i| NodeId::Int(i)).collect()
}

/// A small plant hierarchy:
///
/// ```text
/// 1 Plant
///   2 Boiler house
///     4 Boiler
///       7 Burner
///     5 Feed pump
///   3 Cooling
///     6 Cooling pump
/// 10 Office
/// ```
pub fn plant_nodes() -> Vec<Node> {
    vec![
        Node::new(1, "Plant"),
        Node::new(2, "Boiler house").with_parent(1),
        Node::new(3, "Cooling").with_parent(1),
        Node::new(4, "Boiler").with_parent(2),
        Node::new(5, "Feed pump").with_parent(2),
        Node::new(6, "Cooling pump").with_parent(3),
        Node::new(7, "Burner").with_parent(4),
        Node::new(10, "Office"),
    ]
}

pub fn plant_source() -> Arc<InMemorySource> {
    Arc::new(InMemorySource::from_nodes(plant_nodes()))
}

/// Wraps an in-memory source; list calls for the children of `gated` wait
/// until `release` is notified.
pub struct GatedSource {
    pub inner: InMemorySource,
    pub gated: NodeId,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedSource {
    pub fn new(inner: InMemorySource, gated: impl Into<NodeId>) -> Self {
        Self {
            inner,
            gated: gated.into(),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl NodeSource for GatedSource {
    async fn list(&self, filter: &NodeFilter, page: &PageRequest) -> Result<NodePage, SourceError> {
        if filter.parent_ids == [self.gated.clone()] {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.list(filter, page).await
    }

    async fn search(
        &self,
        query: &str,
        filter: &NodeFilter,
        limit: u32,
    ) -> Result<Vec<Node>, SourceError> {
        self.inner.search(query, filter, limit).await
    }

    async fn retrieve(&self, ids: &[NodeId]) -> Result<Vec<Node>, SourceError> {
        self.inner.retrieve(ids).await
    }

    fn source_name(&self) -> &str {
        "gated"
    }
}
