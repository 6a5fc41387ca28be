//! Node Source Abstraction
//!
//! Uniform interface over the remote entity store: a paged list endpoint, a
//! text search endpoint, and a retrieve-by-ids endpoint. The builders never
//! call a source directly; every call goes through the `NodeCache`.

use crate::error::SourceError;
use crate::types::{Node, NodeFilter, NodeId, NodePage, PageRequest};
use async_trait::async_trait;

pub mod http;
pub mod memory;

pub use http::HttpSource;
pub use memory::InMemorySource;

/// Remote entity store client
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// List one page of nodes matching `filter`, each annotated with its
    /// child count.
    async fn list(&self, filter: &NodeFilter, page: &PageRequest) -> Result<NodePage, SourceError>;

    /// Nodes matching a text query, optionally with co-returned children
    async fn search(
        &self,
        query: &str,
        filter: &NodeFilter,
        limit: u32,
    ) -> Result<Vec<Node>, SourceError>;

    /// Nodes by id; unknown or inaccessible ids are silently omitted
    async fn retrieve(&self, ids: &[NodeId]) -> Result<Vec<Node>, SourceError>;

    /// Name used in logs
    fn source_name(&self) -> &str;
}
