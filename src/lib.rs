//! Arbor: Lazy Hierarchical Tree Synchronization
//!
//! Builds browsable and searchable trees over large parent/child hierarchies
//! from paged, cached, partial responses of a remote entity store. Browse
//! trees expand on demand; search trees resolve the ancestor chain of every
//! hit. Both converge on the same `NodeTree` shape without duplicating nodes
//! or losing previously fetched subtrees.

pub mod ancestors;
pub mod api;
pub mod browse;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod phase;
pub mod search;
pub mod source;
pub mod tree;
pub mod types;
pub mod views;

pub use ancestors::{resolve_ancestors, AncestorReport, AncestorResolver};
pub use api::HierarchyApi;
pub use browse::{Expansion, ListTreeBuilder, RootQuery};
pub use cache::{CacheKey, NodeCache, Staleness};
pub use config::ArborConfig;
pub use error::{ConfigError, SourceError, TreeError};
pub use search::SearchTreeBuilder;
pub use source::{InMemorySource, NodeSource};
pub use tree::{Children, NodeTree};
pub use types::{Node, NodeFilter, NodeId};
pub use views::{TreeSnapshot, TreeView};
