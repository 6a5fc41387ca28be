//! Hierarchy API
//!
//! One entry point over the cache, both tree builders and a `TreeView`. A
//! consumer calls `browse` or `search` for every render; the view keeps the
//! last good tree visible while the next one builds.

use crate::browse::{Expansion, ListTreeBuilder, RootQuery};
use crate::cache::NodeCache;
use crate::config::{ArborConfig, SourceKind};
use crate::error::{ConfigError, TreeError};
use crate::search::SearchTreeBuilder;
use crate::source::{HttpSource, InMemorySource, NodeSource};
use crate::tree::NodeTree;
use crate::types::{Endpoint, NodeFilter, NodeId};
use crate::views::{Ticket, TreeSnapshot, TreeView};
use std::sync::Arc;
use tracing::info;

pub struct HierarchyApi {
    cache: NodeCache,
    list: ListTreeBuilder,
    search: SearchTreeBuilder,
    view: TreeView,
}

impl HierarchyApi {
    pub fn new(source: Arc<dyn NodeSource>, config: &ArborConfig) -> Self {
        Self::with_cache(source, NodeCache::new(), config)
    }

    /// Share an existing cache, e.g. between two panels over the same store.
    pub fn with_cache(source: Arc<dyn NodeSource>, cache: NodeCache, config: &ArborConfig) -> Self {
        Self {
            list: ListTreeBuilder::new(source.clone(), cache.clone(), config),
            search: SearchTreeBuilder::new(source, cache.clone(), config),
            cache,
            view: TreeView::new(),
        }
    }

    /// Build the node source described by `config.source`.
    pub fn from_config(config: &ArborConfig) -> Result<Self, ConfigError> {
        let source = source_from_config(config)?;
        Ok(Self::new(source, config))
    }

    /// Build the browse tree and publish it to the view.
    ///
    /// On failure the view keeps its previous tree and the error is returned.
    pub async fn browse(
        &self,
        roots: &RootQuery,
        expansion: &Expansion,
    ) -> Result<TreeSnapshot, TreeError> {
        let ticket = self.view.begin(roots.scope());
        let result = self.list.build(roots, expansion).await;
        self.publish(ticket, result)
    }

    pub async fn search(&self, query: &str, filter: &NodeFilter) -> Result<TreeSnapshot, TreeError> {
        let scope = format!(
            "search:{}:{}",
            query,
            serde_json::to_string(filter).unwrap_or_default()
        );
        let ticket = self.view.begin(scope);
        let result = self.search.build(query, filter).await;
        self.publish(ticket, result)
    }

    /// Expand every ancestor of `id` and rebuild the browse tree.
    ///
    /// Returns `None`, leaving `expansion` untouched, when `id` or one of its
    /// ancestors is not accessible.
    pub async fn reveal(
        &self,
        id: &NodeId,
        roots: &RootQuery,
        expansion: &mut Expansion,
    ) -> Result<Option<TreeSnapshot>, TreeError> {
        let Some(path) = self.list.reveal(id).await? else {
            return Ok(None);
        };
        for ancestor in path {
            expansion.expand(ancestor);
        }
        self.browse(roots, expansion).await.map(Some)
    }

    /// Drop cached results of one endpoint, or all of them.
    pub fn invalidate(&self, endpoint: Option<Endpoint>) {
        match endpoint {
            Some(endpoint) => self.cache.invalidate(endpoint),
            None => self.cache.clear(),
        }
        info!(endpoint = ?endpoint, "Cache invalidated");
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        self.view.snapshot()
    }

    pub fn view(&self) -> &TreeView {
        &self.view
    }

    pub fn cache(&self) -> &NodeCache {
        &self.cache
    }

    pub fn list_builder(&self) -> &ListTreeBuilder {
        &self.list
    }

    pub fn search_builder(&self) -> &SearchTreeBuilder {
        &self.search
    }

    fn publish(
        &self,
        ticket: Ticket,
        result: Result<Vec<NodeTree>, TreeError>,
    ) -> Result<TreeSnapshot, TreeError> {
        match result {
            Ok(tree) => {
                self.view.complete(ticket, Ok(tree));
                Ok(self.view.snapshot())
            }
            Err(error) => {
                self.view.complete(ticket, Err(error.clone()));
                Err(error)
            }
        }
    }
}

/// Instantiate the configured node source.
pub fn source_from_config(config: &ArborConfig) -> Result<Arc<dyn NodeSource>, ConfigError> {
    match config.source.kind {
        SourceKind::Memory => {
            let source = match &config.source.fixture {
                Some(path) => InMemorySource::from_fixture(path)
                    .map_err(|e| ConfigError::Fixture(e.to_string()))?,
                None => InMemorySource::new(),
            };
            Ok(Arc::new(source))
        }
        SourceKind::Http => {
            let endpoint = config.source.endpoint.as_deref().ok_or_else(|| {
                ConfigError::Invalid("http source requires an endpoint".to_string())
            })?;
            let source = HttpSource::new(endpoint, config.source.timeout())
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            Ok(Arc::new(source))
        }
    }
}
