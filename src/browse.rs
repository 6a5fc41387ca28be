//! Browse Tree Builder
//!
//! Builds the "browse" tree: root-level nodes, plus the children of every id
//! in the caller's expansion set. Unexpanded nodes that report children keep a
//! loading placeholder, so deeper levels are only fetched on demand.

use crate::ancestors::AncestorResolver;
use crate::cache::{CacheKey, NodeCache};
use crate::config::{ArborConfig, BrowseConfig, CacheConfig, SortOrder};
use crate::error::TreeError;
use crate::phase::{BuildPhase, PhaseTracker};
use crate::source::NodeSource;
use crate::tree::{BuildContext, ChildList, NodeTree};
use crate::types::{Endpoint, Node, NodeFilter, NodeId, NodePage, PageRequest};
use futures::future::try_join_all;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Which nodes form the top level of a browse tree
#[derive(Debug, Clone, PartialEq)]
pub enum RootQuery {
    /// Nodes matching a list filter, paged
    Filter(NodeFilter),
    /// Explicit nodes retrieved by id, kept in the given order
    Ids(Vec<NodeId>),
}

impl Default for RootQuery {
    fn default() -> Self {
        RootQuery::Filter(NodeFilter::roots())
    }
}

impl From<NodeFilter> for RootQuery {
    fn from(filter: NodeFilter) -> Self {
        RootQuery::Filter(filter)
    }
}

impl RootQuery {
    /// Stable description used to scope a tree view
    pub fn scope(&self) -> String {
        match self {
            RootQuery::Filter(filter) => format!(
                "browse:filter:{}",
                serde_json::to_string(filter).unwrap_or_default()
            ),
            RootQuery::Ids(ids) => {
                let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                format!("browse:ids:{}", ids.join(","))
            }
        }
    }
}

/// Expanded ids and how many children pages each one shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    ids: IndexSet<NodeId>,
    pages: HashMap<NodeId, usize>,
}

impl Expansion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expand(&mut self, id: impl Into<NodeId>) {
        self.ids.insert(id.into());
    }

    pub fn collapse(&mut self, id: &NodeId) {
        self.ids.shift_remove(id);
        self.pages.remove(id);
    }

    /// Show one more page of children under `id`, expanding it if needed.
    pub fn load_more(&mut self, id: impl Into<NodeId>) {
        let id = id.into();
        let pages = self.pages_for(&id);
        if self.ids.insert(id.clone()) {
            // Newly expanded: the first page is implied.
            self.pages.insert(id, pages);
        } else {
            self.pages.insert(id, pages + 1);
        }
    }

    pub fn pages_for(&self, id: &NodeId) -> usize {
        self.pages.get(id).copied().unwrap_or(1).max(1)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<NodeId> for Expansion {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
            pages: HashMap::new(),
        }
    }
}

impl From<Vec<NodeId>> for Expansion {
    fn from(ids: Vec<NodeId>) -> Self {
        ids.into_iter().collect()
    }
}

/// Children fetched for one expanded parent
struct FetchedChildren {
    parent: NodeId,
    nodes: Vec<Node>,
    next_cursor: Option<String>,
}

pub struct ListTreeBuilder {
    source: Arc<dyn NodeSource>,
    cache: NodeCache,
    browse: BrowseConfig,
    windows: CacheConfig,
    retrieve_batch_size: usize,
}

impl ListTreeBuilder {
    pub fn new(source: Arc<dyn NodeSource>, cache: NodeCache, config: &ArborConfig) -> Self {
        Self {
            source,
            cache,
            browse: config.browse.clone(),
            windows: config.cache.clone(),
            retrieve_batch_size: config.search.retrieve_batch_size,
        }
    }

    /// Build the browse tree for `roots` with `expansion` applied.
    ///
    /// Every expanded id ends up with resolved children (possibly empty),
    /// whether or not the store returned any. Any fetch failure fails the
    /// whole build.
    #[instrument(skip_all, fields(source = self.source.source_name(), expanded = expansion.len()))]
    pub async fn build(
        &self,
        roots: &RootQuery,
        expansion: &Expansion,
    ) -> Result<Vec<NodeTree>, TreeError> {
        let mut phase = PhaseTracker::new("list");
        let mut ctx = BuildContext::new();

        phase.enter(BuildPhase::FetchingRoots);
        let mut root_nodes = self.fetch_roots(roots).await.map_err(|e| phase.fail(e))?;
        if matches!(roots, RootQuery::Filter(_)) {
            self.sort(&mut root_nodes);
        }
        let root_ids: Vec<NodeId> = root_nodes.iter().map(|n| n.id.clone()).collect();
        for node in root_nodes {
            ctx.insert_node(node);
        }

        phase.enter(BuildPhase::FetchingChildren);
        let fetches = expansion
            .ids()
            .map(|id| self.fetch_children(id, expansion.pages_for(id)));
        let fetched = try_join_all(fetches).await.map_err(|e| phase.fail(e))?;

        for FetchedChildren {
            parent,
            mut nodes,
            next_cursor,
        } in fetched
        {
            self.sort(&mut nodes);
            let ids = nodes.iter().map(|n| n.id.clone()).collect();
            for node in nodes {
                ctx.insert_node(node);
            }
            ctx.set_children(parent, ChildList::new(ids, next_cursor));
        }
        for id in expansion.ids() {
            ctx.ensure_children(id.clone());
        }

        phase.enter(BuildPhase::Assembling);
        let forest = ctx.assemble(&root_ids);

        phase.enter(BuildPhase::Done);
        info!(
            roots = forest.len(),
            nodes = ctx.len(),
            elapsed_ms = phase.elapsed_ms(),
            "Browse tree built"
        );
        Ok(forest)
    }

    /// Retrieve `id` and its ancestor chain.
    ///
    /// Returns the ancestor ids root-first, i.e. the ids to expand to make
    /// `id` visible. `None` when the node or one of its ancestors is not
    /// accessible.
    #[instrument(skip(self), fields(source = self.source.source_name()))]
    pub async fn reveal(&self, id: &NodeId) -> Result<Option<Vec<NodeId>>, TreeError> {
        let mut phase = PhaseTracker::new("reveal");
        let resolver = self.resolver();

        phase.enter(BuildPhase::ResolvingAncestors);
        let seeds = resolver
            .retrieve_round(vec![id.clone()])
            .await
            .map_err(|e| phase.fail(e))?;
        if seeds.is_empty() {
            debug!(id = %id, "Node to reveal is not accessible");
            return Ok(None);
        }

        let mut ctx = BuildContext::new();
        for node in &seeds {
            ctx.insert_linked(node.clone());
        }
        resolver
            .resolve(&seeds, &mut ctx)
            .await
            .map_err(|e| phase.fail(e))?;

        phase.enter(BuildPhase::Done);
        Ok(ctx.ancestor_path(id))
    }

    fn resolver(&self) -> AncestorResolver<'_> {
        AncestorResolver::new(
            self.source.as_ref(),
            &self.cache,
            self.retrieve_batch_size,
            self.windows.retrieve_staleness(),
        )
    }

    async fn fetch_roots(&self, roots: &RootQuery) -> Result<Vec<Node>, TreeError> {
        match roots {
            RootQuery::Filter(filter) => {
                let mut nodes = Vec::new();
                let mut cursor = None;
                for _ in 0..self.browse.max_root_pages {
                    let page = self
                        .fetch_page(filter, self.browse.root_page_size, cursor.take(), false)
                        .await?;
                    nodes.extend(page.items);
                    match page.next_cursor {
                        Some(next) => cursor = Some(next),
                        None => break,
                    }
                }
                if cursor.is_some() {
                    debug!(
                        max_pages = self.browse.max_root_pages,
                        "Root listing truncated at page limit"
                    );
                }
                Ok(nodes)
            }
            RootQuery::Ids(ids) => {
                let fetched = self.resolver().retrieve_round(ids.clone()).await?;
                let mut by_id: HashMap<NodeId, Node> =
                    fetched.into_iter().map(|n| (n.id.clone(), n)).collect();
                Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
            }
        }
    }

    async fn fetch_children(
        &self,
        parent: &NodeId,
        pages: usize,
    ) -> Result<FetchedChildren, TreeError> {
        let filter = NodeFilter::children_of(parent.clone());
        let mut nodes = Vec::new();
        let mut cursor = None;
        for _ in 0..pages {
            let page = self
                .fetch_page(&filter, self.browse.children_page_size, cursor.take(), true)
                .await?;
            nodes.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        debug!(parent = %parent, children = nodes.len(), more = cursor.is_some(), "Fetched children");
        Ok(FetchedChildren {
            parent: parent.clone(),
            nodes,
            next_cursor: cursor,
        })
    }

    async fn fetch_page(
        &self,
        filter: &NodeFilter,
        limit: u32,
        cursor: Option<String>,
        children: bool,
    ) -> Result<NodePage, TreeError> {
        let page = PageRequest { limit, cursor };
        let staleness = if children {
            self.windows.children_staleness()
        } else {
            self.windows.list_staleness()
        };
        let source = self.source.as_ref();
        let key = CacheKey::list(filter, &page);
        self.cache
            .fetch_page(key, staleness, async {
                source
                    .list(filter, &page)
                    .await
                    .map_err(|e| TreeError::fetch(Endpoint::List, e))
            })
            .await
    }

    fn sort(&self, nodes: &mut [Node]) {
        if self.browse.sort == SortOrder::Name {
            nodes.sort_by(|a, b| {
                a.name
                    .to_lowercase()
                    .cmp(&b.name.to_lowercase())
                    .then_with(|| a.name.cmp(&b.name))
            });
        }
    }
}
