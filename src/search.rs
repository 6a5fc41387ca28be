//! Search Tree Builder
//!
//! Builds the "search" tree: every hit for a text query, with its ancestor
//! chain resolved up to a root so the assembled tree reveals each match. Child
//! counts are recomputed from the matched leaves actually present, since the
//! server's counts describe the whole hierarchy.

use crate::ancestors::AncestorResolver;
use crate::cache::{CacheKey, NodeCache};
use crate::config::{ArborConfig, CacheConfig, SearchConfig};
use crate::error::TreeError;
use crate::phase::{BuildPhase, PhaseTracker};
use crate::source::NodeSource;
use crate::tree::assembler::apply_leaf_counts;
use crate::tree::{preorder_ids, BuildContext, NodeTree};
use crate::types::{Endpoint, Node, NodeFilter, NodeId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct SearchTreeBuilder {
    source: Arc<dyn NodeSource>,
    cache: NodeCache,
    search: SearchConfig,
    windows: CacheConfig,
}

impl SearchTreeBuilder {
    pub fn new(source: Arc<dyn NodeSource>, cache: NodeCache, config: &ArborConfig) -> Self {
        Self {
            source,
            cache,
            search: config.search.clone(),
            windows: config.cache.clone(),
        }
    }

    /// Build the tree revealing every hit for `query` within `filter`.
    ///
    /// Hits whose ancestor chain cannot be resolved to a root are left out.
    #[instrument(skip_all, fields(source = self.source.source_name(), query = %query))]
    pub async fn build(&self, query: &str, filter: &NodeFilter) -> Result<Vec<NodeTree>, TreeError> {
        let mut phase = PhaseTracker::new("search");
        let mut ctx = BuildContext::new();

        phase.enter(BuildPhase::Searching);
        let hits = self.fetch_hits(query, filter).await.map_err(|e| phase.fail(e))?;

        let mut seeds = Vec::new();
        for hit in hits {
            link_hit(&mut ctx, hit, &mut seeds);
        }
        let hit_ids: Vec<NodeId> = seeds.iter().map(|n| n.id.clone()).collect();

        phase.enter(BuildPhase::ResolvingAncestors);
        let resolver = AncestorResolver::new(
            self.source.as_ref(),
            &self.cache,
            self.search.retrieve_batch_size,
            self.windows.retrieve_staleness(),
        );
        let report = resolver
            .resolve(&seeds, &mut ctx)
            .await
            .map_err(|e| phase.fail(e))?;

        phase.enter(BuildPhase::Assembling);
        let mut forest = ctx.assemble(&ctx.root_ids());
        let leaves = apply_leaf_counts(&mut forest);

        let shown: HashSet<NodeId> = preorder_ids(&forest).into_iter().collect();
        let dropped = hit_ids.iter().filter(|id| !shown.contains(*id)).count();
        if dropped > 0 {
            warn!(
                dropped,
                missing_ancestors = report.missing.len(),
                "Search hits without a resolvable ancestor chain were dropped"
            );
        }

        phase.enter(BuildPhase::Done);
        info!(
            hits = hit_ids.len(),
            leaves,
            rounds = report.rounds,
            elapsed_ms = phase.elapsed_ms(),
            "Search tree built"
        );
        Ok(forest)
    }

    async fn fetch_hits(&self, query: &str, filter: &NodeFilter) -> Result<Vec<Node>, TreeError> {
        let limit = self.search.limit;
        let source = self.source.as_ref();
        self.cache
            .fetch_nodes(
                CacheKey::search(query, filter, limit),
                self.windows.search_staleness(),
                async {
                    source
                        .search(query, filter, limit)
                        .await
                        .map_err(|e| TreeError::fetch(Endpoint::Search, e))
                },
            )
            .await
    }
}

/// Insert a hit and any co-returned descendants, marking each as matched.
///
/// Nested children are linked under the node that carried them even when
/// their own `parent_id` is missing.
fn link_hit(ctx: &mut BuildContext, mut hit: Node, seeds: &mut Vec<Node>) {
    let nested = hit.children.take().unwrap_or_default();
    let id = hit.id.clone();

    seeds.push(hit.clone());
    ctx.insert_linked(hit);
    ctx.mark_matched(&id);

    for mut child in nested {
        if child.parent_id.is_none() {
            child.parent_id = Some(id.clone());
        }
        link_hit(ctx, child, seeds);
    }
}
