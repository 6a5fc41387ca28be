//! Ancestor Resolution
//!
//! Pulls in the missing parents of a set of seed nodes round by round until
//! every chain ends at a root or at an id the store will not return. Each id
//! is requested at most once per resolution, so malformed (cyclic) data ends
//! the loop instead of spinning on it.

use crate::cache::{CacheKey, NodeCache, Staleness};
use crate::error::TreeError;
use crate::source::NodeSource;
use crate::tree::BuildContext;
use crate::types::{Endpoint, Node, NodeId};
use futures::future::try_join_all;
use indexmap::IndexSet;
use std::collections::HashSet;
use std::future::Future;
use tracing::{debug, instrument};

/// Summary of one resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AncestorReport {
    /// Number of retrieve rounds issued
    pub rounds: usize,
    /// Ids requested but not returned (inaccessible or deleted)
    pub missing: Vec<NodeId>,
}

/// Resolve ancestors of `seeds` into `ctx`.
///
/// `retrieve` is called once per round with every pending id. A round's nodes
/// are linked only after the whole round succeeded; a failed round leaves the
/// context as it was after the previous round and the error is returned.
pub async fn resolve_ancestors<F, Fut>(
    seeds: &[Node],
    ctx: &mut BuildContext,
    mut retrieve: F,
) -> Result<AncestorReport, TreeError>
where
    F: FnMut(Vec<NodeId>) -> Fut,
    Fut: Future<Output = Result<Vec<Node>, TreeError>>,
{
    let mut report = AncestorReport::default();
    let mut requested: HashSet<NodeId> = HashSet::new();
    let mut pending: IndexSet<NodeId> = seeds
        .iter()
        .filter_map(|node| node.parent_id.clone())
        .filter(|parent| !ctx.contains(parent))
        .collect();

    while !pending.is_empty() {
        report.rounds += 1;
        let round: Vec<NodeId> = pending.drain(..).collect();
        requested.extend(round.iter().cloned());
        debug!(round = report.rounds, ids = round.len(), "Resolving ancestor round");

        let fetched = retrieve(round.clone()).await?;

        let returned: HashSet<NodeId> = fetched.iter().map(|n| n.id.clone()).collect();
        report
            .missing
            .extend(round.into_iter().filter(|id| !returned.contains(id)));

        for node in fetched {
            if let Some(parent) = &node.parent_id {
                if !ctx.contains(parent) && !requested.contains(parent) {
                    pending.insert(parent.clone());
                }
            }
            ctx.insert_linked(node);
        }
        // A node fetched this round may be the parent another pending id was
        // waiting for.
        pending.retain(|id| !ctx.contains(id));
    }

    if !report.missing.is_empty() {
        debug!(missing = report.missing.len(), "Some ancestors could not be retrieved");
    }
    Ok(report)
}

/// Retrieve ancestors through the cache, in concurrent batches.
pub struct AncestorResolver<'a> {
    source: &'a dyn NodeSource,
    cache: &'a NodeCache,
    batch_size: usize,
    staleness: Staleness,
}

impl<'a> AncestorResolver<'a> {
    pub fn new(
        source: &'a dyn NodeSource,
        cache: &'a NodeCache,
        batch_size: usize,
        staleness: Staleness,
    ) -> Self {
        Self {
            source,
            cache,
            batch_size: batch_size.max(1),
            staleness,
        }
    }

    #[instrument(skip_all, fields(source = self.source.source_name(), seeds = seeds.len()))]
    pub async fn resolve(
        &self,
        seeds: &[Node],
        ctx: &mut BuildContext,
    ) -> Result<AncestorReport, TreeError> {
        resolve_ancestors(seeds, ctx, |ids| self.retrieve_round(ids)).await
    }

    /// Retrieve one round of ids; all batches succeed or the round fails.
    pub(crate) async fn retrieve_round(&self, ids: Vec<NodeId>) -> Result<Vec<Node>, TreeError> {
        let batches = ids.chunks(self.batch_size).map(|chunk| self.retrieve_batch(chunk));
        let results = try_join_all(batches).await?;
        Ok(results.into_iter().flatten().collect())
    }

    async fn retrieve_batch(&self, ids: &[NodeId]) -> Result<Vec<Node>, TreeError> {
        let source = self.source;
        self.cache
            .fetch_nodes(CacheKey::retrieve(ids), self.staleness, async move {
                source
                    .retrieve(ids)
                    .await
                    .map_err(|e| TreeError::fetch(Endpoint::Retrieve, e))
            })
            .await
    }
}
