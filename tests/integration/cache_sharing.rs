//! Cache discipline across builders: shared keys, in-flight sharing, invalidation

use super::test_utils::{ids, plant_nodes, plant_source, GatedSource};
use arbor::api::HierarchyApi;
use arbor::browse::{Expansion, ListTreeBuilder, RootQuery};
use arbor::cache::NodeCache;
use arbor::config::ArborConfig;
use arbor::search::SearchTreeBuilder;
use arbor::source::InMemorySource;
use arbor::tree::preorder_ids;
use arbor::types::{Endpoint, NodeFilter, NodeId};
use std::sync::Arc;

#[tokio::test]
async fn test_concurrent_builds_share_children_request() {
    let source = Arc::new(GatedSource::new(InMemorySource::from_nodes(plant_nodes()), 1));
    let cache = NodeCache::new();
    let config = ArborConfig::default();
    let first = ListTreeBuilder::new(source.clone(), cache.clone(), &config);
    let second = ListTreeBuilder::new(source.clone(), cache.clone(), &config);
    let expansion = Expansion::from(ids(&[1]));

    let roots = RootQuery::default();
    let (a, b, ()) = tokio::join!(
        first.build(&roots, &expansion),
        second.build(&roots, &expansion),
        async {
            source.entered.notified().await;
            source.release.notify_one();
        }
    );

    assert_eq!(a.unwrap(), b.unwrap());
    // One roots page and one children page, each requested once.
    assert_eq!(source.inner.calls(Endpoint::List), 2);
}

#[tokio::test]
async fn test_search_and_reveal_share_ancestor_lookups() {
    let source = plant_source();
    let cache = NodeCache::new();
    let config = ArborConfig::default();
    let search = SearchTreeBuilder::new(source.clone(), cache.clone(), &config);
    let browse = ListTreeBuilder::new(source.clone(), cache.clone(), &config);

    search.build("burner", &NodeFilter::default()).await.unwrap();
    assert_eq!(source.calls(Endpoint::Retrieve), 3);

    let path = browse.reveal(&NodeId::Int(7)).await.unwrap();
    assert_eq!(path, Some(ids(&[1, 2, 4])));
    // Only the revealed node itself is new; its ancestors come from the cache.
    assert_eq!(source.calls(Endpoint::Retrieve), 4);
}

#[tokio::test]
async fn test_browse_and_search_keys_do_not_collide() {
    let source = plant_source();
    let api = HierarchyApi::new(source.clone(), &ArborConfig::default());

    api.browse(&RootQuery::default(), &Expansion::new()).await.unwrap();
    let snapshot = api.search("", &NodeFilter::default()).await.unwrap();

    assert_eq!(source.calls(Endpoint::List), 1);
    assert_eq!(source.calls(Endpoint::Search), 1);
    // An empty query matches everything, so the whole hierarchy is revealed.
    assert_eq!(preorder_ids(&snapshot.tree).len(), 8);
}

#[tokio::test]
async fn test_invalidate_refetches() {
    let source = plant_source();
    let api = HierarchyApi::new(source.clone(), &ArborConfig::default());
    let expansion = Expansion::from(ids(&[1]));

    api.browse(&RootQuery::default(), &expansion).await.unwrap();
    api.browse(&RootQuery::default(), &expansion).await.unwrap();
    assert_eq!(source.calls(Endpoint::List), 2);

    api.invalidate(Some(Endpoint::List));
    api.browse(&RootQuery::default(), &expansion).await.unwrap();
    assert_eq!(source.calls(Endpoint::List), 4);

    api.invalidate(None);
    assert!(api.cache().is_empty());
}
