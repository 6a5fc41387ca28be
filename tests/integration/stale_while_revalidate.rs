//! The previous tree stays visible while a newer build is in flight

use super::test_utils::{ids, plant_nodes, plant_source, GatedSource};
use arbor::api::HierarchyApi;
use arbor::browse::{Expansion, RootQuery};
use arbor::config::ArborConfig;
use arbor::source::InMemorySource;
use arbor::tree::{find, preorder_ids};
use arbor::types::{NodeFilter, NodeId};
use std::sync::Arc;

fn gated_api() -> (Arc<GatedSource>, HierarchyApi) {
    let source = Arc::new(GatedSource::new(InMemorySource::from_nodes(plant_nodes()), 2));
    let api = HierarchyApi::new(source.clone(), &ArborConfig::default());
    (source, api)
}

#[tokio::test]
async fn test_previous_tree_shown_until_refresh_lands() {
    let (source, api) = gated_api();
    let roots = RootQuery::default();

    let first = api.browse(&roots, &Expansion::from(ids(&[1]))).await.unwrap();
    assert_eq!(preorder_ids(&first.tree), ids(&[10, 1, 2, 3]));

    let grown = Expansion::from(ids(&[1, 2]));
    let (second, ()) = tokio::join!(
        api.browse(&roots, &grown),
        async {
            source.entered.notified().await;
            let during = api.snapshot();
            assert!(during.refreshing);
            assert_eq!(during.generation, first.generation);
            assert_eq!(during.tree, first.tree);
            source.release.notify_one();
        }
    );

    let second = second.unwrap();
    assert!(!second.refreshing);
    let rebuilt = api.list_builder().build(&roots, &grown).await.unwrap();
    assert_eq!(second.tree, rebuilt);
    assert!(second.generation > first.generation);
    assert_eq!(preorder_ids(&second.tree), ids(&[10, 1, 2, 4, 5, 3]));
}

#[tokio::test]
async fn test_late_result_does_not_overwrite_newer_tree() {
    let (source, api) = gated_api();
    let roots = RootQuery::default();
    api.browse(&roots, &Expansion::from(ids(&[1]))).await.unwrap();

    let grown = Expansion::from(ids(&[1, 2]));
    let original = Expansion::from(ids(&[1]));
    let (slow, ()) = tokio::join!(
        api.browse(&roots, &grown),
        async {
            source.entered.notified().await;
            // A newer build for the same scope finishes first.
            api.browse(&roots, &original).await.unwrap();
            source.release.notify_one();
        }
    );

    let shown = api.snapshot();
    assert_eq!(slow.unwrap().generation, shown.generation);
    let boiler_house = find(&shown.tree, &NodeId::Int(2)).unwrap();
    assert!(!boiler_house.children.is_resolved());
    assert!(!shown.refreshing);
}

#[tokio::test]
async fn test_abandoned_browse_does_not_replace_search() {
    let (source, api) = gated_api();

    let roots = RootQuery::default();
    let expansion = Expansion::from(ids(&[1, 2]));
    let (browse, ()) = tokio::join!(
        api.browse(&roots, &expansion),
        async {
            source.entered.notified().await;
            api.search("burner", &NodeFilter::default()).await.unwrap();
            source.release.notify_one();
        }
    );

    assert!(browse.is_ok());
    let shown = api.snapshot();
    assert!(shown.scope.unwrap().starts_with("search:"));
    assert_eq!(preorder_ids(&shown.tree), ids(&[1, 2, 4, 7]));
    assert!(find(&shown.tree, &NodeId::Int(7)).unwrap().matched);
}

#[tokio::test]
async fn test_collapse_replaces_shown_tree() {
    let source = plant_source();
    let api = HierarchyApi::new(source, &ArborConfig::default());
    let roots = RootQuery::default();

    api.browse(&roots, &Expansion::from(ids(&[1, 2]))).await.unwrap();
    let mut expansion = Expansion::from(ids(&[1, 2]));
    expansion.collapse(&NodeId::Int(2));
    let shown = api.browse(&roots, &expansion).await.unwrap();

    let built = api.list_builder().build(&roots, &expansion).await.unwrap();
    assert_eq!(shown.tree, built);
    assert!(find(&shown.tree, &NodeId::Int(2)).unwrap().children.is_loading());
}
