//! Browse tree building against an in-memory store

use super::test_utils::{ids, plant_source};
use arbor::browse::{Expansion, ListTreeBuilder, RootQuery};
use arbor::cache::NodeCache;
use arbor::config::{ArborConfig, SortOrder};
use arbor::error::TreeError;
use arbor::phase::BuildPhase;
use arbor::source::InMemorySource;
use arbor::tree::{expansion_set, find, preorder_ids, Children};
use arbor::types::{Endpoint, Node, NodeId};
use serde_json::json;
use std::sync::Arc;

fn fetch_order() -> ArborConfig {
    let mut config = ArborConfig::default();
    config.browse.sort = SortOrder::Fetch;
    config
}

#[tokio::test]
async fn test_root_with_two_children() {
    let source = Arc::new(InMemorySource::from_nodes(vec![
        Node::new(1, "root"),
        Node::new(2, "a").with_parent(1),
        Node::new(3, "b").with_parent(1),
    ]));
    let builder = ListTreeBuilder::new(source, NodeCache::new(), &fetch_order());

    let forest = builder
        .build(&RootQuery::default(), &Expansion::from(ids(&[1])))
        .await
        .unwrap();

    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].child_count, Some(2));
    let children = forest[0].children.resolved().unwrap();
    assert_eq!(preorder_ids(children), ids(&[2, 3]));
    assert!(children.iter().all(|c| c.children == Children::Unknown));
}

#[tokio::test]
async fn test_multi_level_expansion() {
    let builder = ListTreeBuilder::new(plant_source(), NodeCache::new(), &fetch_order());
    let forest = builder
        .build(&RootQuery::default(), &Expansion::from(ids(&[1, 2, 4])))
        .await
        .unwrap();

    assert_eq!(preorder_ids(&forest), ids(&[1, 2, 4, 7, 5, 3, 10]));
    // Cooling was not expanded and keeps its placeholder.
    assert!(find(&forest, &NodeId::Int(3)).unwrap().children.is_loading());
    assert_eq!(expansion_set(&forest), ids(&[1, 2, 4]));
}

#[tokio::test]
async fn test_expanded_ids_always_resolved() {
    let builder = ListTreeBuilder::new(plant_source(), NodeCache::new(), &fetch_order());
    // 7 is a leaf, 99 does not exist.
    let expansion = Expansion::from(ids(&[1, 2, 4, 7, 99]));
    let forest = builder.build(&RootQuery::default(), &expansion).await.unwrap();

    for id in expansion.ids() {
        if let Some(tree) = find(&forest, id) {
            assert!(tree.children.is_resolved(), "{} should be resolved", id);
        }
    }
    assert_eq!(
        find(&forest, &NodeId::Int(7)).unwrap().children,
        Children::Resolved(vec![])
    );
}

#[tokio::test]
async fn test_expanded_child_of_collapsed_parent_is_not_shown() {
    let builder = ListTreeBuilder::new(plant_source(), NodeCache::new(), &fetch_order());
    let forest = builder
        .build(&RootQuery::default(), &Expansion::from(ids(&[2])))
        .await
        .unwrap();
    assert_eq!(preorder_ids(&forest), ids(&[1, 10]));
}

#[tokio::test]
async fn test_rebuild_is_deterministic() {
    let builder = ListTreeBuilder::new(plant_source(), NodeCache::new(), &ArborConfig::default());
    let expansion = Expansion::from(ids(&[1, 2, 3]));

    let first = builder.build(&RootQuery::default(), &expansion).await.unwrap();
    let second = builder.build(&RootQuery::default(), &expansion).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_children_failure_fails_whole_build() {
    let source = plant_source();
    let builder = ListTreeBuilder::new(source.clone(), NodeCache::new(), &fetch_order());
    builder
        .build(&RootQuery::default(), &Expansion::new())
        .await
        .unwrap();

    // Roots are now cached; only the children request reaches the store.
    source.fail_on(Endpoint::List);
    let err = builder
        .build(&RootQuery::default(), &Expansion::from(ids(&[1])))
        .await
        .unwrap_err();

    match err {
        TreeError::Build { phase, source } => {
            assert_eq!(phase, BuildPhase::FetchingChildren);
            assert!(matches!(
                *source,
                TreeError::Fetch {
                    endpoint: Endpoint::List,
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_serialized_tree_shape() {
    let builder = ListTreeBuilder::new(plant_source(), NodeCache::new(), &fetch_order());
    let forest = builder
        .build(&RootQuery::Ids(ids(&[3])), &Expansion::from(ids(&[3])))
        .await
        .unwrap();

    let value = serde_json::to_value(&forest).unwrap();
    assert_eq!(
        value,
        json!([{
            "id": 3,
            "parentId": 1,
            "name": "Cooling",
            "aggregates": { "childCount": 1 },
            "childCount": 1,
            "children": {
                "state": "resolved",
                "items": [{
                    "id": 6,
                    "parentId": 3,
                    "name": "Cooling pump",
                    "aggregates": { "childCount": 0 },
                    "childCount": 0,
                    "children": { "state": "unknown" }
                }]
            }
        }])
    );
}
