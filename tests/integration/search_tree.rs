//! Search tree building: ancestor resolution, leaf counts, dropped hits

use super::test_utils::{ids, plant_source};
use arbor::cache::NodeCache;
use arbor::config::ArborConfig;
use arbor::search::SearchTreeBuilder;
use arbor::source::InMemorySource;
use arbor::tree::{find, preorder_ids};
use arbor::types::{Endpoint, Node, NodeFilter, NodeId};
use std::sync::Arc;

fn builder(source: Arc<InMemorySource>) -> SearchTreeBuilder {
    SearchTreeBuilder::new(source, NodeCache::new(), &ArborConfig::default())
}

#[tokio::test]
async fn test_inaccessible_ancestor_yields_empty_tree() {
    let source = Arc::new(InMemorySource::from_nodes(vec![
        Node::new(4, "hidden parent"),
        Node::new(5, "hit").with_parent(4),
    ]));
    source.hide(4);

    let forest = builder(source.clone())
        .build("hit", &NodeFilter::default())
        .await
        .unwrap();

    assert!(forest.is_empty());
    assert_eq!(source.calls(Endpoint::Retrieve), 1);
}

#[tokio::test]
async fn test_every_hit_has_a_path_from_a_root() {
    let forest = builder(plant_source())
        .build("pump", &NodeFilter::default())
        .await
        .unwrap();

    assert_eq!(preorder_ids(&forest), ids(&[1, 2, 5, 3, 6]));
    for hit in [5, 6] {
        let node = find(&forest, &NodeId::Int(hit)).unwrap();
        assert!(node.matched);
    }
    assert_eq!(forest[0].child_count, Some(2));
}

#[tokio::test]
async fn test_deep_hit_resolves_all_rounds() {
    let forest = builder(plant_source())
        .build("burner", &NodeFilter::default())
        .await
        .unwrap();

    assert_eq!(preorder_ids(&forest), ids(&[1, 2, 4, 7]));
    assert!(forest.iter().all(|root| root.child_count == Some(1)));
}

#[tokio::test]
async fn test_cyclic_ancestors_drop_branch() {
    let source = Arc::new(InMemorySource::from_nodes(vec![
        Node::new(1, "a").with_parent(2),
        Node::new(2, "b").with_parent(1),
        Node::new(3, "looped hit").with_parent(1),
        Node::new(10, "root"),
        Node::new(11, "rooted hit").with_parent(10),
    ]));

    let forest = builder(source)
        .build("hit", &NodeFilter::default())
        .await
        .unwrap();

    assert_eq!(preorder_ids(&forest), ids(&[10, 11]));
}

#[tokio::test]
async fn test_search_results_are_cached_per_query() {
    let source = plant_source();
    let builder = builder(source.clone());

    builder.build("pump", &NodeFilter::default()).await.unwrap();
    builder.build("pump", &NodeFilter::default()).await.unwrap();
    builder.build("boiler", &NodeFilter::default()).await.unwrap();

    assert_eq!(source.calls(Endpoint::Search), 2);
}

#[tokio::test]
async fn test_filtered_search() {
    let filter = NodeFilter::children_of(NodeId::Int(3));
    let forest = builder(plant_source()).build("pump", &filter).await.unwrap();
    assert_eq!(preorder_ids(&forest), ids(&[1, 3, 6]));
}

#[tokio::test]
async fn test_string_ids() {
    let source = Arc::new(InMemorySource::from_nodes(vec![
        Node::new("site", "Site"),
        Node::new("line-a", "Line A").with_parent("site"),
        Node::new("pump-1", "Pump 1").with_parent("line-a"),
    ]));
    let forest = builder(source)
        .build("pump", &NodeFilter::default())
        .await
        .unwrap();
    assert_eq!(
        preorder_ids(&forest),
        vec![
            NodeId::from("site"),
            NodeId::from("line-a"),
            NodeId::from("pump-1")
        ]
    );
}
