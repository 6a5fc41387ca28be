//! Integration tests for the Arbor hierarchy tree engine

mod browse_tree;
mod cache_sharing;
mod config_integration;
mod search_tree;
mod stale_while_revalidate;
mod test_utils;
