//! Configuration System
//!
//! Layered configuration for cache windows, paging, search limits, the node
//! source, and logging. Files are merged in order: built-in defaults, the
//! global user file, the workspace files, then `ARBOR__*` environment
//! variables.

use crate::cache::Staleness;
use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArborConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub browse: BrowseConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Reuse windows per query shape. Children-of-parent queries never expire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root-level and filtered list queries
    #[serde(default = "default_list_stale_after_ms")]
    pub list_stale_after_ms: u64,

    /// Text search queries
    #[serde(default = "default_search_stale_after_ms")]
    pub search_stale_after_ms: u64,

    /// Retrieve-by-ids queries (ancestors, explicit roots)
    #[serde(default = "default_retrieve_stale_after_ms")]
    pub retrieve_stale_after_ms: u64,
}

fn default_list_stale_after_ms() -> u64 {
    30_000
}

fn default_search_stale_after_ms() -> u64 {
    5_000
}

fn default_retrieve_stale_after_ms() -> u64 {
    300_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            list_stale_after_ms: default_list_stale_after_ms(),
            search_stale_after_ms: default_search_stale_after_ms(),
            retrieve_stale_after_ms: default_retrieve_stale_after_ms(),
        }
    }
}

impl CacheConfig {
    pub fn list_staleness(&self) -> Staleness {
        Staleness::from_millis(self.list_stale_after_ms)
    }

    pub fn search_staleness(&self) -> Staleness {
        Staleness::from_millis(self.search_stale_after_ms)
    }

    pub fn retrieve_staleness(&self) -> Staleness {
        Staleness::from_millis(self.retrieve_stale_after_ms)
    }

    /// A parent's child set is fixed for the life of a browse session.
    pub fn children_staleness(&self) -> Staleness {
        Staleness::Forever
    }
}

/// Sibling ordering applied before assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Keep the order the store returned
    Fetch,
    /// Sort siblings by name
    Name,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseConfig {
    #[serde(default = "default_page_size")]
    pub root_page_size: u32,

    #[serde(default = "default_max_root_pages")]
    pub max_root_pages: usize,

    #[serde(default = "default_page_size")]
    pub children_page_size: u32,

    #[serde(default = "default_sort")]
    pub sort: SortOrder,
}

fn default_page_size() -> u32 {
    100
}

fn default_max_root_pages() -> usize {
    10
}

fn default_sort() -> SortOrder {
    SortOrder::Name
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            root_page_size: default_page_size(),
            max_root_pages: default_max_root_pages(),
            children_page_size: default_page_size(),
            sort: default_sort(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum hits requested from the search endpoint
    #[serde(default = "default_search_limit")]
    pub limit: u32,

    /// Maximum ids per retrieve call during ancestor resolution
    #[serde(default = "default_retrieve_batch_size")]
    pub retrieve_batch_size: usize,
}

fn default_search_limit() -> u32 {
    1000
}

fn default_retrieve_batch_size() -> usize {
    100
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_search_limit(),
            retrieve_batch_size: default_retrieve_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Memory,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_kind")]
    pub kind: SourceKind,

    /// JSON fixture for the in-memory source
    #[serde(default)]
    pub fixture: Option<PathBuf>,

    /// Base URL of the remote store
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_source_kind() -> SourceKind {
    SourceKind::Memory
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: default_source_kind(),
            fixture: None,
            endpoint: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Cache(String),
    Browse(String),
    Search(String),
    Source(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Cache(msg) => write!(f, "Cache: {}", msg),
            ValidationError::Browse(msg) => write!(f, "Browse: {}", msg),
            ValidationError::Search(msg) => write!(f, "Search: {}", msg),
            ValidationError::Source(msg) => write!(f, "Source: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ArborConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.cache.search_stale_after_ms > self.cache.list_stale_after_ms {
            errors.push(ValidationError::Cache(
                "search_stale_after_ms should not exceed list_stale_after_ms".to_string(),
            ));
        }

        if self.browse.root_page_size == 0 {
            errors.push(ValidationError::Browse(
                "root_page_size must be at least 1".to_string(),
            ));
        }
        if self.browse.children_page_size == 0 {
            errors.push(ValidationError::Browse(
                "children_page_size must be at least 1".to_string(),
            ));
        }
        if self.browse.max_root_pages == 0 {
            errors.push(ValidationError::Browse(
                "max_root_pages must be at least 1".to_string(),
            ));
        }

        if self.search.limit == 0 {
            errors.push(ValidationError::Search("limit must be at least 1".to_string()));
        }
        if self.search.retrieve_batch_size == 0 {
            errors.push(ValidationError::Search(
                "retrieve_batch_size must be at least 1".to_string(),
            ));
        }

        match self.source.kind {
            SourceKind::Http => match &self.source.endpoint {
                None => errors.push(ValidationError::Source(
                    "http source requires an endpoint".to_string(),
                )),
                Some(endpoint)
                    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") =>
                {
                    errors.push(ValidationError::Source(format!(
                        "endpoint must be an http(s) URL, got '{}'",
                        endpoint
                    )))
                }
                Some(_) => {}
            },
            SourceKind::Memory => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding every violation into one `ConfigError`.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ConfigError::Invalid(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        Ok(self)
    }
}
