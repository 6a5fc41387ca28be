//! Node Cache
//!
//! Keyed fetch-or-reuse cache in front of the node source endpoints. Identical
//! logical queries share one in-flight request; resolved results are reused
//! until their staleness window passes. Expired entries are swept whenever a
//! new result is stored, so one-off queries do not accumulate.

use crate::error::TreeError;
use crate::types::{Endpoint, Node, NodeFilter, NodeId, NodePage, PageRequest};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, trace};

/// How long a resolved entry may be reused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// Reuse for the lifetime of the cache
    Forever,
    /// Refetch once the entry is older than this
    After(Duration),
}

impl Staleness {
    pub fn from_millis(ms: u64) -> Self {
        Staleness::After(Duration::from_millis(ms))
    }

    fn is_fresh(&self, fetched_at: Instant) -> bool {
        match self {
            Staleness::Forever => true,
            Staleness::After(window) => fetched_at.elapsed() < *window,
        }
    }
}

/// Deterministic key of one logical query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: Endpoint,
    repr: String,
}

#[derive(Serialize)]
struct KeyParts<'a> {
    endpoint: Endpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a NodeFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<&'a PageRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ids: Option<&'a [NodeId]>,
}

impl CacheKey {
    fn from_parts(parts: KeyParts<'_>) -> Self {
        // Serializing plain structs, vectors and BTreeMaps cannot fail.
        let repr = serde_json::to_string(&parts).unwrap_or_default();
        Self {
            endpoint: parts.endpoint,
            repr,
        }
    }

    pub fn list(filter: &NodeFilter, page: &PageRequest) -> Self {
        Self::from_parts(KeyParts {
            endpoint: Endpoint::List,
            filter: Some(filter),
            page: Some(page),
            query: None,
            limit: None,
            ids: None,
        })
    }

    pub fn search(query: &str, filter: &NodeFilter, limit: u32) -> Self {
        Self::from_parts(KeyParts {
            endpoint: Endpoint::Search,
            filter: Some(filter),
            page: None,
            query: Some(query),
            limit: Some(limit),
            ids: None,
        })
    }

    /// Key for a retrieve-by-ids batch; id order does not matter.
    pub fn retrieve(ids: &[NodeId]) -> Self {
        let mut sorted = ids.to_vec();
        sorted.sort();
        sorted.dedup();
        Self::from_parts(KeyParts {
            endpoint: Endpoint::Retrieve,
            filter: None,
            page: None,
            query: None,
            limit: None,
            ids: Some(&sorted),
        })
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn as_str(&self) -> &str {
        &self.repr
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

/// Values the cache can hold
#[derive(Debug, Clone)]
pub enum CachedValue {
    Page(NodePage),
    Nodes(Vec<Node>),
}

type Waiter = oneshot::Sender<Result<CachedValue, TreeError>>;

enum Slot {
    InFlight { waiters: Vec<Waiter> },
    Ready {
        value: CachedValue,
        fetched_at: Instant,
        staleness: Staleness,
    },
}

impl Slot {
    fn is_expired(&self) -> bool {
        match self {
            Slot::Ready {
                fetched_at,
                staleness,
                ..
            } => !staleness.is_fresh(*fetched_at),
            Slot::InFlight { .. } => false,
        }
    }
}

enum Claim {
    Hit(CachedValue),
    Wait(oneshot::Receiver<Result<CachedValue, TreeError>>),
    Lead,
}

#[derive(Default)]
struct CacheInner {
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

/// Shared handle to the cache; clones point at the same entries.
#[derive(Clone, Default)]
pub struct NodeCache {
    inner: Arc<CacheInner>,
}

impl fmt::Debug for NodeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCache").field("entries", &self.len()).finish()
    }
}

impl NodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, join an in-flight request for it,
    /// or run `loader` and share its result.
    pub async fn fetch_or_reuse<F>(
        &self,
        key: CacheKey,
        staleness: Staleness,
        loader: F,
    ) -> Result<CachedValue, TreeError>
    where
        F: Future<Output = Result<CachedValue, TreeError>>,
    {
        match self.claim(&key, staleness) {
            Claim::Hit(value) => {
                trace!(key = %key, "Cache hit");
                Ok(value)
            }
            Claim::Wait(rx) => {
                trace!(key = %key, "Joining in-flight request");
                match rx.await {
                    Ok(result) => result,
                    Err(_) => Err(TreeError::Abandoned(key.to_string())),
                }
            }
            Claim::Lead => {
                debug!(key = %key, "Cache miss, fetching");
                let mut guard = LeaderGuard {
                    cache: self,
                    key: &key,
                    staleness,
                    finished: false,
                };
                let result = loader.await;
                guard.finish(&result);
                result
            }
        }
    }

    pub async fn fetch_page<F>(
        &self,
        key: CacheKey,
        staleness: Staleness,
        loader: F,
    ) -> Result<NodePage, TreeError>
    where
        F: Future<Output = Result<NodePage, TreeError>>,
    {
        let value = self
            .fetch_or_reuse(key, staleness, async { loader.await.map(CachedValue::Page) })
            .await?;
        Ok(match value {
            CachedValue::Page(page) => page,
            CachedValue::Nodes(items) => NodePage {
                items,
                next_cursor: None,
            },
        })
    }

    pub async fn fetch_nodes<F>(
        &self,
        key: CacheKey,
        staleness: Staleness,
        loader: F,
    ) -> Result<Vec<Node>, TreeError>
    where
        F: Future<Output = Result<Vec<Node>, TreeError>>,
    {
        let value = self
            .fetch_or_reuse(key, staleness, async { loader.await.map(CachedValue::Nodes) })
            .await?;
        Ok(match value {
            CachedValue::Nodes(nodes) => nodes,
            CachedValue::Page(page) => page.items,
        })
    }

    fn claim(&self, key: &CacheKey, staleness: Staleness) -> Claim {
        let mut slots = self.inner.slots.lock();
        if let Some(slot) = slots.get_mut(key) {
            match slot {
                Slot::Ready {
                    value, fetched_at, ..
                } if staleness.is_fresh(*fetched_at) => {
                    return Claim::Hit(value.clone());
                }
                Slot::InFlight { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    return Claim::Wait(rx);
                }
                Slot::Ready { .. } => {}
            }
        }
        slots.insert(
            key.clone(),
            Slot::InFlight {
                waiters: Vec::new(),
            },
        );
        Claim::Lead
    }

    /// Drop every entry fetched from `endpoint`. In-flight requests are left
    /// to finish.
    pub fn invalidate(&self, endpoint: Endpoint) {
        let mut slots = self.inner.slots.lock();
        slots.retain(|key, slot| {
            key.endpoint != endpoint || matches!(slot, Slot::InFlight { .. })
        });
    }

    /// Drop every resolved entry.
    pub fn clear(&self) {
        let mut slots = self.inner.slots.lock();
        slots.retain(|_, slot| matches!(slot, Slot::InFlight { .. }));
    }

    /// Drop resolved entries older than the window they were stored with.
    pub fn purge_stale(&self) -> usize {
        let mut slots = self.inner.slots.lock();
        purge_expired(&mut slots)
    }

    pub fn len(&self) -> usize {
        self.inner.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn purge_expired(slots: &mut HashMap<CacheKey, Slot>) -> usize {
    let before = slots.len();
    slots.retain(|_, slot| !slot.is_expired());
    let purged = before - slots.len();
    if purged > 0 {
        trace!(purged, "Expired cache entries dropped");
    }
    purged
}

/// Completes or releases the in-flight slot owned by the request leader.
///
/// If the leader's future is dropped mid-request the slot is removed, which
/// drops the waiters' senders and wakes them with `Abandoned`.
struct LeaderGuard<'a> {
    cache: &'a NodeCache,
    key: &'a CacheKey,
    staleness: Staleness,
    finished: bool,
}

impl LeaderGuard<'_> {
    fn finish(&mut self, result: &Result<CachedValue, TreeError>) {
        self.finished = true;
        let waiters = {
            let mut slots = self.cache.inner.slots.lock();
            let previous = match result {
                Ok(value) => slots.insert(
                    self.key.clone(),
                    Slot::Ready {
                        value: value.clone(),
                        fetched_at: Instant::now(),
                        staleness: self.staleness,
                    },
                ),
                Err(_) => slots.remove(self.key),
            };
            purge_expired(&mut slots);
            match previous {
                Some(Slot::InFlight { waiters }) => waiters,
                _ => Vec::new(),
            }
        };
        if !waiters.is_empty() {
            trace!(key = %self.key, waiters = waiters.len(), "Fanning out shared result");
        }
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!(key = %self.key, "Leader dropped before completion");
            self.cache.inner.slots.lock().remove(self.key);
        }
    }
}
