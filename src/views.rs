//! Tree Views
//!
//! Holds the last successfully built tree for one panel while newer builds
//! are in flight. Each build takes a ticket; results are applied only when
//! they are newer than what is shown, so a late response from a superseded
//! build can never overwrite fresher data. A current result replaces the shown
//! tree outright, collapses included. Failures keep the previous tree visible
//! and are reported alongside it.

use crate::error::TreeError;
use crate::tree::NodeTree;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Handle for one build started against a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    scope: String,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

/// What `complete` did with a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Shown tree replaced (first result, or the scope changed)
    Replaced,
    /// Newer tree for the scope already shown
    Refreshed,
    /// Build failed; the previous tree stays visible
    KeptPrevious,
    /// A newer result is already shown, or the scope moved on
    Superseded,
}

/// Point-in-time read of a view
#[derive(Debug, Clone, Default)]
pub struct TreeSnapshot {
    pub tree: Vec<NodeTree>,
    /// Scope of the shown tree
    pub scope: Option<String>,
    /// Generation of the shown tree; 0 before the first result
    pub generation: u64,
    /// A build newer than the shown tree is still running
    pub refreshing: bool,
    /// Error of the latest failed build, cleared by the next success
    pub error: Option<TreeError>,
}

#[derive(Default)]
struct ViewState {
    tree: Vec<NodeTree>,
    scope: Option<String>,
    shown_generation: u64,
    latest_generation: u64,
    latest_scope: Option<String>,
    latest_settled: bool,
    error: Option<TreeError>,
}

#[derive(Default)]
pub struct TreeView {
    state: RwLock<ViewState>,
}

impl TreeView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a build for `scope` (the filter, root set or query it renders).
    pub fn begin(&self, scope: impl Into<String>) -> Ticket {
        let scope = scope.into();
        let mut state = self.state.write();
        state.latest_generation += 1;
        state.latest_scope = Some(scope.clone());
        state.latest_settled = false;
        debug!(generation = state.latest_generation, scope = %scope, "Tree build started");
        Ticket {
            generation: state.latest_generation,
            scope,
        }
    }

    /// Apply the outcome of a build.
    pub fn complete(&self, ticket: Ticket, result: Result<Vec<NodeTree>, TreeError>) -> Applied {
        let mut state = self.state.write();
        if ticket.generation == state.latest_generation {
            state.latest_settled = true;
        }

        let scope_current = state.latest_scope.as_deref() == Some(ticket.scope.as_str());
        if ticket.generation <= state.shown_generation || !scope_current {
            debug!(
                generation = ticket.generation,
                shown = state.shown_generation,
                "Ignoring superseded tree result"
            );
            return Applied::Superseded;
        }

        match result {
            Err(error) => {
                warn!(generation = ticket.generation, "Tree build failed, keeping previous tree: {}", error);
                state.error = Some(error);
                Applied::KeptPrevious
            }
            Ok(tree) => {
                let applied = if state.scope.as_deref() == Some(ticket.scope.as_str()) {
                    Applied::Refreshed
                } else {
                    state.scope = Some(ticket.scope);
                    Applied::Replaced
                };
                state.tree = tree;
                state.shown_generation = ticket.generation;
                state.error = None;
                applied
            }
        }
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        let state = self.state.read();
        TreeSnapshot {
            tree: state.tree.clone(),
            scope: state.scope.clone(),
            generation: state.shown_generation,
            refreshing: !state.latest_settled && state.latest_generation > state.shown_generation,
            error: state.error.clone(),
        }
    }

    /// Forget the shown tree; running builds still complete normally.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.tree.clear();
        state.scope = None;
        state.error = None;
    }
}
