//! Builder phases
//!
//! Each builder invocation walks `Idle → FetchingRoots → FetchingChildren →
//! Assembling → Done`; any fetching phase may end in `Failed`.

use crate::error::TreeError;
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    Idle,
    FetchingRoots,
    FetchingChildren,
    Searching,
    ResolvingAncestors,
    Assembling,
    Done,
    Failed,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BuildPhase::Idle => "idle",
            BuildPhase::FetchingRoots => "fetching roots",
            BuildPhase::FetchingChildren => "fetching children",
            BuildPhase::Searching => "searching",
            BuildPhase::ResolvingAncestors => "resolving ancestors",
            BuildPhase::Assembling => "assembling",
            BuildPhase::Done => "done",
            BuildPhase::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Tracks the current phase of one builder invocation
pub(crate) struct PhaseTracker {
    builder: &'static str,
    phase: BuildPhase,
    started: Instant,
}

impl PhaseTracker {
    pub(crate) fn new(builder: &'static str) -> Self {
        Self {
            builder,
            phase: BuildPhase::Idle,
            started: Instant::now(),
        }
    }

    pub(crate) fn enter(&mut self, next: BuildPhase) {
        debug!(builder = self.builder, from = %self.phase, to = %next, "Build phase transition");
        self.phase = next;
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> BuildPhase {
        self.phase
    }

    /// Wrap an error with the phase it happened in and move to `Failed`.
    pub(crate) fn fail(&mut self, error: TreeError) -> TreeError {
        let phase = self.phase;
        warn!(
            builder = self.builder,
            phase = %phase,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Tree build failed: {}",
            error
        );
        self.phase = BuildPhase::Failed;
        TreeError::Build {
            phase,
            source: Box::new(error),
        }
    }

    pub(crate) fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
