//! Error types for the hierarchy tree synchronization engine.

use crate::phase::BuildPhase;
use crate::types::Endpoint;
use thiserror::Error;

/// Errors reported by a node source collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Server returned {code}: {message}")]
    Status { code: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the cache and the tree builders
///
/// Cloneable so that one failed request can be delivered to every caller
/// waiting on the same cache key.
#[derive(Debug, Clone, Error)]
pub enum TreeError {
    #[error("{endpoint} request failed: {source}")]
    Fetch {
        endpoint: Endpoint,
        #[source]
        source: SourceError,
    },

    #[error("Shared request {0} was dropped before it completed")]
    Abandoned(String),

    #[error("Tree build failed while {phase}: {source}")]
    Build {
        phase: BuildPhase,
        #[source]
        source: Box<TreeError>,
    },
}

impl TreeError {
    pub fn fetch(endpoint: Endpoint, source: SourceError) -> Self {
        TreeError::Fetch { endpoint, source }
    }

    /// Innermost fetch error, skipping build-phase wrappers
    pub fn root_cause(&self) -> &TreeError {
        match self {
            TreeError::Build { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Configuration and startup errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Fixture error: {0}")]
    Fixture(String),
}

/// Errors surfaced by the command-line front end
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("Failed to render output: {0}")]
    Output(String),
}
