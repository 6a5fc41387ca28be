//! CLI route: single route table and run context. Dispatches to `HierarchyApi` and output.

use crate::api::HierarchyApi;
use crate::browse::{Expansion, RootQuery};
use crate::cli::output::render_snapshot;
use crate::cli::parse::{Commands, OutputFormat};
use crate::config::{ArborConfig, ConfigLoader, SourceKind};
use crate::error::CliError;
use crate::types::{NodeFilter, NodeId};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Where the node source comes from, as given on the command line
#[derive(Debug, Clone, Default)]
pub struct SourceOverride {
    pub fixture: Option<PathBuf>,
    pub endpoint: Option<String>,
}

/// Runtime context for CLI execution: configuration plus the hierarchy facade.
pub struct RunContext {
    api: HierarchyApi,
    config: ArborConfig,
    format: OutputFormat,
    color: bool,
}

impl RunContext {
    /// Load configuration, apply command-line overrides, and build the source.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        source: SourceOverride,
        format: OutputFormat,
    ) -> Result<Self, CliError> {
        let mut config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        if let Some(fixture) = source.fixture {
            config.source.kind = SourceKind::Memory;
            config.source.fixture = Some(fixture);
        }
        if let Some(endpoint) = source.endpoint {
            config.source.kind = SourceKind::Http;
            config.source.endpoint = Some(endpoint);
        }
        let config = config.validated()?;
        debug!(source = ?config.source.kind, "Run context configured");

        Ok(Self {
            api: HierarchyApi::from_config(&config)?,
            config,
            format,
            color: std::io::stdout().is_terminal(),
        })
    }

    pub fn api(&self) -> &HierarchyApi {
        &self.api
    }

    pub fn config(&self) -> &ArborConfig {
        &self.config
    }

    /// Force colored text output on or off.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    #[instrument(skip_all)]
    pub async fn execute(&self, command: &Commands) -> Result<String, CliError> {
        match command {
            Commands::Browse {
                root_ids,
                expand,
                more,
            } => {
                let roots = root_query(root_ids);
                let mut expansion: Expansion = expand.iter().cloned().collect();
                for id in more {
                    expansion.load_more(id.clone());
                }
                let snapshot = self.api.browse(&roots, &expansion).await?;
                render_snapshot(&snapshot, self.format, self.color)
            }
            Commands::Search { query, parent_ids } => {
                let filter = NodeFilter {
                    parent_ids: parent_ids.clone(),
                    ..NodeFilter::default()
                };
                let snapshot = self.api.search(query, &filter).await?;
                render_snapshot(&snapshot, self.format, self.color)
            }
            Commands::Reveal { id } => {
                let mut expansion = Expansion::new();
                match self
                    .api
                    .reveal(id, &RootQuery::default(), &mut expansion)
                    .await?
                {
                    Some(snapshot) => render_snapshot(&snapshot, self.format, self.color),
                    None => Ok(format!("Node {} is not accessible", id)),
                }
            }
        }
    }
}

fn root_query(root_ids: &[NodeId]) -> RootQuery {
    if root_ids.is_empty() {
        RootQuery::default()
    } else {
        RootQuery::Ids(root_ids.to_vec())
    }
}
