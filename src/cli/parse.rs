//! CLI parse: clap types for Arbor. No behavior; definitions only.

use crate::types::NodeId;
use clap::{Parser, Subcommand, ValueEnum};
use std::convert::Infallible;
use std::path::PathBuf;

/// Arbor CLI - browse and search large entity hierarchies lazily
#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Browse and search large entity hierarchies lazily")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON fixture to serve from memory (implies the memory source)
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Base URL of a remote store (implies the http source)
    #[arg(long, conflicts_with = "fixture")]
    pub endpoint: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the browse tree
    Browse {
        /// Use these nodes as the top level instead of listing roots
        #[arg(long = "root-id", value_parser = parse_node_id)]
        root_ids: Vec<NodeId>,
        /// Expand a node (repeatable)
        #[arg(long, value_parser = parse_node_id)]
        expand: Vec<NodeId>,
        /// Load one more page of children under a node (repeatable)
        #[arg(long, value_parser = parse_node_id)]
        more: Vec<NodeId>,
    },
    /// Show every match for a text query with its ancestors
    Search {
        query: String,
        /// Restrict to direct children of these parents
        #[arg(long = "parent-id", value_parser = parse_node_id)]
        parent_ids: Vec<NodeId>,
    },
    /// Show the browse tree expanded down to one node
    Reveal {
        #[arg(value_parser = parse_node_id)]
        id: NodeId,
    },
}

/// Numeric ids become `NodeId::Int`; clap would otherwise pick `From<String>`.
fn parse_node_id(raw: &str) -> Result<NodeId, Infallible> {
    raw.parse()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
