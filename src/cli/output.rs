//! CLI output: tree rendering and error mapping to a stable CLI surface.

use crate::cli::parse::OutputFormat;
use crate::error::{CliError, TreeError};
use crate::tree::{Children, NodeTree};
use crate::views::TreeSnapshot;
use owo_colors::OwoColorize;

/// Map errors to a string for CLI output, naming the failing endpoint.
pub fn map_error(e: &CliError) -> String {
    match e {
        CliError::Tree(tree @ TreeError::Build { .. }) => {
            format!("{} (cause: {})", tree, tree.root_cause())
        }
        other => other.to_string(),
    }
}

pub fn render_snapshot(
    snapshot: &TreeSnapshot,
    format: OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&snapshot.tree)
            .map_err(|e| CliError::Output(e.to_string())),
        OutputFormat::Text => Ok(render_text(&snapshot.tree, color)),
    }
}

fn render_text(forest: &[NodeTree], color: bool) -> String {
    if forest.is_empty() {
        return "(no nodes)".to_string();
    }
    let mut lines = Vec::new();
    render_level(forest, 0, color, &mut lines);
    lines.join("\n")
}

fn render_level(forest: &[NodeTree], depth: usize, color: bool, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for tree in forest {
        let name = if tree.node.name.is_empty() {
            tree.id().to_string()
        } else {
            tree.node.name.clone()
        };
        let name = match (tree.matched, color) {
            (true, true) => name.green().bold().to_string(),
            (true, false) => format!("*{}", name),
            _ => name,
        };
        let id = format!("#{}", tree.id());
        let id = if color { id.dimmed().to_string() } else { id };

        let mut line = format!("{}{} {}", indent, name, id);
        if let Some(count) = tree.child_count {
            line.push_str(&format!(" ({})", count));
        }
        if matches!(tree.children, Children::Loading) {
            line.push_str(" …");
        }
        lines.push(line);

        if let Children::Resolved(children) = &tree.children {
            render_level(children, depth + 1, color, lines);
            if tree.has_more_children() {
                lines.push(format!("{}  + more", indent));
            }
        }
    }
}
