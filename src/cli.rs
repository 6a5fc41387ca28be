//! CLI domain: parse, route, and output only.
//! No tree logic; the route table dispatches to `HierarchyApi`.

mod output;
mod parse;
mod route;

pub use output::{map_error, render_snapshot};
pub use parse::{Cli, Commands, OutputFormat};
pub use route::{RunContext, SourceOverride};
