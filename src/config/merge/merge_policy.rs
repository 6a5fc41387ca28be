//! Merge rules: defaults, override order, conflict handling.
//!
//! Only keys whose absence would change meaning are seeded here; everything
//! else falls back to the serde defaults on the config structs.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("source.kind", "memory")?
        .set_default("browse.sort", "name")?
        .set_default("logging.level", "warn")
}
