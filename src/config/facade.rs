//! Loader facade: assembles the layered sources into an `ArborConfig`.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::ArborConfig;
use crate::error::ConfigError;
use config::{Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global user file,
    /// `config/config.toml`, `config/{ARBOR_ENV}.toml`, `ARBOR__*` variables.
    pub fn load(workspace_root: &Path) -> Result<ArborConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let config = builder.add_source(Self::environment()).build()?;

        let loaded: ArborConfig = config.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(loaded)
    }

    /// Load a single file on top of the defaults; environment overrides still apply.
    pub fn load_from_file(path: &Path) -> Result<ArborConfig, ConfigError> {
        let config = merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true))
            .add_source(Self::environment())
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Path of the global user configuration file, if a home directory exists
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    fn environment() -> Environment {
        Environment::with_prefix("ARBOR")
            .separator("__")
            .try_parsing(true)
    }
}
