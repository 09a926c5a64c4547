use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use docslice_core::{Pipeline, PipelineMemory};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// State the CLI keeps between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliState {
    /// Last pipeline used per file extension.
    #[serde(default)]
    pub pipelines: PipelineMemory,
}

impl CliState {
    /// Return the default state directory path: ~/.config/docslice/
    pub fn default_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("could not determine user config directory")?
            .join("docslice");
        Ok(dir)
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::default_dir()?.join("state.toml"))
    }

    /// Load state from `path`, or the default path.
    /// A missing file yields empty state.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(?path, "State file not found, starting empty");
            return Ok(Self::default());
        }
        debug!(?path, "Loading state");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read state: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse state: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create state dir: {}", parent.display()))?;
        }
        let toml_str = toml::to_string_pretty(self).context("failed to serialize state")?;
        std::fs::write(path, toml_str)
            .with_context(|| format!("failed to write state: {}", path.display()))
    }

    /// Explicit choice first, then the remembered or first compatible pipeline.
    pub fn resolve_pipeline(&self, extension: &str, explicit: Option<Pipeline>) -> Option<Pipeline> {
        explicit.or_else(|| self.pipelines.select_for(extension))
    }
}
