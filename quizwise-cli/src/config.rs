//! Engine config resolution for the CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quizwise_core::EngineConfig;
use tracing::debug;

/// User config path (platform-specific)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("quizwise").join("config.toml"))
}

/// Load the engine config.
///
/// An explicit path must exist. Otherwise the user config is used when
/// present, and the built-in defaults when not.
pub fn load(explicit: Option<&Path>) -> Result<EngineConfig> {
    if let Some(path) = explicit {
        return EngineConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }
    load_optional(user_config_path())
}

fn load_optional(path: Option<PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) if path.exists() => {
            debug!(path = %path.display(), "Loading user config");
            EngineConfig::load(&path)
                .with_context(|| format!("Failed to load config from {}", path.display()))
        }
        _ => Ok(EngineConfig::default()),
    }
}
