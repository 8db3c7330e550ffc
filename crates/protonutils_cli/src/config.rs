use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CONFIG_DIR_NAME: &str = "protonutils";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Settings read from `config.yaml`. Command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub steam_root: Option<PathBuf>,
    pub user: Option<String>,
    /// List every app from localconfig.vdf, not only those where the Steam
    /// Play notice was acknowledged.
    pub ignore_viewed_steam_play: bool,
}

impl CliConfig {
    /// `$XDG_CONFIG_HOME/protonutils/config.yaml`, else `~/.config/...`.
    pub fn default_path() -> Option<PathBuf> {
        let base = env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| home_dir().map(|home| home.join(".config")))?;
        Some(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Loads `explicit` (which must exist) or the default path (which may
    /// be missing, giving defaults).
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                Some(path) => {
                    tracing::debug!("No config file at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                None => return Ok(Self::default()),
            },
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_yaml_ng::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Configured Steam root, else `~/.local/share/Steam`.
    pub fn resolve_steam_root(&self) -> Option<PathBuf> {
        match &self.steam_root {
            Some(root) => Some(root.clone()),
            None => home_dir().map(|home| home.join(".local/share/Steam")),
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
