use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::CoreError;
use crate::compat_tool::CompatToolMapping;
use crate::config_tree::ConfigTree;
use crate::identity::{self, UserIdentity};
use crate::local_config::LocalConfig;
use crate::login_users::KnownUsers;
use crate::vdf::{ShortcutsView, parse_binary_shortcuts};

/// Session context: one Steam installation and, optionally, one user.
///
/// Every file the engine opens is located from this value, so independent
/// engines can be used side by side.
#[derive(Debug, Clone)]
pub struct Engine {
    steam_root: PathBuf,
    user: Option<UserIdentity>,
}

impl Engine {
    pub fn new(steam_root: impl Into<PathBuf>) -> Self {
        Self {
            steam_root: steam_root.into(),
            user: None,
        }
    }

    pub fn with_user(mut self, user: UserIdentity) -> Self {
        self.user = Some(user);
        self
    }

    /// Resolves `input` against `loginusers.vdf` and selects that user.
    pub fn select_user(self, input: &str) -> Result<Self, CoreError> {
        let known = self.open_login_users()?;
        let user = identity::resolve(input, &known)?;
        debug!(input, user = %user, "selected user");
        Ok(self.with_user(user))
    }

    pub fn steam_root(&self) -> &Path {
        &self.steam_root
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        self.user.as_ref()
    }

    fn require_user(&self) -> Result<&UserIdentity, CoreError> {
        self.user
            .as_ref()
            .ok_or_else(CoreError::no_user)
    }

    pub fn config_path(&self) -> PathBuf {
        self.steam_root.join("config").join("config.vdf")
    }

    pub fn login_users_path(&self) -> PathBuf {
        self.steam_root.join("config").join("loginusers.vdf")
    }

    pub fn steamapps_dir(&self) -> PathBuf {
        self.steam_root.join("steamapps")
    }

    /// Custom tools installed next to the Steam client.
    pub fn compat_tools_dir(&self) -> PathBuf {
        self.steam_root.join("compatibilitytools.d")
    }

    pub fn userdata_dir(&self) -> PathBuf {
        self.steam_root.join("userdata")
    }

    pub fn user_config_dir(&self) -> Result<PathBuf, CoreError> {
        let user = self.require_user()?;
        Ok(self
            .userdata_dir()
            .join(user.display_id32())
            .join("config"))
    }

    pub fn local_config_path(&self) -> Result<PathBuf, CoreError> {
        Ok(self.user_config_dir()?.join("localconfig.vdf"))
    }

    pub fn shortcuts_path(&self) -> Result<PathBuf, CoreError> {
        Ok(self.user_config_dir()?.join("shortcuts.vdf"))
    }

    pub fn open_login_users(&self) -> Result<KnownUsers, CoreError> {
        let config = ConfigTree::load(self.login_users_path())?;
        KnownUsers::from_tree(config.tree())
    }

    /// Loads `config/config.vdf`, owned by the selected user if there is one.
    pub fn open_config(&self) -> Result<ConfigTree, CoreError> {
        let config = ConfigTree::load(self.config_path())?;
        Ok(match &self.user {
            Some(user) => config.with_owner(user.clone()),
            None => config,
        })
    }

    pub fn open_compat_tool_mapping(&self) -> Result<CompatToolMapping, CoreError> {
        CompatToolMapping::from_config(self.open_config()?)
    }

    pub fn open_local_config(&self) -> Result<LocalConfig, CoreError> {
        let user = self.require_user()?.clone();
        let config = ConfigTree::load(self.local_config_path()?)?.with_owner(user);
        LocalConfig::from_config(config)
    }

    pub fn read_shortcuts(&self) -> Result<ShortcutsView, CoreError> {
        let path = self.shortcuts_path()?;
        let bytes = fs::read(&path).map_err(|e| CoreError::io(&path, e))?;
        debug!(path = %path.display(), bytes = bytes.len(), "loading shortcuts");
        parse_binary_shortcuts(&bytes)
    }
}
