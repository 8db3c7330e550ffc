//! Compatibility tool assignments stored in `config/config.vdf`.
//!
//! Each child of the `CompatToolMapping` section is keyed by app id and names
//! its tool in a `name` field:
//!
//! ```text
//! "CompatToolMapping"
//! {
//!     "440"
//!     {
//!         "name"      "proton_7"
//!         "config"    ""
//!         "priority"  "250"
//!     }
//! }
//! ```
//!
//! App id `0` holds the tool used when a game has no entry of its own.

use tracing::debug;

use crate::config_tree::ConfigTree;
use crate::core_api::{CoreError, GameCatalog, GameEntry, VersionMapping};
use crate::local_config::is_app_id;
use crate::vdf::{NodeId, NodeRef};

pub const MAPPING_PATH: [&str; 5] = [
    "InstallConfigStore",
    "Software",
    "Valve",
    "Steam",
    "CompatToolMapping",
];
pub const DEFAULT_APP_ID: &str = "0";

const VERSION_FIELD: &str = "name";
const CONFIG_FIELD: &str = "config";
const PRIORITY_FIELD: &str = "priority";
const USER_PRIORITY: &str = "250";

#[derive(Debug, Clone)]
pub struct CompatToolMapping {
    config: ConfigTree,
    section: NodeId,
}

impl CompatToolMapping {
    pub fn open(path: impl Into<std::path::PathBuf>) -> Result<Self, CoreError> {
        Self::from_config(ConfigTree::load(path)?)
    }

    pub fn from_config(config: ConfigTree) -> Result<Self, CoreError> {
        let section = config.lookup(&MAPPING_PATH)?;
        if section.is_leaf() {
            return Err(CoreError::key_not_found(section.name()));
        }
        let section = section.id();
        Ok(Self { config, section })
    }

    pub fn config(&self) -> &ConfigTree {
        &self.config
    }

    pub fn into_config(self) -> ConfigTree {
        self.config
    }

    pub fn section(&self) -> NodeRef<'_> {
        self.config.tree().node(self.section)
    }

    fn entry(&self, game_id: &str) -> Option<NodeRef<'_>> {
        self.section().child(game_id)
    }

    pub fn version_of(&self, game_id: &str) -> Option<&str> {
        self.entry(game_id).and_then(entry_version)
    }

    pub fn default_version(&self) -> Option<&str> {
        self.version_of(DEFAULT_APP_ID)
    }

    /// Ids of every game entry assigned to `version`, in file order.
    pub fn games_using(&self, version: &str) -> Vec<String> {
        self.section()
            .children()
            .filter(|entry| entry.name() != DEFAULT_APP_ID)
            .filter(|entry| entry_version(*entry) == Some(version))
            .map(|entry| entry.name().to_string())
            .collect()
    }

    /// Groups mapped games by version. Entries with a non-numeric id, no
    /// version, or an id the catalog does not know are skipped.
    pub fn read_all<C: GameCatalog + ?Sized>(&self, catalog: &C) -> VersionMapping {
        let mut mapping = VersionMapping::default();
        for entry in self.section().children() {
            let id = entry.name();
            if !is_app_id(id) {
                debug!(entry = id, "skipping mapping with invalid app id");
                continue;
            }
            let Some(version) = entry_version(entry).filter(|v| !v.is_empty()) else {
                debug!(app_id = id, "skipping mapping without version");
                continue;
            };
            let Some(info) = catalog.game_info(id) else {
                debug!(app_id = id, "skipping mapping unknown to catalog");
                continue;
            };
            mapping.insert(
                version,
                GameEntry {
                    id: id.to_string(),
                    name: info.name,
                    is_installed: info.is_installed,
                },
            );
        }
        mapping
    }

    /// Assigns `version` to `game_id`, creating the entry if needed.
    pub fn update(&mut self, game_id: &str, version: &str) -> Result<(), CoreError> {
        let section = self.section;
        let existing = self.entry(game_id).map(|entry| {
            let field = entry
                .children()
                .find(|c| c.name() == VERSION_FIELD && c.is_leaf())
                .map(|c| c.id());
            (entry.id(), entry.is_leaf(), field)
        });

        let tree = self.config.tree_mut();
        match existing {
            Some((entry, true, _)) => {
                tree.set_value(entry, version);
            }
            Some((_, false, Some(field))) => {
                tree.set_value(field, version);
            }
            Some((entry, false, None)) => {
                tree.append_leaf(entry, VERSION_FIELD, version)
                    .ok_or_else(|| CoreError::key_not_found(game_id))?;
            }
            None => {
                let entry = tree
                    .append_interior(section, game_id)
                    .ok_or_else(|| CoreError::key_not_found(game_id))?;
                tree.append_leaf(entry, VERSION_FIELD, version);
                tree.append_leaf(entry, CONFIG_FIELD, "");
                tree.append_leaf(entry, PRIORITY_FIELD, USER_PRIORITY);
            }
        }
        debug!(app_id = game_id, version, "updated compat tool mapping");
        Ok(())
    }

    /// Drops the entry for `game_id`. The section itself is kept even when
    /// this empties it.
    pub fn remove(&mut self, game_id: &str) -> bool {
        let Some(entry) = self.entry(game_id).map(|e| e.id()) else {
            return false;
        };
        let section = self.section;
        let removed = self.config.tree_mut().remove_child(section, entry);
        debug!(app_id = game_id, removed, "removed compat tool mapping");
        removed
    }

    /// Moves every game using `from` to `to`; returns how many moved.
    pub fn migrate(&mut self, from: &str, to: &str) -> Result<usize, CoreError> {
        let games = self.games_using(from);
        for game in &games {
            self.update(game, to)?;
        }
        Ok(games.len())
    }

    pub fn save(&self) -> Result<(), CoreError> {
        self.config.save()
    }
}

fn entry_version(entry: NodeRef<'_>) -> Option<&str> {
    match entry.value() {
        Some(value) => Some(value),
        None => entry.field(VERSION_FIELD),
    }
}
