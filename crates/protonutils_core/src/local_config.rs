//! Per-user app settings from `userdata/<id32>/config/localconfig.vdf`.

use tracing::debug;

use crate::config_tree::ConfigTree;
use crate::core_api::{CoreError, GameCatalog, GameEntry};
use crate::vdf::{NodeId, NodeRef};

pub const APPS_PATH: [&str; 5] = ["UserLocalConfigStore", "Software", "Valve", "Steam", "apps"];

const VIEWED_STEAM_PLAY_FIELD: &str = "ViewedSteamPlay";

#[derive(Debug, Clone)]
pub struct LocalConfig {
    config: ConfigTree,
    apps: NodeId,
}

impl LocalConfig {
    pub fn from_config(config: ConfigTree) -> Result<Self, CoreError> {
        let apps = config.lookup(&APPS_PATH)?.id();
        Ok(Self { config, apps })
    }

    pub fn config(&self) -> &ConfigTree {
        &self.config
    }

    pub fn apps(&self) -> NodeRef<'_> {
        self.config.tree().node(self.apps)
    }

    pub fn eligible_app_ids(&self, enable_viewed_steam_play: bool) -> Vec<&str> {
        eligible_app_ids(self.apps(), enable_viewed_steam_play)
    }

    /// Eligible apps the catalog knows about; unknown ids are skipped.
    pub fn games<C: GameCatalog + ?Sized>(
        &self,
        catalog: &C,
        enable_viewed_steam_play: bool,
    ) -> Vec<GameEntry> {
        self.eligible_app_ids(enable_viewed_steam_play)
            .into_iter()
            .filter_map(|id| {
                let Some(info) = catalog.game_info(id) else {
                    debug!(app_id = id, "skipping app unknown to catalog");
                    return None;
                };
                Some(GameEntry {
                    id: id.to_string(),
                    name: info.name,
                    is_installed: info.is_installed,
                })
            })
            .collect()
    }
}

/// App ids under an `apps` section. With `enable_viewed_steam_play` only apps
/// whose `ViewedSteamPlay` field is `"1"` are returned.
pub fn eligible_app_ids(apps: NodeRef<'_>, enable_viewed_steam_play: bool) -> Vec<&str> {
    apps.children()
        .filter(|app| is_app_id(app.name()))
        .filter(|app| {
            !enable_viewed_steam_play || app.field(VIEWED_STEAM_PLAY_FIELD) == Some("1")
        })
        .map(|app| app.name())
        .collect()
}

pub(crate) fn is_app_id(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}
