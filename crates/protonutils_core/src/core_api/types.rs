use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// What a catalog knows about one app id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameInfo {
    pub name: String,
    pub is_installed: bool,
}

/// Turns app ids into display names and install state.
///
/// The configuration files only store ids; names come from app manifests,
/// shortcuts or whatever other source the caller has.
pub trait GameCatalog {
    fn game_info(&self, app_id: &str) -> Option<GameInfo>;
}

impl<T: GameCatalog + ?Sized> GameCatalog for &T {
    fn game_info(&self, app_id: &str) -> Option<GameInfo> {
        (**self).game_info(app_id)
    }
}

/// Tries each catalog in order.
impl<A: GameCatalog, B: GameCatalog> GameCatalog for (A, B) {
    fn game_info(&self, app_id: &str) -> Option<GameInfo> {
        self.0.game_info(app_id).or_else(|| self.1.game_info(app_id))
    }
}

/// In-memory catalog keyed by app id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCatalog {
    games: HashMap<String, GameInfo>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, app_id: impl Into<String>, name: impl Into<String>, is_installed: bool) {
        self.games.insert(
            app_id.into(),
            GameInfo {
                name: name.into(),
                is_installed,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Entries sorted by name, then id.
    pub fn sorted(&self) -> Vec<(&str, &GameInfo)> {
        let mut out: Vec<_> = self
            .games
            .iter()
            .map(|(id, info)| (id.as_str(), info))
            .collect();
        out.sort_by(|a, b| a.1.name.cmp(&b.1.name).then_with(|| a.0.cmp(b.0)));
        out
    }
}

impl GameCatalog for StaticCatalog {
    fn game_info(&self, app_id: &str) -> Option<GameInfo> {
        self.games.get(app_id).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GameEntry {
    pub id: String,
    pub name: String,
    pub is_installed: bool,
}

impl Ord for GameEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.id.cmp(&other.id))
            .then_with(|| self.is_installed.cmp(&other.is_installed))
    }
}

impl PartialOrd for GameEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Version id -> games assigned to it, rebuilt from the config tree on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionMapping {
    versions: BTreeMap<String, BTreeSet<GameEntry>>,
}

impl VersionMapping {
    pub(crate) fn insert(&mut self, version: &str, game: GameEntry) {
        self.versions
            .entry(version.to_string())
            .or_default()
            .insert(game);
    }

    /// Games using `version`, sorted by name.
    pub fn games(&self, version: &str) -> Option<&BTreeSet<GameEntry>> {
        self.versions.get(version)
    }

    /// Version ids in sorted order.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<GameEntry>)> {
        self.versions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Version currently assigned to `game_id`, if any.
    pub fn version_of(&self, game_id: &str) -> Option<&str> {
        self.iter()
            .find(|(_, games)| games.iter().any(|g| g.id == game_id))
            .map(|(version, _)| version)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
