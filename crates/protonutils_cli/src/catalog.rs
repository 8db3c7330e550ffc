//! Builds the name catalog from app manifests in every Steam library and,
//! when a user is selected, from their non-Steam shortcuts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use protonutils_core::core_api::{Engine, StaticCatalog};
use protonutils_core::vdf::{NodeRef, ShortcutsView, parse_text};
use protonutils_core::AppManifest;
use tracing::{debug, warn};

const LIBRARY_FOLDERS_FILE: &str = "libraryfolders.vdf";
const MANIFEST_PREFIX: &str = "appmanifest_";
const MANIFEST_SUFFIX: &str = ".acf";

pub struct Catalog {
    pub apps: StaticCatalog,
    pub shortcuts: ShortcutsView,
}

impl Catalog {
    pub fn load(engine: &Engine) -> Result<Self> {
        let mut manifests = Vec::new();
        for dir in steamapps_dirs(engine)? {
            manifests.extend(read_manifests(&dir)?);
        }
        let apps: StaticCatalog = manifests.into_iter().collect();

        let shortcuts = if engine.user().is_some() {
            match engine.read_shortcuts() {
                Ok(view) => view,
                Err(err) => {
                    debug!("No shortcuts loaded: {err}");
                    ShortcutsView::default()
                }
            }
        } else {
            ShortcutsView::default()
        };

        debug!(
            "Catalog has {} apps and {} shortcuts",
            apps.len(),
            shortcuts.len()
        );
        Ok(Self { apps, shortcuts })
    }

    /// Steam apps first, then shortcuts.
    pub fn chain(&self) -> (&StaticCatalog, &ShortcutsView) {
        (&self.apps, &self.shortcuts)
    }

    /// Finds a game by app id, exact name or name prefix, ignoring case.
    /// The first match in name order wins.
    pub fn search(&self, query: &str) -> Option<(String, String)> {
        let mut candidates: Vec<(String, String)> = self
            .apps
            .sorted()
            .into_iter()
            .map(|(id, info)| (id.to_string(), info.name.clone()))
            .collect();
        candidates.extend(self.shortcuts.entries().iter().map(|entry| {
            let id = entry.app_id.to_string();
            let name = entry.name.clone().unwrap_or_else(|| id.clone());
            (id, name)
        }));

        if let Some(hit) = candidates.iter().find(|(id, _)| id == query) {
            return Some(hit.clone());
        }
        let query = query.to_lowercase();
        candidates
            .iter()
            .find(|(_, name)| name.to_lowercase() == query)
            .or_else(|| {
                candidates
                    .iter()
                    .find(|(_, name)| name.to_lowercase().starts_with(&query))
            })
            .cloned()
    }
}

/// `<root>/steamapps` plus the `steamapps` of every library listed in
/// `libraryfolders.vdf`, without duplicates.
fn steamapps_dirs(engine: &Engine) -> Result<Vec<PathBuf>> {
    let main = engine.steamapps_dir();
    let mut dirs = vec![main.clone()];

    let folders_path = main.join(LIBRARY_FOLDERS_FILE);
    let bytes = match fs::read(&folders_path) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!("No library folders at {}: {err}", folders_path.display());
            return Ok(dirs);
        }
    };
    let tree = parse_text(&bytes)
        .with_context(|| format!("Failed to parse {}", folders_path.display()))?;

    for folder in tree.root().children() {
        let Some(path) = library_path(folder) else {
            continue;
        };
        let dir = PathBuf::from(path).join("steamapps");
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    Ok(dirs)
}

/// Library entries are `"1" "/path"` in old files and `"0" { "path" ... }`
/// in current ones.
fn library_path(folder: NodeRef<'_>) -> Option<&str> {
    if !folder.name().bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    folder.value().or_else(|| folder.field("path"))
}

fn read_manifests(dir: &Path) -> Result<Vec<AppManifest>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!("Skipping library {}: {err}", dir.display());
            return Ok(Vec::new());
        }
    };

    let mut manifests = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if !file_name.starts_with(MANIFEST_PREFIX) || !file_name.ends_with(MANIFEST_SUFFIX) {
            continue;
        }

        let path = entry.path();
        let parsed = fs::read(&path)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| Ok(parse_text(&bytes)?))
            .and_then(|tree| Ok(AppManifest::from_tree(&tree)?));
        match parsed {
            Ok(manifest) => manifests.push(manifest),
            Err(err) => warn!("Ignoring unreadable manifest {}: {err}", path.display()),
        }
    }
    Ok(manifests)
}
