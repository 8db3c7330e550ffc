use serde::{Deserialize, Serialize};

use crate::core_api::{CoreError, StaticCatalog};
use crate::vdf::{self, Tree};

const APP_STATE_KEY: &str = "AppState";
const STATE_FULLY_INSTALLED: u32 = 4;

/// The fields of a `steamapps/appmanifest_<id>.acf` file this crate uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppManifest {
    pub app_id: String,
    pub name: String,
    pub install_dir: Option<String>,
    pub is_installed: bool,
}

impl AppManifest {
    pub fn from_tree(tree: &Tree) -> Result<Self, CoreError> {
        let app_id = vdf::lookup(tree, &[APP_STATE_KEY, "appid"])?;
        let name = vdf::lookup(tree, &[APP_STATE_KEY, "name"])?;
        let state = tree.root();

        // Manifests without StateFlags predate the field and are complete.
        let is_installed = state
            .field("StateFlags")
            .and_then(|flags| flags.parse::<u32>().ok())
            .is_none_or(|flags| flags & STATE_FULLY_INSTALLED != 0);

        Ok(Self {
            app_id: app_id.value().unwrap_or_default().to_string(),
            name: name.value().unwrap_or_default().to_string(),
            install_dir: state.field("installdir").map(str::to_string),
            is_installed,
        })
    }
}

impl FromIterator<AppManifest> for StaticCatalog {
    fn from_iter<I: IntoIterator<Item = AppManifest>>(iter: I) -> Self {
        let mut catalog = StaticCatalog::new();
        for manifest in iter {
            catalog.insert(manifest.app_id, manifest.name, manifest.is_installed);
        }
        catalog
    }
}
