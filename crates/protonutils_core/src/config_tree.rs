use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core_api::CoreError;
use crate::identity::UserIdentity;
use crate::vdf::{self, NodeRef, Tree};

/// One text configuration file loaded into memory.
///
/// The tree is written back to the path it was loaded from, as a single
/// whole-file write. Nothing guards against another process changing the
/// file between load and save.
#[derive(Debug, Clone)]
pub struct ConfigTree {
    tree: Tree,
    path: PathBuf,
    owner: Option<UserIdentity>,
}

impl ConfigTree {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let bytes = fs::read(&path).map_err(|e| CoreError::io(&path, e))?;
        debug!(path = %path.display(), bytes = bytes.len(), "loading text config");
        Self::from_bytes(&bytes, path)
    }

    pub fn from_bytes(bytes: &[u8], path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        Ok(Self {
            tree: vdf::parse_text(bytes)?,
            path: path.into(),
            owner: None,
        })
    }

    /// Records the user this file belongs to.
    pub fn with_owner(mut self, owner: UserIdentity) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn owner(&self) -> Option<&UserIdentity> {
        self.owner.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.tree.root()
    }

    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Result<NodeRef<'_>, CoreError> {
        vdf::lookup(&self.tree, path)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.tree.to_bytes()
    }

    pub fn save(&self) -> Result<(), CoreError> {
        let bytes = self.to_bytes();
        fs::write(&self.path, &bytes).map_err(|e| CoreError::io(&self.path, e))?;
        info!(path = %self.path.display(), bytes = bytes.len(), "saved text config");
        Ok(())
    }
}
