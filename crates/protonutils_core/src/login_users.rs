use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core_api::CoreError;
use crate::vdf::{self, Tree};

const USERS_KEY: &str = "users";
const NAME_FIELDS: [&str; 2] = ["AccountName", "PersonaName"];
const MOST_RECENT_FIELD: &str = "MostRecent";

/// Name -> 64-bit id table, usually read from `config/loginusers.vdf`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownUsers {
    by_name: BTreeMap<String, String>,
    most_recent: Option<String>,
}

impl KnownUsers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `users/<id64>/{AccountName,PersonaName}`. When two users share a
    /// name the first one in the file keeps it.
    pub fn from_tree(tree: &Tree) -> Result<Self, CoreError> {
        let users = vdf::lookup(tree, &[USERS_KEY])?;
        let mut known = Self::new();
        for user in users.children() {
            let id64 = user.name();
            for field in NAME_FIELDS {
                if let Some(name) = user.field(field).filter(|n| !n.is_empty()) {
                    known
                        .by_name
                        .entry(name.to_string())
                        .or_insert_with(|| id64.to_string());
                }
            }
            if known.most_recent.is_none() && user.field(MOST_RECENT_FIELD) == Some("1") {
                known.most_recent = Some(id64.to_string());
            }
        }
        Ok(known)
    }

    pub fn insert(&mut self, name: impl Into<String>, id64: impl Into<String>) {
        self.by_name.insert(name.into(), id64.into());
    }

    pub fn id64(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    /// The user flagged `MostRecent`, if any.
    pub fn most_recent(&self) -> Option<&str> {
        self.most_recent.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_name.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
