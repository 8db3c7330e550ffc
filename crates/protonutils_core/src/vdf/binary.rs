//! Best-effort reader for the binary KeyValues file `shortcuts.vdf`.
//!
//! Entries are not length-prefixed, so the reader does not walk the grammar.
//! It scans for the `appid` key, steps back over the one-byte type tag that
//! precedes every key, reads the little-endian id that follows and carries on
//! scanning after it. String fields of an entry are picked up between its id
//! and the next entry.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Tree;
use crate::core_api::{CoreError, GameCatalog, GameInfo};
use crate::layout::ByteRange;
use crate::reader::{LittleEndianReader, find_ignore_ascii_case};

/// Bytes between the start of a shortcut record and its `appid` key match.
pub const INNER_OFFSET_SHORTCUTS: usize = 1;

const TYPE_STRING: u8 = 0x01;
const TYPE_INT32: u8 = 0x02;
const END_OF_MAP: u8 = 0x08;
const LAST_TYPE_TAG: u8 = 0x0B;

const APP_ID_KEY: &[u8] = b"appid\0";
const APP_NAME_KEY: &[u8] = b"AppName\0";
const EXE_KEY: &[u8] = b"Exe\0";
const START_DIR_KEY: &[u8] = b"StartDir\0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutEntry {
    pub app_id: u32,
    pub name: Option<String>,
    pub exe: Option<String>,
    pub start_dir: Option<String>,
    /// From the type tag of `appid` up to the next entry's tag.
    pub range: ByteRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutsView {
    entries: Vec<ShortcutEntry>,
}

pub fn parse_binary_shortcuts(bytes: &[u8]) -> Result<ShortcutsView, CoreError> {
    if !bytes.ends_with(&[END_OF_MAP, END_OF_MAP]) {
        return Err(CoreError::parse(
            bytes.len(),
            "truncated buffer: missing end-of-map markers",
        ));
    }

    let mut r = LittleEndianReader::new(bytes);
    let mut found_ids = Vec::new();
    while let Some(found) = r.find(APP_ID_KEY) {
        let lead_in = found
            .checked_sub(INNER_OFFSET_SHORTCUTS)
            .filter(|&start| bytes.get(start) == Some(&TYPE_INT32));
        let Some(record_start) = lead_in else {
            r.seek_to(found + 1)?;
            continue;
        };

        r.seek_to(found + APP_ID_KEY.len())?;
        let app_id = r.read_u32()?;
        // A real id is always followed by the next field's type tag.
        let after = r.position();
        match bytes.get(after) {
            Some(&tag) if tag <= LAST_TYPE_TAG => {}
            _ => {
                return Err(CoreError::parse(
                    after,
                    "truncated record: no field follows the app id",
                ));
            }
        }
        found_ids.push((record_start, after, app_id));
    }

    let mut entries = Vec::with_capacity(found_ids.len());
    for (index, &(start, fields_start, app_id)) in found_ids.iter().enumerate() {
        let end = found_ids
            .get(index + 1)
            .map_or(bytes.len(), |&(next_start, _, _)| next_start);
        let fields = ByteRange::new(fields_start, end);
        entries.push(ShortcutEntry {
            app_id,
            name: string_field(bytes, fields, APP_NAME_KEY)?,
            exe: string_field(bytes, fields, EXE_KEY)?,
            start_dir: string_field(bytes, fields, START_DIR_KEY)?,
            range: ByteRange::new(start, end),
        });
    }

    debug!(entries = entries.len(), bytes = bytes.len(), "scanned shortcuts");
    Ok(ShortcutsView { entries })
}

/// Finds a string-typed field named `key` inside `within`.
fn string_field(
    bytes: &[u8],
    within: ByteRange,
    key: &[u8],
) -> Result<Option<String>, CoreError> {
    let Some(region) = within.slice(bytes) else {
        return Ok(None);
    };

    let mut from = 0;
    while let Some(hit) = find_ignore_ascii_case(&region[from..], key) {
        let key_at = within.start + from + hit;
        if key_at > 0 && bytes.get(key_at - 1) == Some(&TYPE_STRING) {
            let mut r = LittleEndianReader::new(bytes);
            r.seek_to(key_at + key.len())?;
            let value = r.read_null_terminated_string()?;
            if r.position() > within.end {
                return Err(CoreError::parse(
                    key_at,
                    "string field runs past the end of its record",
                ));
            }
            return Ok(Some(value));
        }
        from += hit + 1;
    }
    Ok(None)
}

impl ShortcutsView {
    pub fn entries(&self) -> &[ShortcutEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, app_id: u32) -> Option<&ShortcutEntry> {
        self.entries.iter().find(|e| e.app_id == app_id)
    }

    /// Presents the entries as `shortcuts/<index>/{appid,AppName,Exe,StartDir}`.
    pub fn to_tree(&self) -> Tree {
        let mut tree = Tree::with_root("shortcuts");
        let root = tree.root_id();
        for (index, entry) in self.entries.iter().enumerate() {
            let Some(node) = tree.append_interior(root, &index.to_string()) else {
                continue;
            };
            tree.append_leaf(node, "appid", &entry.app_id.to_string());
            let fields = [
                ("AppName", &entry.name),
                ("Exe", &entry.exe),
                ("StartDir", &entry.start_dir),
            ];
            for (key, value) in fields {
                if let Some(value) = value {
                    tree.append_leaf(node, key, value);
                }
            }
        }
        tree
    }
}

impl GameCatalog for ShortcutsView {
    fn game_info(&self, app_id: &str) -> Option<GameInfo> {
        let app_id = app_id.parse::<u32>().ok()?;
        let entry = self.find(app_id)?;
        Some(GameInfo {
            name: entry.name.clone().unwrap_or_else(|| app_id.to_string()),
            is_installed: true,
        })
    }
}
