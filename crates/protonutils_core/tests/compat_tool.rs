use std::fs;
use std::path::PathBuf;

use protonutils_core::compat_tool::MAPPING_PATH;
use protonutils_core::core_api::{CoreErrorCode, StaticCatalog};
use protonutils_core::{CompatToolMapping, ConfigTree};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn load_fixture_mapping() -> CompatToolMapping {
    CompatToolMapping::open(fixture_path("config.vdf")).expect("failed to open config.vdf")
}

fn empty_mapping() -> CompatToolMapping {
    let text = "\"InstallConfigStore\"\n{\n\t\"Software\"\n\t{\n\t\t\"Valve\"\n\t\t{\n\t\t\t\"Steam\"\n\t\t\t{\n\t\t\t\t\"CompatToolMapping\"\n\t\t\t\t{\n\t\t\t\t}\n\t\t\t}\n\t\t}\n\t}\n}\n";
    let config = ConfigTree::from_bytes(text.as_bytes(), "config.vdf").expect("failed to parse");
    CompatToolMapping::from_config(config).expect("mapping section should exist")
}

fn reparse(mapping: &CompatToolMapping) -> CompatToolMapping {
    let bytes = mapping.config().to_bytes();
    let config = ConfigTree::from_bytes(&bytes, mapping.config().path()).expect("reparse failed");
    CompatToolMapping::from_config(config).expect("mapping section lost on reparse")
}

fn entry_count(mapping: &CompatToolMapping, game_id: &str) -> usize {
    mapping
        .section()
        .children()
        .filter(|c| c.name() == game_id)
        .count()
}

fn catalog() -> StaticCatalog {
    let mut catalog = StaticCatalog::new();
    catalog.insert("440", "Team Fortress 2", true);
    catalog.insert("570", "Dota 2", false);
    catalog.insert("730", "Counter-Strike 2", true);
    catalog.insert("9999", "Broken Entry", true);
    catalog
}

#[test]
fn update_on_empty_section_creates_one_entry_then_changes_it_in_place() {
    let mut mapping = empty_mapping();

    mapping.update("440", "proton_7").expect("update failed");
    assert_eq!(entry_count(&mapping, "440"), 1);
    assert_eq!(mapping.version_of("440"), Some("proton_7"));

    mapping.update("440", "proton_8").expect("update failed");
    assert_eq!(entry_count(&mapping, "440"), 1);
    assert_eq!(mapping.section().children().count(), 1);
    assert_eq!(mapping.version_of("440"), Some("proton_8"));
}

#[test]
fn created_entry_uses_steam_layout() {
    let mut mapping = empty_mapping();
    mapping.update("440", "proton_7").expect("update failed");
    let text = String::from_utf8(mapping.config().to_bytes()).expect("utf-8 output");
    assert!(text.contains(
        "\t\t\t\t\"CompatToolMapping\"\n\t\t\t\t{\n\t\t\t\t\t\"440\"\n\t\t\t\t\t{\n\t\t\t\t\t\t\"name\"\t\t\"proton_7\"\n\t\t\t\t\t\t\"config\"\t\t\"\"\n\t\t\t\t\t\t\"priority\"\t\t\"250\"\n\t\t\t\t\t}\n\t\t\t\t}\n"
    ));
}

#[test]
fn repeated_upsert_through_serialization_is_stable() {
    let mut mapping = load_fixture_mapping();
    for _ in 0..2 {
        mapping.update("1245620", "proton_experimental").expect("update failed");
        mapping = reparse(&mapping);
    }
    assert_eq!(entry_count(&mapping, "1245620"), 1);
    assert_eq!(mapping.version_of("1245620"), Some("proton_experimental"));

    let once = mapping.config().to_bytes();
    mapping.update("1245620", "proton_experimental").expect("update failed");
    assert_eq!(mapping.config().to_bytes(), once);
}

#[test]
fn update_touches_only_the_changed_value() {
    let original = fs::read(fixture_path("config.vdf")).expect("failed to read fixture");
    let mut mapping = load_fixture_mapping();
    mapping.update("570", "proton_8").expect("update failed");

    let expected = String::from_utf8(original)
        .expect("utf-8 fixture")
        .replacen(
            "\"570\"\n\t\t\t\t\t{\n\t\t\t\t\t\t\"name\"\t\t\"proton_7\"",
            "\"570\"\n\t\t\t\t\t{\n\t\t\t\t\t\t\"name\"\t\t\"proton_8\"",
            1,
        );
    assert_eq!(mapping.config().to_bytes(), expected.into_bytes());
}

#[test]
fn read_all_groups_games_by_version_and_skips_bad_entries() {
    let mapping = load_fixture_mapping();
    let versions = mapping.read_all(&catalog());

    let names: Vec<&str> = versions.versions().collect();
    assert_eq!(names, vec!["GE-Proton8-25", "proton_7"]);

    let proton7: Vec<&str> = versions
        .games("proton_7")
        .expect("proton_7 should be mapped")
        .iter()
        .map(|g| g.name.as_str())
        .collect();
    assert_eq!(proton7, vec!["Dota 2", "Team Fortress 2"]);
    assert_eq!(versions.version_of("730"), Some("GE-Proton8-25"));
    assert_eq!(versions.version_of("9999"), None);
}

#[test]
fn read_all_skips_games_missing_from_catalog() {
    let mapping = load_fixture_mapping();
    let mut only_tf2 = StaticCatalog::new();
    only_tf2.insert("440", "Team Fortress 2", true);

    let versions = mapping.read_all(&only_tf2);
    assert_eq!(versions.len(), 1);
    let games = versions.games("proton_7").expect("proton_7 should be mapped");
    assert_eq!(games.len(), 1);
}

#[test]
fn leaf_entries_are_read_and_updated_in_place() {
    let text = b"InstallConfigStore { Software { Valve { Steam { CompatToolMapping { 440 proton_6 } } } } }";
    let config = ConfigTree::from_bytes(text, "config.vdf").expect("parse failed");
    let mut mapping = CompatToolMapping::from_config(config).expect("section should exist");
    assert_eq!(mapping.version_of("440"), Some("proton_6"));

    mapping.update("440", "proton_7").expect("update failed");
    assert_eq!(
        mapping.config().to_bytes(),
        b"InstallConfigStore { Software { Valve { Steam { CompatToolMapping { 440 \"proton_7\" } } } } }".to_vec()
    );
}

#[test]
fn default_tool_and_games_using() {
    let mapping = load_fixture_mapping();
    assert_eq!(mapping.default_version(), Some("proton_8"));
    assert_eq!(mapping.games_using("proton_7"), vec!["440", "570"]);
    assert!(mapping.games_using("proton_8").is_empty());
}

#[test]
fn migrate_moves_every_game() {
    let mut mapping = load_fixture_mapping();
    let moved = mapping.migrate("proton_7", "proton_8").expect("migrate failed");
    assert_eq!(moved, 2);
    assert!(mapping.games_using("proton_7").is_empty());
    assert_eq!(mapping.games_using("proton_8"), vec!["440", "570"]);
    assert_eq!(mapping.default_version(), Some("proton_8"));
}

#[test]
fn removing_last_entry_keeps_the_section() {
    let mut mapping = empty_mapping();
    mapping.update("440", "proton_7").expect("update failed");
    assert!(mapping.remove("440"));
    assert!(!mapping.remove("440"));

    let reparsed = reparse(&mapping);
    assert_eq!(reparsed.section().children().count(), 0);
    assert_eq!(reparsed.section().name(), "CompatToolMapping");
}

#[test]
fn missing_section_reports_segment() {
    let config = ConfigTree::from_bytes(
        b"InstallConfigStore { Software { Valve { Steam { } } } }",
        "config.vdf",
    )
    .expect("parse failed");
    let err = CompatToolMapping::from_config(config).expect_err("section is missing");
    assert_eq!(err.code(), CoreErrorCode::KeyNotFound);
    assert_eq!(err.missing_segment(), Some(MAPPING_PATH[4]));
}

#[test]
fn save_writes_back_to_source_path() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("config.vdf");
    fs::copy(fixture_path("config.vdf"), &path).expect("failed to copy fixture");

    let mut mapping = CompatToolMapping::open(&path).expect("failed to open copy");
    mapping.update("1091500", "proton_8").expect("update failed");
    mapping.save().expect("save failed");

    let reloaded = CompatToolMapping::open(&path).expect("failed to reopen");
    assert_eq!(reloaded.version_of("1091500"), Some("proton_8"));
    assert_eq!(reloaded.version_of("440"), Some("proton_7"));
    assert_eq!(
        fs::read(&path).expect("failed to read saved file"),
        reloaded.config().to_bytes()
    );
}

#[test]
fn open_missing_file_is_io_error() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let err = CompatToolMapping::open(dir.path().join("nope.vdf")).expect_err("file is missing");
    assert_eq!(err.code(), CoreErrorCode::Io);
}
