use std::fs;
use std::path::{Path, PathBuf};

use protonutils_core::core_api::{CoreErrorCode, Engine, StaticCatalog};
use protonutils_core::local_config::{APPS_PATH, eligible_app_ids};
use protonutils_core::vdf::parse_text;
use protonutils_core::{AppManifest, ConfigTree, KnownUsers};
use tempfile::TempDir;

const GABEN_ID32: &str = "22202";

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn copy_fixture(name: &str, to: &Path) {
    fs::create_dir_all(to.parent().expect("target has a parent")).expect("failed to create dir");
    fs::copy(fixture_path(name), to).expect("failed to copy fixture");
}

fn steam_root() -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let root = dir.path();
    copy_fixture("config.vdf", &root.join("config/config.vdf"));
    copy_fixture("loginusers.vdf", &root.join("config/loginusers.vdf"));
    copy_fixture(
        "localconfig.vdf",
        &root.join("userdata").join(GABEN_ID32).join("config/localconfig.vdf"),
    );
    dir
}

fn manifest_catalog() -> StaticCatalog {
    ["appmanifest_440.acf", "appmanifest_570.acf"]
        .into_iter()
        .map(|name| {
            let config = ConfigTree::load(fixture_path(name)).expect("failed to load manifest");
            AppManifest::from_tree(config.tree()).expect("failed to read manifest")
        })
        .collect()
}

#[test]
fn only_viewed_steam_play_apps_are_eligible() {
    let tree = parse_text(
        b"apps { 100 { ViewedSteamPlay \"1\" } 200 { ViewedSteamPlay \"0\" } }",
    )
    .expect("parse failed");
    assert_eq!(eligible_app_ids(tree.root(), true), vec!["100"]);
    assert_eq!(eligible_app_ids(tree.root(), false), vec!["100", "200"]);
}

#[test]
fn selects_user_by_account_name() {
    let dir = steam_root();
    let engine = Engine::new(dir.path()).select_user("gaben").expect("known user");
    let user = engine.user().expect("user selected");
    assert_eq!(user.display_id32(), GABEN_ID32);
    assert_eq!(
        engine.local_config_path().expect("user selected"),
        dir.path().join("userdata/22202/config/localconfig.vdf")
    );
}

#[test]
fn selects_user_by_persona_name_or_number() {
    let dir = steam_root();
    let by_persona = Engine::new(dir.path()).select_user("Gabe").expect("persona");
    let by_number = Engine::new(dir.path()).select_user(GABEN_ID32).expect("id32");
    assert_eq!(by_persona.user(), by_number.user());
}

#[test]
fn unknown_user_is_identity_error() {
    let dir = steam_root();
    let err = Engine::new(dir.path())
        .select_user("nobody")
        .expect_err("unknown user");
    assert_eq!(err.code(), CoreErrorCode::Identity);
}

#[test]
fn user_paths_require_a_user() {
    let dir = steam_root();
    let engine = Engine::new(dir.path());
    let err = engine.open_local_config().expect_err("no user selected");
    assert_eq!(err.code(), CoreErrorCode::Identity);
    assert_eq!(err.to_string(), "no user selected");
}

#[test]
fn login_users_expose_most_recent() {
    let config = ConfigTree::load(fixture_path("loginusers.vdf")).expect("load failed");
    let users = KnownUsers::from_tree(config.tree()).expect("users section");
    assert_eq!(users.most_recent(), Some("76561197960287930"));
    assert_eq!(users.id64("second"), Some("76561198000000001"));
    assert_eq!(users.id64("Second Player"), Some("76561198000000001"));
    assert_eq!(users.len(), 4);
}

#[test]
fn local_config_games_are_filtered_and_named() {
    let dir = steam_root();
    let engine = Engine::new(dir.path()).select_user("gaben").expect("known user");
    let local = engine.open_local_config().expect("local config");
    assert_eq!(local.apps().path(), APPS_PATH.join("/"));
    assert_eq!(local.config().owner(), engine.user());

    assert_eq!(local.eligible_app_ids(true), vec!["440", "730"]);

    let games = local.games(&manifest_catalog(), true);
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].name, "Team Fortress 2");
    assert!(games[0].is_installed);
}

#[test]
fn manifests_report_install_state() {
    let catalog = manifest_catalog();
    let dir = steam_root();
    let mapping = Engine::new(dir.path())
        .open_compat_tool_mapping()
        .expect("mapping section");
    let versions = mapping.read_all(&catalog);
    let games = versions.games("proton_7").expect("proton_7 mapped");
    let dota = games.iter().find(|g| g.id == "570").expect("dota mapped");
    assert!(!dota.is_installed);
    assert_eq!(dota.name, "Dota 2");
}

#[test]
fn engine_roundtrip_saves_mapping() {
    let dir = steam_root();
    let engine = Engine::new(dir.path()).select_user("gaben").expect("known user");

    let mut mapping = engine.open_compat_tool_mapping().expect("mapping section");
    assert_eq!(mapping.config().owner(), engine.user());
    mapping.update("730", "proton_8").expect("update failed");
    mapping.save().expect("save failed");

    let reopened = engine.open_compat_tool_mapping().expect("mapping section");
    assert_eq!(reopened.version_of("730"), Some("proton_8"));
}

#[test]
fn missing_shortcuts_file_is_io_error() {
    let dir = steam_root();
    let engine = Engine::new(dir.path()).select_user("gaben").expect("known user");
    let err = engine.read_shortcuts().expect_err("no shortcuts.vdf");
    assert_eq!(err.code(), CoreErrorCode::Io);
}

#[test]
fn open_config_without_user_has_no_owner() {
    let dir = steam_root();
    let engine = Engine::new(dir.path());
    let config = engine.open_config().expect("config.vdf");
    assert!(config.owner().is_none());
    assert_eq!(config.path(), dir.path().join("config/config.vdf"));
    assert_eq!(
        engine.compat_tools_dir(),
        dir.path().join("compatibilitytools.d")
    );
}
