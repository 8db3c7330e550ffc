mod catalog;
mod config;
mod logging;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Component, Path, PathBuf};
use std::process;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use protonutils_core::compat_tool::DEFAULT_APP_ID;
use protonutils_core::core_api::{Engine, GameEntry, VersionMapping};
use protonutils_core::identity;
use protonutils_core::{CompatToolMapping, UserIdentity};
use serde_json::{Value as JsonValue, json};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::CliConfig;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Steam installation directory.
    #[arg(long, global = true, value_name = "DIR")]
    steam_root: Option<PathBuf>,
    /// Steam account name, persona name or numeric id.
    #[arg(long, short = 'u', global = true)]
    user: Option<String>,
    /// Configuration file (default: $XDG_CONFIG_HOME/protonutils/config.yaml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage compatibility tool assignments.
    #[command(subcommand)]
    Compattool(CompatToolCommand),
    /// Resolve a user, or list the users known to this installation.
    User {
        input: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// List the selected user's non-Steam shortcuts.
    Shortcuts {
        #[arg(long)]
        json: bool,
    },
    /// List the selected user's apps that acknowledged Steam Play.
    Apps {
        /// Include apps regardless of the Steam Play notice.
        #[arg(long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum CompatToolCommand {
    /// List tool versions and the games using them.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Assign a tool version to one game. The game may be given by app id,
    /// name or name prefix.
    Set {
        game: String,
        version: String,
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Move every game from one tool version to another.
    Migrate {
        from: String,
        to: String,
        #[arg(long, short = 'y')]
        yes: bool,
        /// Delete the source tool from compatibilitytools.d afterwards. The
        /// global default moves too when it uses the source tool.
        #[arg(long, short = 'r')]
        remove: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = logging::setup_logging(cli.verbose) {
        eprintln!("{err:#}");
    }

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let steam_root = cli
        .steam_root
        .clone()
        .or_else(|| config.resolve_steam_root())
        .ok_or_else(|| anyhow!("cannot locate Steam; pass --steam-root"))?;
    debug!("Using Steam root {}", steam_root.display());
    let engine = Engine::new(steam_root);
    let user_input = cli.user.clone().or_else(|| config.user.clone());

    match cli.command {
        Command::Compattool(command) => {
            let engine = select_user(engine, user_input.as_deref(), false)?;
            match command {
                CompatToolCommand::List { json } => compat_tool_list(&engine, json),
                CompatToolCommand::Set { game, version, yes } => {
                    compat_tool_set(&engine, &game, &version, yes)
                }
                CompatToolCommand::Migrate {
                    from,
                    to,
                    yes,
                    remove,
                } => compat_tool_migrate(&engine, &from, &to, yes, remove),
            }
        }
        Command::User { input, json } => user(&engine, input.or(user_input).as_deref(), json),
        Command::Shortcuts { json } => {
            let engine = select_user(engine, user_input.as_deref(), true)?;
            shortcuts(&engine, json)
        }
        Command::Apps { all, json } => {
            let engine = select_user(engine, user_input.as_deref(), true)?;
            apps(&engine, all || config.ignore_viewed_steam_play, json)
        }
    }
}

/// Picks the user from `input`, else the most recent login, else the only
/// user directory. Fails only when `required` and nothing matches.
fn select_user(engine: Engine, input: Option<&str>, required: bool) -> Result<Engine> {
    if let Some(input) = input {
        return engine
            .select_user(input)
            .with_context(|| format!("Failed to select user {input:?}"));
    }

    match engine.open_login_users() {
        Ok(known) => {
            if let Some(id64) = known.most_recent() {
                let id64 = id64.to_string();
                return engine
                    .select_user(&id64)
                    .context("Failed to select the most recent user");
            }
        }
        Err(err) => debug!("No login users: {err}"),
    }

    let account_ids = userdata_accounts(&engine);
    if let Some(&first) = account_ids.first() {
        if account_ids.len() > 1 {
            warn!(
                "Found {} users, using {first}; pass --user to choose",
                account_ids.len()
            );
        }
        if let Some(user) = UserIdentity::from_account_id(first) {
            return Ok(engine.with_user(user));
        }
    }

    if required {
        bail!("no Steam user found; pass --user");
    }
    Ok(engine)
}

/// Account ids of the numeric directories under `userdata`, except `0`.
fn userdata_accounts(engine: &Engine) -> Vec<u32> {
    let Ok(entries) = fs::read_dir(engine.userdata_dir()) else {
        return Vec::new();
    };
    let mut ids: Vec<u32> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
        .filter(|&id| id != 0)
        .collect();
    ids.sort_unstable();
    ids
}

fn compat_tool_list(engine: &Engine, json: bool) -> Result<()> {
    let mapping = engine
        .open_compat_tool_mapping()
        .context("Failed to read compatibility tool mapping")?;
    let catalog = Catalog::load(engine)?;
    let versions = mapping.read_all(&catalog.chain());
    let default_version = mapping.default_version();

    if json {
        let out = json!({
            "default": default_version,
            "versions": versions,
        });
        print_json(&out)?;
        return Ok(());
    }

    if let Some(default) = default_version {
        println!("Default: {default}");
        println!();
    }
    for (version, games) in versions.iter() {
        println!("{version}");
        for game in games {
            print_game(game);
        }
        println!();
    }
    Ok(())
}

fn print_game(game: &GameEntry) {
    let marker = if game.is_installed { "" } else { " (not installed)" };
    println!("  * {} [{}]{marker}", game.name, game.id);
}

fn compat_tool_set(engine: &Engine, game: &str, version: &str, yes: bool) -> Result<()> {
    let mut mapping = engine
        .open_compat_tool_mapping()
        .context("Failed to read compatibility tool mapping")?;
    let catalog = Catalog::load(engine)?;

    let (app_id, name) = catalog
        .search(game)
        .ok_or_else(|| anyhow!("game not found: {game}"))?;
    validate_version(engine, &mapping, version)?;

    let old_version = mapping.version_of(&app_id).map(str::to_string);
    if old_version.as_deref() == Some(version) {
        println!("{name} is already using {version}");
        return Ok(());
    }

    println!("App ID:  {app_id}");
    println!("Name:    {name}");
    println!();
    println!(
        "{} -> {version}",
        old_version.as_deref().unwrap_or("(default)")
    );
    println!();

    if !yes && !ask_yes_or_no("Really update?")? {
        println!("Aborted");
        return Ok(());
    }

    mapping.update(&app_id, version)?;
    mapping.save().context("Failed to save compatibility tool mapping")?;
    info!("Set {app_id} to {version}");
    println!("Done");
    Ok(())
}

fn compat_tool_migrate(
    engine: &Engine,
    from: &str,
    to: &str,
    yes: bool,
    remove: bool,
) -> Result<()> {
    let mut mapping = engine
        .open_compat_tool_mapping()
        .context("Failed to read compatibility tool mapping")?;
    validate_version(engine, &mapping, from)?;
    validate_version(engine, &mapping, to)?;

    let removal = if remove {
        let dir = tool_dir(engine, from)
            .ok_or_else(|| anyhow!("cannot remove {from:?}: not a tool directory name"))?;
        Some(dir)
    } else {
        None
    };
    // Removing the tool also moves the global default off it.
    let moves_default = remove && mapping.default_version() == Some(from);

    let catalog = Catalog::load(engine)?;
    let names: VersionMapping = mapping.read_all(&catalog.chain());
    let games = mapping.games_using(from);

    println!("{from} -> {to}");
    println!();
    if moves_default {
        println!("  * (default)");
    }
    for id in &games {
        let name = names
            .games(from)
            .and_then(|set| set.iter().find(|g| &g.id == id))
            .map_or(id.as_str(), |g| g.name.as_str());
        println!("  * {name}");
    }
    println!();

    if !yes && !ask_yes_or_no("Really update?")? {
        println!("Aborted");
        return Ok(());
    }

    let moved = mapping.migrate(from, to)?;
    if moves_default {
        mapping.update(DEFAULT_APP_ID, to)?;
    }
    mapping.save().context("Failed to save compatibility tool mapping")?;
    info!("Migrated {moved} games from {from} to {to}");

    if let Some(dir) = removal {
        remove_tool(engine, &dir)?;
    }
    println!("Done");
    Ok(())
}

/// `compatibilitytools.d/<version>`, if `version` is a single plain path
/// component.
fn tool_dir(engine: &Engine, version: &str) -> Option<PathBuf> {
    let mut components = Path::new(version).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if !version.contains('\\') => {
            Some(engine.compat_tools_dir().join(name))
        }
        _ => None,
    }
}

/// Deletes an installed tool. The resolved directory must sit directly
/// inside `compatibilitytools.d`.
fn remove_tool(engine: &Engine, dir: &Path) -> Result<()> {
    let tools_dir = engine.compat_tools_dir();
    if !dir.is_dir() {
        warn!("{} is not installed in {}", dir.display(), tools_dir.display());
        return Ok(());
    }

    let tools_dir = fs::canonicalize(&tools_dir)
        .with_context(|| format!("Failed to resolve {}", tools_dir.display()))?;
    let target = fs::canonicalize(dir)
        .with_context(|| format!("Failed to resolve {}", dir.display()))?;
    if target.parent() != Some(tools_dir.as_path()) {
        bail!(
            "refusing to remove {}: not inside {}",
            target.display(),
            tools_dir.display()
        );
    }

    fs::remove_dir_all(&target)
        .with_context(|| format!("Failed to remove {}", target.display()))?;
    info!("Removed {}", target.display());
    Ok(())
}

/// A version is known when some mapping entry uses it or it is installed
/// under `compatibilitytools.d`.
fn validate_version(engine: &Engine, mapping: &CompatToolMapping, version: &str) -> Result<()> {
    let mapped =
        mapping.default_version() == Some(version) || !mapping.games_using(version).is_empty();
    let installed = tool_dir(engine, version).is_some_and(|dir| dir.is_dir());
    if mapped || installed {
        Ok(())
    } else {
        bail!("invalid version: {version}")
    }
}

fn user(engine: &Engine, input: Option<&str>, json: bool) -> Result<()> {
    let known = engine
        .open_login_users()
        .context("Failed to read login users")?;

    let Some(input) = input else {
        let users: Vec<JsonValue> = known
            .iter()
            .map(|(name, id64)| {
                let resolved = identity::decode64(id64).and_then(UserIdentity::from_id64);
                json!({
                    "name": name,
                    "id64": id64,
                    "id32": resolved.as_ref().map(UserIdentity::display_id32),
                    "steam_id": resolved.as_ref().map(UserIdentity::steam_id),
                    "most_recent": known.most_recent() == Some(id64),
                })
            })
            .collect();
        if json {
            return print_json(&JsonValue::Array(users));
        }
        for user in &users {
            let marker = if user["most_recent"] == true { " *" } else { "" };
            println!(
                "{}\t{}\t{}{marker}",
                user["name"].as_str().unwrap_or_default(),
                user["id64"].as_str().unwrap_or_default(),
                user["id32"].as_str().unwrap_or("-"),
            );
        }
        return Ok(());
    };

    let resolved = identity::resolve(input, &known)
        .with_context(|| format!("Failed to resolve user {input:?}"))?;
    if json {
        return print_json(&json!({
            "id64": resolved.id64(),
            "id32": resolved.display_id32(),
            "steam_id": resolved.steam_id(),
        }));
    }
    println!("SteamID64: {}", resolved.id64());
    println!("SteamID3:  {}", resolved.display_id32());
    println!("SteamID:   {}", resolved.steam_id());
    Ok(())
}

fn shortcuts(engine: &Engine, json: bool) -> Result<()> {
    let view = engine.read_shortcuts().context("Failed to read shortcuts")?;
    if json {
        return print_json(&serde_json::to_value(view.entries())?);
    }
    for entry in view.entries() {
        println!(
            "{}\t{}\t{}",
            entry.app_id,
            entry.name.as_deref().unwrap_or("-"),
            entry.exe.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

fn apps(engine: &Engine, all: bool, json: bool) -> Result<()> {
    let local = engine
        .open_local_config()
        .context("Failed to read local config")?;
    let catalog = Catalog::load(engine)?;
    let mut games = local.games(&catalog.chain(), !all);
    games.sort();

    if json {
        return print_json(&serde_json::to_value(&games)?);
    }
    for game in &games {
        print_game(game);
    }
    Ok(())
}

fn print_json(value: &JsonValue) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to encode JSON")?;
    println!("{text}");
    Ok(())
}

fn ask_yes_or_no(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush().context("Failed to write prompt")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "protonutils",
            "compattool",
            "set",
            "Team",
            "proton_8",
            "--yes",
            "--steam-root",
            "/srv/steam",
            "-u",
            "gaben",
        ])
        .unwrap();
        assert_eq!(cli.steam_root, Some(PathBuf::from("/srv/steam")));
        assert_eq!(cli.user.as_deref(), Some("gaben"));
        match cli.command {
            Command::Compattool(CompatToolCommand::Set { game, version, yes }) => {
                assert_eq!(game, "Team");
                assert_eq!(version, "proton_8");
                assert!(yes);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn migrate_requires_two_versions() {
        assert!(Cli::try_parse_from(["protonutils", "compattool", "migrate", "proton_7"]).is_err());
    }
}
