use std::path::{Path, PathBuf};

use {secrecy::Secret, tracing::debug};

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::PorterConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["porter.toml", "porter.yaml", "porter.yml", "porter.json"];

/// Environment variables read by [`apply_env_overrides`], in lookup order.
pub const TOKEN_VARS: &[&str] = &["TELEGRAM_BOT_TOKEN", "BOT_TOKEN"];
pub const PASSWORD_VARS: &[&str] = &["BOT_PASSWORD", "ACCESS_PASSWORD"];
pub const PORT_VAR: &str = "PORT";
pub const BIND_VAR: &str = "PORTER_BIND";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<PorterConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Load the explicit `path`, or discover a config file in standard locations,
/// then apply environment overrides.
///
/// Search order when `path` is `None`:
/// 1. `./porter.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/porter/porter.{toml,yaml,yml,json}` (user-global)
///
/// A missing file is fine (defaults are used). A file that exists but cannot
/// be read or parsed is an error: it is never silently replaced by defaults.
pub fn discover_and_load(path: Option<&Path>) -> Result<PorterConfig> {
    let found = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(),
    };
    let mut config = match found {
        Some(p) => {
            debug!(path = %p.display(), "loading config");
            load_config(&p)?
        },
        None => {
            debug!("no config file found, using defaults");
            PorterConfig::default()
        },
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

/// Overlay environment variables onto `config`.
///
/// Empty values are treated as unset.
pub fn apply_env_overrides(
    config: &mut PorterConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let first = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| lookup(n).filter(|v| !v.trim().is_empty()))
    };

    if let Some(token) = first(TOKEN_VARS) {
        config.telegram.token = Some(Secret::new(token.trim().to_string()));
    }
    if let Some(password) = first(PASSWORD_VARS) {
        // Replies are trimmed before comparison, so the stored secret must be too.
        config.access.password = Some(Secret::new(password.trim().to_string()));
    }
    if let Some(port) = first(&[PORT_VAR]) {
        config.server.port = port
            .trim()
            .parse()
            .with_context(|| format!("{PORT_VAR}={port:?} is not a valid port"))?;
    }
    if let Some(bind) = first(&[BIND_VAR]) {
        config.server.bind = bind.trim().to_string();
    }
    Ok(())
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/porter/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "porter").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<PorterConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}
