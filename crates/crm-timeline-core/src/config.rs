//! Configuration: which store to read and how to treat unreadable snapshots.
//!
//! Lookup order for the config file is an explicit `--config` path, then
//! `crm-timeline.toml` in the working directory, then
//! `<user config dir>/crm-timeline/config.toml`. A missing file means
//! defaults. The store path may be overridden by `CRM_TIMELINE_DB` and then
//! by `--db`.

use crate::decode::DecodeMode;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Config file name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "crm-timeline.toml";

/// Environment variable overriding the store path.
pub const DB_ENV_VAR: &str = "CRM_TIMELINE_DB";

/// Store file used when nothing else names one.
pub const DEFAULT_STORE_FILE: &str = "crm-timeline.sqlite3";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub decode: DecodeConfig,
    /// Preferred output mode: `pretty`, `text`, or `json`.
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeConfig {
    /// Fail the whole feed on an unreadable snapshot instead of skipping it.
    #[serde(default)]
    pub strict: bool,
}

impl DecodeConfig {
    #[must_use]
    pub const fn mode(&self) -> DecodeMode {
        DecodeMode::from_strict(self.strict)
    }
}

/// Settings after merging file, environment, and flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    /// The file the settings were read from, if any.
    pub source: Option<PathBuf>,
    pub config: TimelineConfig,
    pub store_path: PathBuf,
    pub decode_mode: DecodeMode,
    pub resolved_output: String,
}

/// Command-line inputs that take part in resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides<'a> {
    pub config_path: Option<&'a Path>,
    pub db_path: Option<&'a Path>,
    pub json: bool,
    pub format: Option<&'a str>,
}

/// Parse a config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML for
/// [`TimelineConfig`].
pub fn load_config_file(path: &Path) -> Result<TimelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<TimelineConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Find the config file to use, if any.
///
/// An explicit path is returned as-is even when it does not exist, so the
/// caller reports it instead of silently falling back.
#[must_use]
pub fn discover_config_path(explicit: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = cwd.join(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    let user = dirs::config_dir()?.join("crm-timeline/config.toml");
    user.is_file().then_some(user)
}

/// Resolve the effective configuration for one invocation.
///
/// # Errors
///
/// Returns an error if a config file is found but cannot be parsed, or if
/// an output format is given that is not recognised.
pub fn resolve_config(overrides: &ConfigOverrides<'_>, cwd: &Path) -> Result<EffectiveConfig> {
    let source = discover_config_path(overrides.config_path, cwd);
    let config = match &source {
        Some(path) => load_config_file(path)?,
        None => TimelineConfig::default(),
    };

    let store_path = resolve_store_path(
        overrides.db_path,
        env::var(DB_ENV_VAR).ok(),
        config.store.path.as_deref(),
        cwd,
    );
    let resolved_output = resolve_output(
        overrides.json,
        overrides.format,
        env::var("FORMAT").ok(),
        config.output.clone(),
    )?;

    tracing::debug!(
        config = ?source,
        store = %store_path.display(),
        strict = config.decode.strict,
        output = %resolved_output,
        "resolved configuration"
    );

    Ok(EffectiveConfig {
        source,
        decode_mode: config.decode.mode(),
        config,
        store_path,
        resolved_output,
    })
}

fn resolve_store_path(
    cli_db: Option<&Path>,
    env_db: Option<String>,
    config_db: Option<&Path>,
    cwd: &Path,
) -> PathBuf {
    let chosen = cli_db
        .map(Path::to_path_buf)
        .or_else(|| env_db.filter(|raw| !raw.trim().is_empty()).map(PathBuf::from))
        .or_else(|| config_db.map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE));

    if chosen.is_absolute() {
        chosen
    } else {
        cwd.join(chosen)
    }
}

fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "table" | "tsv" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

fn resolve_output(
    cli_json: bool,
    cli_format: Option<&str>,
    env_format: Option<String>,
    config_output: Option<String>,
) -> Result<String> {
    if cli_json {
        return Ok("json".to_string());
    }

    if let Some(raw) = cli_format {
        let Some(mode) = normalize_output_mode(raw) else {
            bail!("unknown output format '{raw}': expected one of pretty, text, json");
        };
        return Ok(mode.to_string());
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return Ok(mode.to_string());
    }

    if let Some(mode) = config_output.as_deref().and_then(normalize_output_mode) {
        return Ok(mode.to_string());
    }

    if std::io::stdout().is_terminal() {
        Ok("pretty".to_string())
    } else {
        Ok("text".to_string())
    }
}
