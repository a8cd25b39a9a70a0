//! User settings (`<home>/config.toml`) and path resolution.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::store::backup_path_for;

#[derive(Debug, Default, Deserialize)]
pub struct UserConfig {
    pub logging: Option<LoggingCfg>,
    pub selector: Option<SelectorCfg>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingCfg {
    pub to_file: Option<bool>,
    pub dir: Option<String>,
    pub json: Option<bool>,
    pub compact: Option<bool>,
    pub pretty: Option<bool>,
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SelectorCfg {
    pub config_path: Option<String>, // `~/` is expanded
    pub backup_path: Option<String>, // defaults to <config_path>.backup
}

/// Which files the registry should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorSettings {
    pub config_path: Option<PathBuf>,
    pub backup_path: Option<PathBuf>,
}

impl SelectorSettings {
    /// Backup path, falling back to `<config_path>.backup`.
    pub fn effective_backup_path(&self) -> Option<PathBuf> {
        self.backup_path
            .clone()
            .or_else(|| self.config_path.as_deref().map(backup_path_for))
    }
}

/// `MCP_TOOL_SELECTOR_HOME`, else `$HOME/.mcp-tool-selector`, else
/// `./.mcp-tool-selector`.
pub fn selector_home() -> PathBuf {
    if let Ok(h) = std::env::var("MCP_TOOL_SELECTOR_HOME")
        && !h.is_empty()
    {
        return PathBuf::from(h);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".mcp-tool-selector");
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".mcp-tool-selector")
}

pub fn load_user_config(home: &Path) -> anyhow::Result<Option<UserConfig>> {
    let path = home.join("config.toml");
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)?;
    let cfg: UserConfig = toml::from_str(&s)?;
    Ok(Some(cfg))
}

/// Environment (`MCP_CONFIG_PATH`, `MCP_BACKUP_PATH`) wins over the settings
/// file. `env` is normally `|k| std::env::var(k).ok()`.
pub fn resolve_settings(
    user_cfg: Option<&UserConfig>,
    env: impl Fn(&str) -> Option<String>,
) -> SelectorSettings {
    let from_env = |k: &str| env(k).filter(|v| !v.is_empty()).map(|v| expand_home(&v));
    let selector = user_cfg.and_then(|c| c.selector.as_ref());

    let config_path = from_env("MCP_CONFIG_PATH").or_else(|| {
        selector
            .and_then(|s| s.config_path.as_deref())
            .map(expand_home)
    });
    let backup_path = from_env("MCP_BACKUP_PATH").or_else(|| {
        selector
            .and_then(|s| s.backup_path.as_deref())
            .map(expand_home)
    });
    tracing::debug!(
        "resolved config_path={:?} backup_path={:?}",
        config_path,
        backup_path
    );
    SelectorSettings {
        config_path,
        backup_path,
    }
}

pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
