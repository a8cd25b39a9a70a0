//! Tracing setup for host applications embedding the selector.
//!
//! Environment variables win; otherwise the `[logging]` table of
//! `<home>/config.toml` applies; otherwise the defaults below.

use std::path::{Path, PathBuf};

use env_flags::env_flags;
use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, Layer, Registry, prelude::*};

use crate::config::{LoggingCfg, load_user_config};

env_flags! {
    /// Tracing filter, e.g. "info", "debug", or targets format.
    RUST_LOG: &str = "info";
    /// Preferred filter env (alias). If set, overrides RUST_LOG.
    TRACING_FILTER: &str = "";
    /// Pretty formatting for logs (ignored if TRACING_JSON=true).
    TRACING_PRETTY: bool = false;
    /// Compact single-line formatting for logs (ignored if TRACING_JSON=true)
    TRACING_COMPACT: bool = true;
    /// JSON formatting for logs
    TRACING_JSON: bool = false;
    /// If true, also log to file under <home>/logs or LOG_DIR
    LOG_TO_FILE: bool = false;
    /// Optional explicit log directory (absolute). Defaults to <home>/logs
    LOG_DIR: &str = "";
}

static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStyle {
    Json,
    Compact,
    Pretty,
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub style: LogStyle,
    pub to_file: bool,
    pub dir: Option<PathBuf>,
}

/// Merge env flags with the settings file. `env_set` reports whether a
/// variable was explicitly set; unset variables defer to `cfg`.
pub fn log_settings(cfg: Option<&LoggingCfg>, env_set: impl Fn(&str) -> bool) -> LogSettings {
    let mut filter = if !(*TRACING_FILTER).is_empty() {
        (*TRACING_FILTER).to_string()
    } else {
        (*RUST_LOG).to_string()
    };
    let mut json = *TRACING_JSON;
    let mut compact = *TRACING_COMPACT;
    let mut pretty = *TRACING_PRETTY;
    let mut to_file = *LOG_TO_FILE;
    let mut dir = if !(*LOG_DIR).is_empty() {
        Some(PathBuf::from((*LOG_DIR).to_string()))
    } else {
        None
    };

    if let Some(cfg) = cfg {
        if !(env_set("TRACING_FILTER") || env_set("RUST_LOG"))
            && let Some(level) = cfg.level.as_ref()
        {
            filter = level.clone();
        }
        if !env_set("TRACING_JSON")
            && let Some(v) = cfg.json
        {
            json = v;
        }
        if !env_set("TRACING_COMPACT")
            && let Some(v) = cfg.compact
        {
            compact = v;
        }
        if !env_set("TRACING_PRETTY")
            && let Some(v) = cfg.pretty
        {
            pretty = v;
        }
        if !env_set("LOG_TO_FILE")
            && let Some(v) = cfg.to_file
        {
            to_file = v;
        }
        if !env_set("LOG_DIR")
            && let Some(d) = cfg.dir.as_ref()
        {
            dir = Some(crate::config::expand_home(d));
        }
    }

    let style = if json {
        LogStyle::Json
    } else if compact {
        LogStyle::Compact
    } else if pretty {
        LogStyle::Pretty
    } else {
        LogStyle::Full
    };
    LogSettings {
        filter,
        style,
        to_file,
        dir,
    }
}

fn fmt_layer<W>(writer: W, ansi: bool, style: LogStyle) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let base = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);
    match style {
        LogStyle::Json => base.json().boxed(),
        LogStyle::Compact => base.compact().boxed(),
        LogStyle::Pretty => base.pretty().boxed(),
        LogStyle::Full => base.boxed(),
    }
}

/// Install the global subscriber. Logs go to stderr and, when enabled, to a
/// daily file under `<home>/logs`. Safe to call more than once.
pub fn init_tracing(home: &Path) {
    let user_cfg = load_user_config(home).ok().flatten();
    let settings = log_settings(
        user_cfg.as_ref().and_then(|c| c.logging.as_ref()),
        |k| std::env::var_os(k).is_some(),
    );

    let filter = EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(std::io::stderr, true, settings.style)];
    let mut dir_error = None;
    if settings.to_file {
        let dir = settings.dir.clone().unwrap_or_else(|| home.join("logs"));
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(&dir, "mcp-tool-selector.log");
                let (nb, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                layers.push(fmt_layer(nb, false, settings.style));
            }
            Err(e) => dir_error = Some((dir, e)),
        }
    }

    if let Err(e) = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
    {
        tracing::debug!("tracing already set: {:?}", e);
    }
    if let Some((dir, e)) = dir_error {
        tracing::warn!("failed to create log dir {}: {}", dir.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_file_applies_when_env_is_unset() {
        let cfg = LoggingCfg {
            level: Some("debug".into()),
            json: Some(true),
            to_file: Some(true),
            dir: Some("/var/log/mcp".into()),
            ..Default::default()
        };
        let s = log_settings(Some(&cfg), |_| false);
        assert_eq!(s.filter, "debug");
        assert_eq!(s.style, LogStyle::Json);
        assert!(s.to_file);
        assert_eq!(s.dir, Some(PathBuf::from("/var/log/mcp")));
    }

    #[test]
    fn explicit_env_keeps_priority() {
        let cfg = LoggingCfg {
            json: Some(true),
            compact: Some(false),
            pretty: Some(true),
            ..Default::default()
        };
        // json is claimed by the environment, so only compact/pretty apply
        let s = log_settings(Some(&cfg), |k| k == "TRACING_JSON");
        assert_eq!(s.style == LogStyle::Json, *TRACING_JSON);
        if !*TRACING_JSON {
            assert_eq!(s.style, LogStyle::Pretty);
        }
    }

    #[test]
    fn init_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        init_tracing(dir.path());
        init_tracing(dir.path());
        tracing::info!("still alive");
    }
}
