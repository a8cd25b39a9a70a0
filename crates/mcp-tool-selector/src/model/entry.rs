//! A single MCP server definition and its enabled/disabled status.

use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

static NO_ENV: Lazy<IndexMap<String, String>> = Lazy::new(IndexMap::new);

/// Whether an entry currently lives in the active document or the backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    Enabled,
    Disabled,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Enabled => f.write_str("enabled"),
            EntryStatus::Disabled => f.write_str("disabled"),
        }
    }
}

/// Stdio server definition: `{ command, args?, env? }`.
///
/// Keys other than the three known ones (`cwd`, `type`, ...) are carried in
/// `extra` and written back untouched. Entries are never edited in place;
/// replacing one means removing it and adding the new definition.
///
/// `args` and `env` remember whether the key was present, so an explicit
/// `"args": []` is written back as such.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    env: Option<IndexMap<String, String>>,
    #[serde(flatten)]
    extra: JsonMap<String, JsonValue>,
}

impl Entry {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: None,
            env: None,
            extra: JsonMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_env<I, K, V>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(env.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        self.args.as_deref().unwrap_or_default()
    }

    pub fn env(&self) -> &IndexMap<String, String> {
        self.env.as_ref().unwrap_or(&NO_ENV)
    }

    /// Unrecognized keys preserved from the source JSON.
    pub fn extra(&self) -> &JsonMap<String, JsonValue> {
        &self.extra
    }

    /// Validate one `mcpServers` value against the entry schema.
    ///
    /// The error is a human-readable reason; callers attach the entry name and
    /// pick the error kind (schema on load, validation on paste).
    pub fn from_value(def: &JsonValue) -> Result<Entry, String> {
        if !def.is_object() {
            return Err(format!("expected an object, found {}", json_type(def)));
        }
        let entry: Entry = serde_json::from_value(def.clone()).map_err(|e| e.to_string())?;
        entry.check()?;
        Ok(entry)
    }

    /// Enforce the invariants serde cannot express.
    pub fn check(&self) -> Result<(), String> {
        if self.command.trim().is_empty() {
            return Err("'command' must not be empty".to_string());
        }
        Ok(())
    }
}

fn json_type(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
