//! `{ "mcpServers": { ... } }` documents: the active config and its backup.

use std::path::Path;

use indexmap::IndexMap;
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::entry::Entry;
use crate::error::{ConfigError, Result};

/// Top-level key holding the server map.
pub const SERVERS_KEY: &str = "mcpServers";

/// Named entries in insertion order, plus any other top-level keys of the
/// file (host applications keep their own settings next to `mcpServers`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerDocument {
    servers: IndexMap<String, Entry>,
    extra: JsonMap<String, JsonValue>,
}

impl ServerDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.servers.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.servers.get(name)
    }

    pub fn get_key_value(&self, name: &str) -> Option<(&String, &Entry)> {
        self.servers.get_key_value(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.servers.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.servers.keys()
    }

    /// Top-level keys other than `mcpServers`.
    pub fn extra(&self) -> &JsonMap<String, JsonValue> {
        &self.extra
    }

    /// Insert or replace. A replaced entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, entry: Entry) -> Option<Entry> {
        self.servers.insert(name.into(), entry)
    }

    /// Remove and close the gap, keeping the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        self.servers.shift_remove(name)
    }

    /// Build a document from parsed JSON, validating every entry.
    ///
    /// `path` only labels errors.
    pub fn from_value(value: JsonValue, path: &Path) -> Result<Self> {
        let JsonValue::Object(mut top) = value else {
            return Err(ConfigError::schema(path, "top-level JSON must be an object"));
        };
        let servers = match top.shift_remove(SERVERS_KEY) {
            Some(JsonValue::Object(map)) => map,
            Some(_) => {
                return Err(ConfigError::schema(
                    path,
                    format!("'{SERVERS_KEY}' must be an object"),
                ));
            }
            None => {
                return Err(ConfigError::schema(
                    path,
                    format!("missing '{SERVERS_KEY}' key"),
                ));
            }
        };

        let mut doc = ServerDocument {
            servers: IndexMap::with_capacity(servers.len()),
            extra: top,
        };
        for (name, def) in servers {
            let entry = Entry::from_value(&def)
                .map_err(|reason| ConfigError::schema(path, format!("entry '{name}': {reason}")))?;
            doc.servers.insert(name, entry);
        }
        Ok(doc)
    }

    /// Render with `mcpServers` first, followed by preserved keys.
    pub fn to_value(&self) -> serde_json::Result<JsonValue> {
        let mut servers = JsonMap::with_capacity(self.servers.len());
        for (name, entry) in &self.servers {
            servers.insert(name.clone(), serde_json::to_value(entry)?);
        }
        let mut top = JsonMap::with_capacity(self.extra.len() + 1);
        top.insert(SERVERS_KEY.to_string(), JsonValue::Object(servers));
        for (k, v) in &self.extra {
            top.insert(k.clone(), v.clone());
        }
        Ok(JsonValue::Object(top))
    }
}
