//! Merge a pasted `{"mcpServers": {...}}` snippet into the documents.

use serde_json::Value as JsonValue;

use crate::error::{ConfigError, Result};
use crate::model::{Entry, SERVERS_KEY, ServerDocument};

const FRAGMENT_ORIGIN: &str = "pasted fragment";

/// Documents after a successful merge. Nothing has been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub active: ServerDocument,
    /// Differs from the input backup only when an overwrite replaced a
    /// disabled entry.
    pub backup: ServerDocument,
    /// Names that did not exist in either document.
    pub added: Vec<String>,
    /// Names that existed and were replaced (`allow_overwrite` only).
    pub replaced: Vec<String>,
    /// True when an overwritten entry was taken out of the backup.
    pub backup_changed: bool,
}

/// Validate a fragment and merge its entries into copies of the documents.
///
/// Every entry must pass validation and, unless `allow_overwrite` is set,
/// none may already exist in `active` or `backup`; otherwise nothing is
/// merged. Overwritten entries land in the active document and leave the
/// backup if they were there.
pub fn merge_fragment(
    active: &ServerDocument,
    backup: &ServerDocument,
    fragment: &str,
    allow_overwrite: bool,
) -> Result<MergeOutcome> {
    let parsed = parse_fragment(fragment)?;

    let conflicts: Vec<String> = parsed
        .iter()
        .filter(|(name, _)| active.contains(name) || backup.contains(name))
        .map(|(name, _)| name.clone())
        .collect();
    if !conflicts.is_empty() && !allow_overwrite {
        return Err(ConfigError::Conflict { names: conflicts });
    }

    let mut out = MergeOutcome {
        active: active.clone(),
        backup: backup.clone(),
        added: Vec::new(),
        replaced: Vec::new(),
        backup_changed: false,
    };
    for (name, entry) in parsed {
        let was_disabled = out.backup.remove(&name).is_some();
        out.backup_changed |= was_disabled;
        if was_disabled || out.active.contains(&name) {
            out.replaced.push(name.clone());
        } else {
            out.added.push(name.clone());
        }
        out.active.insert(name, entry);
    }
    Ok(out)
}

/// Parse and validate every entry in the fragment, in document order.
fn parse_fragment(fragment: &str) -> Result<Vec<(String, Entry)>> {
    let value: JsonValue =
        serde_json::from_str(fragment).map_err(|e| ConfigError::parse(FRAGMENT_ORIGIN, e))?;
    let JsonValue::Object(mut top) = value else {
        return Err(invalid_fragment("expected a JSON object"));
    };
    let servers = match top.shift_remove(SERVERS_KEY) {
        Some(JsonValue::Object(map)) => map,
        Some(_) => return Err(invalid_fragment(format!("'{SERVERS_KEY}' must be an object"))),
        None => {
            return Err(invalid_fragment(format!(
                "JSON must contain an '{SERVERS_KEY}' object"
            )));
        }
    };
    if !top.is_empty() {
        tracing::debug!(
            "ignoring top-level keys in fragment: {}",
            top.keys().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    if servers.is_empty() {
        return Err(invalid_fragment(format!("'{SERVERS_KEY}' has no entries")));
    }

    let mut entries = Vec::with_capacity(servers.len());
    for (name, def) in servers {
        if name.trim().is_empty() {
            return Err(invalid_fragment("entry names must not be empty"));
        }
        let entry =
            Entry::from_value(&def).map_err(|reason| ConfigError::invalid_entry(&name, reason))?;
        entries.push((name, entry));
    }
    Ok(entries)
}

fn invalid_fragment(reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        name: None,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(entries: &[(&str, Entry)]) -> ServerDocument {
        let mut d = ServerDocument::new();
        for (n, e) in entries {
            d.insert(*n, e.clone());
        }
        d
    }

    #[test]
    fn adds_multiple_entries_in_order() {
        let active = doc(&[("toolA", Entry::new("npx"))]);
        let out = merge_fragment(
            &active,
            &ServerDocument::new(),
            r#"{"mcpServers":{"toolC":{"command":"uvx"},"toolD":{"command":"node","args":["x.js"]}}}"#,
            false,
        )
        .unwrap();
        assert_eq!(out.added, vec!["toolC".to_string(), "toolD".to_string()]);
        assert!(out.replaced.is_empty());
        assert!(!out.backup_changed);
        let names: Vec<_> = out.active.names().cloned().collect();
        assert_eq!(names, vec!["toolA", "toolC", "toolD"]);
        assert_eq!(out.active.get("toolD").unwrap().args(), ["x.js".to_string()]);
    }

    #[test]
    fn conflict_with_active_is_rejected() {
        let active = doc(&[("toolA", Entry::new("npx"))]);
        let err = merge_fragment(
            &active,
            &ServerDocument::new(),
            r#"{"mcpServers":{"toolA":{"command":"x"}}}"#,
            false,
        )
        .unwrap_err();
        assert!(err.is_conflict());
        match err {
            ConfigError::Conflict { names } => assert_eq!(names, vec!["toolA".to_string()]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn conflict_with_backup_is_rejected_and_reports_all_names() {
        let active = doc(&[("toolA", Entry::new("npx"))]);
        let backup = doc(&[("toolB", Entry::new("uvx"))]);
        let err = merge_fragment(
            &active,
            &backup,
            r#"{"mcpServers":{"toolB":{"command":"x"},"new":{"command":"y"},"toolA":{"command":"z"}}}"#,
            false,
        )
        .unwrap_err();
        match err {
            ConfigError::Conflict { names } => {
                assert_eq!(names, vec!["toolB".to_string(), "toolA".to_string()])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn overwrite_replaces_in_place_and_pulls_from_backup() {
        let active = doc(&[("toolA", Entry::new("old")), ("toolZ", Entry::new("z"))]);
        let backup = doc(&[("toolB", Entry::new("uvx"))]);
        let out = merge_fragment(
            &active,
            &backup,
            r#"{"mcpServers":{"toolA":{"command":"new"},"toolB":{"command":"uv"}}}"#,
            true,
        )
        .unwrap();
        assert!(out.added.is_empty());
        assert_eq!(out.replaced, vec!["toolA".to_string(), "toolB".to_string()]);
        let names: Vec<_> = out.active.names().cloned().collect();
        assert_eq!(names, vec!["toolA", "toolZ", "toolB"]);
        assert_eq!(out.active.get("toolA").unwrap().command(), "new");
        assert!(out.backup.is_empty());
        assert!(out.backup_changed);
    }

    #[test]
    fn empty_command_names_the_entry() {
        let err = merge_fragment(
            &ServerDocument::new(),
            &ServerDocument::new(),
            r#"{"mcpServers":{"toolC":{"command":""}}}"#,
            false,
        )
        .unwrap_err();
        match err {
            ConfigError::Validation { name, .. } => assert_eq!(name.as_deref(), Some("toolC")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn one_bad_entry_rejects_the_whole_fragment() {
        let err = merge_fragment(
            &ServerDocument::new(),
            &ServerDocument::new(),
            r#"{"mcpServers":{"ok":{"command":"x"},"bad":{"command":"y","args":"nope"}}}"#,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { name: Some(ref n), .. } if n == "bad"));
    }

    #[test]
    fn shape_errors() {
        let empty = ServerDocument::new();
        for (text, want_parse) in [
            ("not json", true),
            (r#"{"mcpServers":{"t":{"command":"npx",}}}"#, true),
            (r#"["x"]"#, false),
            (r#"{"servers":{}}"#, false),
            (r#"{"mcpServers":[]}"#, false),
            (r#"{"mcpServers":{}}"#, false),
        ] {
            let err = merge_fragment(&empty, &empty, text, false).unwrap_err();
            if want_parse {
                assert!(
                    matches!(err, ConfigError::Parse { ref origin, .. } if origin == FRAGMENT_ORIGIN),
                    "{text}: {err:?}"
                );
            } else {
                assert!(
                    matches!(err, ConfigError::Validation { name: None, .. }),
                    "{text}: {err:?}"
                );
            }
        }
    }
}
