//! Error taxonomy for loading, validating, and persisting server documents.
//!
//! Every variant is recoverable from the caller's point of view: the engine
//! never leaves a half-applied mutation behind, so the UI can render the
//! message and keep going.

use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which of the two documents an operation was looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Active,
    Backup,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Active => f.write_str("active configuration"),
            DocumentKind::Backup => f.write_str("backup"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Content is not valid JSON. The file it came from is left untouched.
    #[error("invalid JSON in {origin} at line {line}, column {column}: {source}")]
    Parse {
        /// File path, or "pasted fragment" for user input.
        origin: String,
        line: usize,
        column: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON with the wrong shape: missing `mcpServers`, a bad entry, or
    /// an entry present in both documents.
    #[error("unexpected structure in {}: {reason}", .path.display())]
    Schema { path: PathBuf, reason: String },

    /// A pasted fragment failed entry validation.
    #[error("{}", validation_message(.name, .reason))]
    Validation {
        name: Option<String>,
        reason: String,
    },

    /// An add targeted names that already exist in either document.
    #[error("entries already exist: {}", .names.join(", "))]
    Conflict { names: Vec<String> },

    /// `expected` is `None` when the name was looked up in both documents.
    #[error("'{name}' is not in the {}", not_found_place(.expected))]
    NotFound {
        name: String,
        expected: Option<DocumentKind>,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A mutation could not be written. In-memory state was not changed.
    /// `reverted` reports whether a partner file already written in the same
    /// commit was restored to its previous content.
    #[error("failed to persist {}: {source}{}", .path.display(), revert_note(.reverted))]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        reverted: bool,
    },
}

fn validation_message(name: &Option<String>, reason: &str) -> String {
    match name {
        Some(n) => format!("invalid entry '{n}': {reason}"),
        None => format!("invalid fragment: {reason}"),
    }
}

fn not_found_place(expected: &Option<DocumentKind>) -> String {
    match expected {
        Some(kind) => kind.to_string(),
        None => "active configuration or the backup".to_string(),
    }
}

fn revert_note(reverted: &bool) -> &'static str {
    if *reverted {
        ""
    } else {
        " (partner file could not be restored)"
    }
}

impl ConfigError {
    pub(crate) fn parse(origin: impl Into<String>, source: serde_json::Error) -> Self {
        ConfigError::Parse {
            origin: origin.into(),
            line: source.line(),
            column: source.column(),
            source,
        }
    }

    pub(crate) fn schema(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ConfigError::Schema {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_entry(name: &str, reason: impl Into<String>) -> Self {
        ConfigError::Validation {
            name: Some(name.to_string()),
            reason: reason.into(),
        }
    }

    /// True when retrying with `allow_overwrite` could succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ConfigError::Conflict { .. })
    }

    /// Rewrap a store-level I/O failure as a registry persistence failure.
    pub(crate) fn into_persistence(self, reverted: bool) -> Self {
        match self {
            ConfigError::Io { path, source } => ConfigError::Persistence {
                path,
                source,
                reverted,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_carries_location() {
        let err = serde_json::from_str::<serde_json::Value>("{\n  \"a\": 1,\n}").unwrap_err();
        let e = ConfigError::parse("config.json", err);
        match &e {
            ConfigError::Parse { line, column, .. } => {
                assert_eq!(*line, 3);
                assert!(*column >= 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(e.to_string().contains("config.json"));
    }

    #[test]
    fn io_becomes_persistence() {
        let e = ConfigError::Io {
            path: PathBuf::from("/x/config.json"),
            source: std::io::Error::other("disk full"),
        }
        .into_persistence(false);
        assert!(matches!(e, ConfigError::Persistence { reverted: false, .. }));
        assert!(e.to_string().contains("could not be restored"));
    }

    #[test]
    fn validation_message_names_entry() {
        let e = ConfigError::invalid_entry("toolC", "'command' must not be empty");
        assert_eq!(
            e.to_string(),
            "invalid entry 'toolC': 'command' must not be empty"
        );
        assert!(!e.is_conflict());
    }
}
