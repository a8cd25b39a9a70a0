//! Configuration store: load and atomically save server documents, and merge
//! pasted fragments into them.
//!
//! Parsing and validation never touch the filesystem; saving never validates.
//! A document is either written whole or not at all.

mod atomic;
pub mod fragment;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use crate::error::{ConfigError, Result};
use crate::model::ServerDocument;

pub use fragment::{MergeOutcome, merge_fragment};

/// Suffix appended to the configuration file name to form the backup path.
pub const BACKUP_SUFFIX: &str = ".backup";

/// `<config>.backup`, keeping the full original file name.
pub fn backup_path_for(config_path: &Path) -> PathBuf {
    let mut p = config_path.as_os_str().to_os_string();
    p.push(BACKUP_SUFFIX);
    PathBuf::from(p)
}

/// Persistence seam for server documents.
pub trait DocumentStore {
    /// Read a document. A missing file is an empty document.
    fn load(&self, path: &Path) -> Result<ServerDocument>;

    /// Replace the file at `path` with `doc`. On error the file is unchanged.
    fn save(&self, path: &Path, doc: &ServerDocument) -> Result<()>;

    fn load_backup(&self, config_path: &Path) -> Result<ServerDocument> {
        self.load(&backup_path_for(config_path))
    }

    /// An empty backup is written as `{"mcpServers": {}}`, not deleted.
    fn save_backup(&self, config_path: &Path, doc: &ServerDocument) -> Result<()> {
        self.save(&backup_path_for(config_path), doc)
    }
}

/// Pretty-printed JSON files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFileStore;

impl DocumentStore for JsonFileStore {
    fn load(&self, path: &Path) -> Result<ServerDocument> {
        let content = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} not found; starting empty", path.display());
                return Ok(ServerDocument::new());
            }
            Err(e) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };
        let value: JsonValue = serde_json::from_slice(&content)
            .map_err(|e| ConfigError::parse(path.display().to_string(), e))?;
        let doc = ServerDocument::from_value(value, path)?;
        tracing::debug!("loaded {} entr(ies) from {}", doc.len(), path.display());
        Ok(doc)
    }

    fn save(&self, path: &Path, doc: &ServerDocument) -> Result<()> {
        let io_err = |source: std::io::Error| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let value = doc.to_value().map_err(|e| io_err(e.into()))?;
        let mut bytes = serde_json::to_vec_pretty(&value).map_err(|e| io_err(e.into()))?;
        bytes.push(b'\n');
        atomic::write_atomic(path, &bytes).map_err(|e| {
            tracing::warn!("failed to write {}: {}", path.display(), e);
            io_err(e)
        })?;
        tracing::debug!("wrote {} entr(ies) to {}", doc.len(), path.display());
        Ok(())
    }
}
