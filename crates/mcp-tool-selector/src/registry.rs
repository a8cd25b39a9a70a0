//! Entry registry: the UI-facing view over the active and backup documents.
//!
//! Every mutation builds the next documents off to the side, writes them
//! through the store, and only then swaps them into memory. When the second
//! write of a two-document commit fails, the first file is restored from the
//! in-memory copy, which still holds the pre-mutation state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::{ConfigError, DocumentKind, Result};
use crate::model::{Entry, EntryStatus, ServerDocument};
use crate::store::{DocumentStore, JsonFileStore, backup_path_for, merge_fragment};

/// One row of the entry list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryView<'a> {
    pub name: &'a str,
    pub entry: &'a Entry,
    pub status: EntryStatus,
}

/// Result of a successful `add_from_json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddReport {
    pub added: Vec<String>,
    pub replaced: Vec<String>,
}

/// Owns both documents and the paths they persist to.
///
/// Names are disjoint across the two documents at all times; mutations take
/// `&mut self`, so a single owner is serialized by the borrow checker. Use
/// [`SharedRegistry`] when several handlers need access.
#[derive(Debug)]
pub struct EntryRegistry<S: DocumentStore = JsonFileStore> {
    store: S,
    config_path: PathBuf,
    backup_path: PathBuf,
    active: ServerDocument,
    backup: ServerDocument,
}

impl EntryRegistry<JsonFileStore> {
    /// Open `config_path` with its backup at `<config_path>.backup`.
    pub fn open(config_path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = config_path.into();
        let backup_path = backup_path_for(&config_path);
        Self::with_store(JsonFileStore, config_path, backup_path)
    }

    pub fn open_with_backup(
        config_path: impl Into<PathBuf>,
        backup_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        Self::with_store(JsonFileStore, config_path.into(), backup_path.into())
    }
}

impl<S: DocumentStore> EntryRegistry<S> {
    /// Load both documents. Fails without touching either file when one is
    /// unreadable or when a name appears in both.
    pub fn with_store(store: S, config_path: PathBuf, backup_path: PathBuf) -> Result<Self> {
        let (active, backup) = load_pair(&store, &config_path, &backup_path)?;
        tracing::info!(
            "opened {} ({} enabled, {} disabled)",
            config_path.display(),
            active.len(),
            backup.len()
        );
        Ok(Self {
            store,
            config_path,
            backup_path,
            active,
            backup,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    pub fn active(&self) -> &ServerDocument {
        &self.active
    }

    pub fn backup(&self) -> &ServerDocument {
        &self.backup
    }

    /// Enabled entries first, then disabled, each in document order.
    pub fn list_entries(&self) -> Vec<EntryView<'_>> {
        let enabled = self.active.iter().map(|(name, entry)| EntryView {
            name,
            entry,
            status: EntryStatus::Enabled,
        });
        let disabled = self.backup.iter().map(|(name, entry)| EntryView {
            name,
            entry,
            status: EntryStatus::Disabled,
        });
        enabled.chain(disabled).collect()
    }

    pub fn get(&self, name: &str) -> Option<EntryView<'_>> {
        if let Some((name, entry)) = self.active.get_key_value(name) {
            return Some(EntryView {
                name,
                entry,
                status: EntryStatus::Enabled,
            });
        }
        self.backup
            .get_key_value(name)
            .map(|(name, entry)| EntryView {
                name,
                entry,
                status: EntryStatus::Disabled,
            })
    }

    pub fn status(&self, name: &str) -> Option<EntryStatus> {
        if self.active.contains(name) {
            Some(EntryStatus::Enabled)
        } else if self.backup.contains(name) {
            Some(EntryStatus::Disabled)
        } else {
            None
        }
    }

    /// Re-read both files. On error the current state is kept.
    pub fn reload(&mut self) -> Result<()> {
        let (active, backup) = load_pair(&self.store, &self.config_path, &self.backup_path)?;
        self.active = active;
        self.backup = backup;
        tracing::debug!(
            "reloaded {} ({} enabled, {} disabled)",
            self.config_path.display(),
            self.active.len(),
            self.backup.len()
        );
        Ok(())
    }

    /// Move `name` from the active document into the backup.
    pub fn disable(&mut self, name: &str) -> Result<()> {
        let mut active = self.active.clone();
        let Some(entry) = active.remove(name) else {
            tracing::warn!("disable: '{}' is not enabled", name);
            return Err(not_found(name, Some(DocumentKind::Active)));
        };
        let mut backup = self.backup.clone();
        backup.insert(name, entry);
        // backup first: an interrupted commit leaves a duplicate, not a loss
        self.commit(vec![(DocumentKind::Backup, backup), (DocumentKind::Active, active)])?;
        tracing::info!("disabled '{}'", name);
        Ok(())
    }

    /// Move `name` from the backup into the active document.
    pub fn enable(&mut self, name: &str) -> Result<()> {
        let mut backup = self.backup.clone();
        let Some(entry) = backup.remove(name) else {
            tracing::warn!("enable: '{}' is not disabled", name);
            return Err(not_found(name, Some(DocumentKind::Backup)));
        };
        let mut active = self.active.clone();
        active.insert(name, entry);
        self.commit(vec![(DocumentKind::Active, active), (DocumentKind::Backup, backup)])?;
        tracing::info!("enabled '{}'", name);
        Ok(())
    }

    /// Merge a pasted `{"mcpServers": {...}}` fragment as enabled entries.
    ///
    /// With `allow_overwrite` unset, any existing name is a conflict and
    /// nothing is added.
    pub fn add_from_json(&mut self, fragment: &str, allow_overwrite: bool) -> Result<AddReport> {
        let outcome = merge_fragment(&self.active, &self.backup, fragment, allow_overwrite)
            .inspect_err(|e| tracing::warn!("add rejected: {}", e))?;
        let mut steps = vec![(DocumentKind::Active, outcome.active)];
        if outcome.backup_changed {
            steps.push((DocumentKind::Backup, outcome.backup));
        }
        self.commit(steps)?;
        tracing::info!(
            "added [{}], replaced [{}]",
            outcome.added.join(", "),
            outcome.replaced.join(", ")
        );
        Ok(AddReport {
            added: outcome.added,
            replaced: outcome.replaced,
        })
    }

    /// Delete `name` from whichever document holds it. Returns where it was.
    pub fn remove(&mut self, name: &str) -> Result<EntryStatus> {
        let status = if self.active.contains(name) {
            let mut active = self.active.clone();
            active.remove(name);
            self.commit(vec![(DocumentKind::Active, active)])?;
            EntryStatus::Enabled
        } else if self.backup.contains(name) {
            let mut backup = self.backup.clone();
            backup.remove(name);
            self.commit(vec![(DocumentKind::Backup, backup)])?;
            EntryStatus::Disabled
        } else {
            tracing::warn!("remove: '{}' does not exist", name);
            return Err(not_found(name, None));
        };
        tracing::info!("removed '{}' ({})", name, status);
        Ok(status)
    }

    fn path_of(&self, kind: DocumentKind) -> &Path {
        match kind {
            DocumentKind::Active => &self.config_path,
            DocumentKind::Backup => &self.backup_path,
        }
    }

    fn current(&self, kind: DocumentKind) -> &ServerDocument {
        match kind {
            DocumentKind::Active => &self.active,
            DocumentKind::Backup => &self.backup,
        }
    }

    /// Write `steps` in order, then adopt them. On failure, restore whatever
    /// was already written and leave memory as it was.
    fn commit(&mut self, steps: Vec<(DocumentKind, ServerDocument)>) -> Result<()> {
        let mut written: Vec<DocumentKind> = Vec::with_capacity(steps.len());
        for (kind, doc) in &steps {
            if let Err(e) = self.store.save(self.path_of(*kind), doc) {
                let reverted = written.iter().all(|k| self.restore(*k));
                tracing::warn!("commit failed on {} (reverted={}): {}", kind, reverted, e);
                return Err(e.into_persistence(reverted));
            }
            written.push(*kind);
        }
        for (kind, doc) in steps {
            match kind {
                DocumentKind::Active => self.active = doc,
                DocumentKind::Backup => self.backup = doc,
            }
        }
        Ok(())
    }

    fn restore(&self, kind: DocumentKind) -> bool {
        let path = self.path_of(kind);
        match self.store.save(path, self.current(kind)) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("could not restore {}: {}", path.display(), e);
                false
            }
        }
    }
}

fn load_pair<S: DocumentStore>(
    store: &S,
    config_path: &Path,
    backup_path: &Path,
) -> Result<(ServerDocument, ServerDocument)> {
    let active = store.load(config_path)?;
    let backup = store.load(backup_path)?;
    let overlap: Vec<&str> = active
        .names()
        .filter(|n| backup.contains(n))
        .map(String::as_str)
        .collect();
    if !overlap.is_empty() {
        return Err(ConfigError::schema(
            backup_path,
            format!(
                "entries present in both {} and the backup: {}",
                config_path.display(),
                overlap.join(", ")
            ),
        ));
    }
    Ok((active, backup))
}

fn not_found(name: &str, expected: Option<DocumentKind>) -> ConfigError {
    ConfigError::NotFound {
        name: name.to_string(),
        expected,
    }
}

/// Cloneable handle that serializes every operation on one mutex.
#[derive(Debug)]
pub struct SharedRegistry<S: DocumentStore = JsonFileStore> {
    inner: Arc<Mutex<EntryRegistry<S>>>,
}

impl<S: DocumentStore> Clone for SharedRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DocumentStore> SharedRegistry<S> {
    pub fn new(registry: EntryRegistry<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Hold the lock across several reads.
    pub fn lock(&self) -> MutexGuard<'_, EntryRegistry<S>> {
        self.inner.lock()
    }

    /// Owned snapshot of [`EntryRegistry::list_entries`].
    pub fn list_entries(&self) -> Vec<(String, Entry, EntryStatus)> {
        self.inner
            .lock()
            .list_entries()
            .into_iter()
            .map(|v| (v.name.to_string(), v.entry.clone(), v.status))
            .collect()
    }

    pub fn disable(&self, name: &str) -> Result<()> {
        self.inner.lock().disable(name)
    }

    pub fn enable(&self, name: &str) -> Result<()> {
        self.inner.lock().enable(name)
    }

    pub fn add_from_json(&self, fragment: &str, allow_overwrite: bool) -> Result<AddReport> {
        self.inner.lock().add_from_json(fragment, allow_overwrite)
    }

    pub fn remove(&self, name: &str) -> Result<EntryStatus> {
        self.inner.lock().remove(name)
    }

    pub fn reload(&self) -> Result<()> {
        self.inner.lock().reload()
    }
}
