//! Temp-file + rename writes.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Replace `path` with `content` so readers see either the old file or the
/// new one, never a prefix.
///
/// The temp file is created in the destination directory so the final
/// `rename(2)` stays on one filesystem. If `path` is a symlink the link's
/// target is replaced and the link is kept. Permission bits of an existing
/// file carry over. On any failure the temp file is removed and `path` is
/// untouched.
pub(crate) fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let target = resolve_link(path);
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".mcp-tool-selector.")
        .suffix(".tmp")
        .tempfile_in(&dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(&target)
        && meta.is_file()
    {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(())
}

fn resolve_link(path: &Path) -> PathBuf {
    let is_link = fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if is_link && let Ok(real) = fs::canonicalize(path) {
        return real;
    }
    path.to_path_buf()
}
