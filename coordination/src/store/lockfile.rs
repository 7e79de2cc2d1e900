//! File-advisory locking and atomic replace for the JSON store documents.
//!
//! The lock is a `.lock` sibling of the document; it is acquired exclusive
//! only for the duration of a read-modify-write cycle and never held
//! across a subprocess call, matching the concurrency rules in the store
//! contract. Writes never touch the target path directly: content lands
//! in a temp file in the same directory, is `fsync`'d, then renamed over
//! the target, so a reader never observes a partially written document.

use crate::error::{HookError, HookResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

fn lock_path(doc_path: &Path) -> std::path::PathBuf {
    doc_path.with_extension(match doc_path.extension() {
        Some(ext) => format!("{}.lock", ext.to_string_lossy()),
        None => "lock".to_string(),
    })
}

fn open_lock_file(doc_path: &Path) -> HookResult<File> {
    if let Some(parent) = doc_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| HookError::io(parent, e))?;
    }
    let lp = lock_path(doc_path);
    OpenOptions::new()
        .create(true)
        .write(true)
        .open(&lp)
        .map_err(|e| HookError::io(lp, e))
}

/// Run `f` with an exclusive lock held over `doc_path`'s sibling lockfile.
/// `f` receives the current raw contents of `doc_path` (empty string if the
/// document does not yet exist) and returns the new contents to persist.
pub fn with_exclusive_lock<F>(doc_path: &Path, f: F) -> HookResult<()>
where
    F: FnOnce(String) -> HookResult<String>,
{
    let lock_file = open_lock_file(doc_path)?;
    lock_file
        .lock_exclusive()
        .map_err(|e| HookError::io(lock_path(doc_path), e))?;

    let result = (|| {
        let current = match std::fs::read_to_string(doc_path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(HookError::io(doc_path, e)),
        };
        let next = f(current)?;
        atomic_write(doc_path, &next)
    })();

    FileExt::unlock(&lock_file).ok();
    result
}

/// Read `doc_path` under a shared lock. Returns `None` if the document
/// doesn't exist yet. Per the store contract, reads don't require the
/// write lock and may observe a stale-but-consistent snapshot; taking a
/// shared lock here still protects against torn reads mid-rename.
pub fn read_shared(doc_path: &Path) -> HookResult<Option<String>> {
    if !doc_path.exists() {
        return Ok(None);
    }
    let lp = lock_path(doc_path);
    match OpenOptions::new().read(true).open(&lp) {
        Ok(lock_file) => {
            let _ = lock_file.lock_shared();
            let contents = std::fs::read_to_string(doc_path).map_err(|e| HookError::io(doc_path, e))?;
            FileExt::unlock(&lock_file).ok();
            Ok(Some(contents))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let contents = std::fs::read_to_string(doc_path).map_err(|e| HookError::io(doc_path, e))?;
            Ok(Some(contents))
        }
        Err(e) => Err(HookError::io(lp, e)),
    }
}

fn atomic_write(doc_path: &Path, contents: &str) -> HookResult<()> {
    let parent = doc_path
        .parent()
        .ok_or_else(|| HookError::InvalidInput("store path has no parent directory".into()))?;
    std::fs::create_dir_all(parent).map_err(|e| HookError::io(parent, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| HookError::io(parent, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| HookError::io(doc_path, e))?;
    tmp.as_file().sync_all().map_err(|e| HookError::io(doc_path, e))?;
    tmp.persist(doc_path)
        .map_err(|e| HookError::io(doc_path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        with_exclusive_lock(&path, |_prev| Ok("hello".to_string())).unwrap();
        let read = read_shared(&path).unwrap();
        assert_eq!(read, Some("hello".to_string()));
    }

    #[test]
    fn missing_document_reads_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert_eq!(read_shared(&path).unwrap(), None);
    }

    #[test]
    fn concurrent_writers_do_not_corrupt_document() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempdir().unwrap();
        let path = Arc::new(dir.path().join("doc.json"));
        with_exclusive_lock(&path, |_| Ok("0".to_string())).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let path = Arc::clone(&path);
                thread::spawn(move || {
                    with_exclusive_lock(&path, |prev| {
                        let n: u64 = prev.trim().parse().unwrap_or(0);
                        Ok((n + 1).to_string())
                    })
                    .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let final_value: u64 = read_shared(&path).unwrap().unwrap().trim().parse().unwrap();
        assert_eq!(final_value, 8);
    }
}
